//! Configuration data structures for the HAProxy manager.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. Every section
//! has defaults so that a minimal config only needs the Dataplane endpoint and credentials.
use serde::{Deserialize, Serialize};

/// Connection settings for the Dataplane API
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DataplaneConfig {
    /// `unix:///path/to/socket` or `tcp://host:port`
    pub endpoint: String,
    /// Basic auth user
    pub username: String,
    /// Basic auth password
    pub password: String,
    /// Prefix prepended to every API path (e.g. "/v2")
    pub base_path: String,
    /// Transport-level timeout for a single call
    pub timeout_secs: u64,
}

impl Default for DataplaneConfig {
    fn default() -> Self {
        Self {
            endpoint: "unix:///var/run/dataplaneapi.sock".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            base_path: "/v2".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Settings applied to every frontend created on a custom port
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FrontendDefaults {
    pub max_connections: u64,
    /// Sentinel backend answering requests no switching rule matched.
    /// Must already exist in the base HAProxy configuration.
    pub default_backend: String,
}

impl Default for FrontendDefaults {
    fn default() -> Self {
        Self {
            max_connections: 2000,
            default_backend: "error_backend".to_string(),
        }
    }
}

/// Settings applied to server-templates of every backend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BackendDefaults {
    /// HAProxy resolvers section used for replica discovery
    pub resolver: String,
    pub init_addr: String,
}

impl Default for BackendDefaults {
    fn default() -> Self {
        Self {
            resolver: "docker".to_string(),
            init_addr: "libc,none".to_string(),
        }
    }
}

/// Fixed retry budget for version conflicts on commit
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn default_restricted_ports() -> Vec<u16> {
    vec![22, 2375, 2376, 5555, 9999]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ManagerConfig {
    #[serde(default)]
    pub dataplane: DataplaneConfig,
    #[serde(default)]
    pub frontend: FrontendDefaults,
    #[serde(default)]
    pub backend: BackendDefaults,
    /// Ports that may never be bound by a custom frontend
    #[serde(default = "default_restricted_ports")]
    pub restricted_ports: Vec<u16>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ManagerConfig {
    /// Create a new configuration builder
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            dataplane: DataplaneConfig::default(),
            frontend: FrontendDefaults::default(),
            backend: BackendDefaults::default(),
            restricted_ports: default_restricted_ports(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ManagerConfig, mostly useful when embedding the manager
#[derive(Default)]
pub struct ManagerConfigBuilder {
    config: ManagerConfig,
}

impl ManagerConfigBuilder {
    /// Set the Dataplane endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.dataplane.endpoint = endpoint.into();
        self
    }

    /// Set the Dataplane credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.dataplane.username = username.into();
        self.config.dataplane.password = password.into();
        self
    }

    pub fn restricted_ports(mut self, ports: Vec<u16>) -> Self {
        self.config.restricted_ports = ports;
        self
    }

    pub fn frontend(mut self, frontend: FrontendDefaults) -> Self {
        self.config.frontend = frontend;
        self
    }

    pub fn backend(mut self, backend: BackendDefaults) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn retry(mut self, attempts: u32, backoff_ms: u64) -> Self {
        self.config.retry = RetryConfig {
            attempts,
            backoff_ms,
        };
        self
    }

    pub fn build(self) -> ManagerConfig {
        self.config
    }
}
