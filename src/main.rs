use std::{path::Path, sync::Arc};

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use haproxy_manager::{
    BackendSpec, CertificateBundle, Credential, DataplaneClient, HaproxyManager, ManagerResult,
    Mode, RetryPolicy, RouteSpec, Transaction,
    config::{ManagerConfig, ManagerConfigValidator, loader::load_config},
    retry_on_version_conflict, tracing_setup,
};
use tracing::Instrument;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(short, long, default_value = "config.toml", global = true)]
    config: String,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file
    Init,
    /// Print the running configuration version
    Version,
    /// Print the running configuration text
    Raw,
    /// Backend pools
    Backend {
        #[clap(subcommand)]
        action: BackendAction,
    },
    /// Switching rules between frontends and existing backends
    Link {
        #[clap(subcommand)]
        action: LinkAction,
    },
    /// Frontend, backend and switching rule of a service in one pass
    Route {
        #[clap(subcommand)]
        action: RouteAction,
    },
    /// User lists and Basic-Auth rules
    Auth {
        #[clap(subcommand)]
        action: AuthAction,
    },
    /// HTTPS upgrades and domain redirects
    Redirect {
        #[clap(subcommand)]
        action: RedirectAction,
    },
    /// Certificate bundles
    Ssl {
        #[clap(subcommand)]
        action: SslAction,
    },
}

#[derive(Subcommand, Debug)]
enum BackendAction {
    Add {
        #[clap(long, default_value = "http")]
        protocol: Mode,
        #[clap(long)]
        service: String,
        #[clap(long)]
        port: u16,
        #[clap(long, default_value_t = 1)]
        replicas: u32,
    },
    Delete {
        #[clap(long, default_value = "http")]
        protocol: Mode,
        #[clap(long)]
        service: String,
        #[clap(long)]
        port: u16,
    },
    /// Change the replica count in place
    Scale {
        #[clap(long, default_value = "http")]
        protocol: Mode,
        #[clap(long)]
        service: String,
        #[clap(long)]
        port: u16,
        #[clap(long)]
        replicas: u32,
    },
}

#[derive(Subcommand, Debug)]
enum LinkAction {
    Add {
        #[clap(long, default_value = "http")]
        mode: Mode,
        /// Public port; 80 and 443 use the permanent HTTP/HTTPS frontends
        #[clap(long)]
        port: u16,
        #[clap(long)]
        backend: String,
        #[clap(long)]
        domain: Option<String>,
    },
    Delete {
        #[clap(long, default_value = "http")]
        mode: Mode,
        #[clap(long)]
        port: u16,
        #[clap(long)]
        backend: String,
        #[clap(long)]
        domain: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct RouteArgs {
    #[clap(long)]
    domain: Option<String>,
    #[clap(long, default_value = "http")]
    protocol: Mode,
    #[clap(long)]
    port: u16,
    #[clap(long)]
    service: String,
    #[clap(long)]
    service_port: u16,
    #[clap(long, default_value_t = 1)]
    replicas: u32,
}

impl From<&RouteArgs> for RouteSpec {
    fn from(args: &RouteArgs) -> Self {
        RouteSpec {
            domain: args.domain.clone(),
            protocol: args.protocol,
            port: args.port,
            service: args.service.clone(),
            service_port: args.service_port,
            replicas: args.replicas,
        }
    }
}

#[derive(Subcommand, Debug)]
enum RouteAction {
    Add(RouteArgs),
    Delete(RouteArgs),
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    UserlistAdd {
        #[clap(long)]
        userlist: String,
    },
    UserlistDelete {
        #[clap(long)]
        userlist: String,
    },
    /// Add the user or change its password
    UserSet {
        #[clap(long)]
        userlist: String,
        #[clap(long)]
        username: String,
        #[clap(long, env = "HAPROXY_MANAGER_USER_PASSWORD")]
        password: String,
    },
    UserDelete {
        #[clap(long)]
        userlist: String,
        #[clap(long)]
        username: String,
    },
    Enable {
        #[clap(long, default_value_t = 443)]
        port: u16,
        #[clap(long)]
        domain: String,
        #[clap(long)]
        userlist: String,
    },
    Disable {
        #[clap(long, default_value_t = 443)]
        port: u16,
        #[clap(long)]
        domain: String,
        #[clap(long)]
        userlist: String,
    },
}

#[derive(Subcommand, Debug)]
enum RedirectAction {
    HttpsEnable {
        #[clap(long)]
        domain: String,
    },
    HttpsDisable {
        #[clap(long)]
        domain: String,
    },
    Add {
        #[clap(long)]
        domain: String,
        #[clap(long)]
        url: String,
    },
    Delete {
        #[clap(long)]
        domain: String,
    },
}

#[derive(Subcommand, Debug)]
enum SslAction {
    Update {
        #[clap(long)]
        domain: String,
        /// PEM private key file
        #[clap(long)]
        key: String,
        /// PEM full chain file
        #[clap(long)]
        chain: String,
    },
    Delete {
        #[clap(long)]
        domain: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match &args.command {
        Commands::Validate => return validate_config_command(&args.config).await,
        Commands::Init => return init_config_command(&args.config).await,
        _ => {}
    }

    let config = load_config(&args.config)
        .await
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    ManagerConfigValidator::validate(&config)
        .map_err(|e| eyre!("Invalid configuration {}:\n{}", args.config, e))?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    let client = DataplaneClient::from_config(&config.dataplane)
        .context("Failed to create Dataplane API client")?;
    let manager = HaproxyManager::new(Arc::new(client), &config);

    match args.command {
        Commands::Version => {
            let version = manager
                .configuration_version()
                .await
                .context("Failed to read configuration version")?;
            println!("{version}");
            Ok(())
        }
        Commands::Raw => {
            let raw = manager
                .raw_configuration()
                .await
                .context("Failed to read configuration")?;
            println!("{raw}");
            Ok(())
        }
        Commands::Ssl { action } => run_ssl(&manager, action).await,
        command => run_in_transaction(&manager, &config, &command).await,
    }
}

/// Apply one mutating command inside a fresh transaction, retried on version conflicts
async fn run_in_transaction(
    manager: &HaproxyManager,
    config: &ManagerConfig,
    command: &Commands,
) -> Result<()> {
    let policy = RetryPolicy::from(&config.retry);
    let restricted = config.restricted_ports.as_slice();
    let span = tracing_setup::reconcile_span(command_name(command));

    let mut attempt = 0u32;
    retry_on_version_conflict(&policy, || {
        attempt += 1;
        let span = span.clone();
        span.record("attempt", attempt);
        async move {
            let tx = manager.new_transaction().await?;
            tracing::Span::current().record("transaction_id", tx.id());
            apply_command(manager, &tx, command, restricted).await?;
            manager.commit(&tx).await
        }
        .instrument(span)
    })
    .await
    .with_context(|| format!("{} failed", command_name(command)))?;

    println!("✅ {} applied", command_name(command));
    Ok(())
}

async fn apply_command(
    manager: &HaproxyManager,
    tx: &Transaction,
    command: &Commands,
    restricted: &[u16],
) -> ManagerResult<()> {
    match command {
        Commands::Backend { action } => match action {
            BackendAction::Add {
                protocol,
                service,
                port,
                replicas,
            } => {
                manager
                    .add_backend(tx, *protocol, service, *port, *replicas)
                    .await
            }
            BackendAction::Delete {
                protocol,
                service,
                port,
            } => manager.delete_backend(tx, *protocol, service, *port).await,
            BackendAction::Scale {
                protocol,
                service,
                port,
                replicas,
            } => {
                let current = manager
                    .get_replica_count(tx, *protocol, service, *port)
                    .await?
                    .unwrap_or_default();
                manager
                    .update_backend(
                        tx,
                        &BackendSpec::new(*protocol, service.as_str(), *port, current),
                        &BackendSpec::new(*protocol, service.as_str(), *port, *replicas),
                    )
                    .await
            }
        },
        Commands::Link { action } => match action {
            LinkAction::Add {
                mode,
                port,
                backend,
                domain,
            } => match *port {
                80 => {
                    manager
                        .add_http_link(tx, backend, domain.as_deref().unwrap_or_default())
                        .await
                }
                443 => {
                    manager
                        .add_https_link(tx, backend, domain.as_deref().unwrap_or_default())
                        .await
                }
                port => {
                    manager
                        .add_tcp_link(tx, backend, port, domain.as_deref(), *mode, restricted)
                        .await
                }
            },
            LinkAction::Delete {
                mode,
                port,
                backend,
                domain,
            } => match *port {
                80 => {
                    manager
                        .delete_http_link(tx, backend, domain.as_deref().unwrap_or_default())
                        .await
                }
                443 => {
                    manager
                        .delete_https_link(tx, backend, domain.as_deref().unwrap_or_default())
                        .await
                }
                port => {
                    manager
                        .delete_tcp_link(tx, backend, port, domain.as_deref(), *mode)
                        .await
                }
            },
        },
        Commands::Route { action } => match action {
            RouteAction::Add(args) => {
                manager
                    .route_service(tx, &RouteSpec::from(args), restricted)
                    .await
            }
            RouteAction::Delete(args) => manager.unroute_service(tx, &RouteSpec::from(args)).await,
        },
        Commands::Auth { action } => match action {
            AuthAction::UserlistAdd { userlist } => manager.add_user_list(tx, userlist).await,
            AuthAction::UserlistDelete { userlist } => manager.delete_user_list(tx, userlist).await,
            AuthAction::UserSet {
                userlist,
                username,
                password,
            } => {
                let credential = Credential {
                    userlist: userlist.clone(),
                    username: username.clone(),
                    password: password.clone(),
                };
                manager.ensure_credential(tx, &credential).await
            }
            AuthAction::UserDelete { userlist, username } => {
                manager
                    .delete_user_from_user_list(tx, userlist, username)
                    .await
            }
            AuthAction::Enable {
                port,
                domain,
                userlist,
            } => {
                manager
                    .setup_basic_authentication(tx, Mode::Http, *port, domain, userlist)
                    .await
            }
            AuthAction::Disable {
                port,
                domain,
                userlist,
            } => {
                manager
                    .remove_basic_authentication(tx, Mode::Http, *port, domain, userlist)
                    .await
            }
        },
        Commands::Redirect { action } => match action {
            RedirectAction::HttpsEnable { domain } => {
                manager.enable_https_redirection(tx, domain).await
            }
            RedirectAction::HttpsDisable { domain } => {
                manager.disable_https_redirection(tx, domain).await
            }
            RedirectAction::Add { domain, url } => manager.add_redirect_rule(tx, domain, url).await,
            RedirectAction::Delete { domain } => manager.delete_redirect_rule(tx, domain).await,
        },
        Commands::Validate
        | Commands::Init
        | Commands::Version
        | Commands::Raw
        | Commands::Ssl { .. } => Ok(()),
    }
}

async fn run_ssl(manager: &HaproxyManager, action: SslAction) -> Result<()> {
    match action {
        SslAction::Update { domain, key, chain } => {
            let bundle = CertificateBundle {
                private_key: tokio::fs::read_to_string(&key)
                    .await
                    .with_context(|| format!("Failed to read private key {key}"))?,
                full_chain: tokio::fs::read_to_string(&chain)
                    .await
                    .with_context(|| format!("Failed to read full chain {chain}"))?,
                domain,
            };
            manager
                .apply_certificate(&bundle)
                .await
                .with_context(|| format!("Failed to upload certificate for {}", bundle.domain))?;
            println!("✅ certificate for {} uploaded", bundle.domain);
        }
        SslAction::Delete { domain } => {
            manager
                .delete_ssl(&domain)
                .await
                .with_context(|| format!("Failed to delete certificate for {domain}"))?;
            println!("✅ certificate for {domain} deleted");
        }
    }
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Validate => "validate",
        Commands::Init => "init",
        Commands::Version => "version",
        Commands::Raw => "raw",
        Commands::Backend { .. } => "backend",
        Commands::Link { .. } => "link",
        Commands::Route { .. } => "route",
        Commands::Auth { .. } => "auth",
        Commands::Redirect { .. } => "redirect",
        Commands::Ssl { .. } => "ssl",
    }
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match ManagerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Dataplane endpoint: {}", config.dataplane.endpoint);
            println!("   • Restricted ports: {:?}", config.restricted_ports);
            println!("   • Default backend: {}", config.frontend.default_backend);
            println!(
                "   • Retry: {} attempts, {}ms backoff",
                config.retry.attempts, config.retry.backoff_ms
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Endpoints look like unix:///var/run/dataplaneapi.sock or tcp://host:5555");
            println!("   • Set the password via HAPROXY_MANAGER__DATAPLANE__PASSWORD");
            println!("   • Ports 80 and 443 cannot be listed as restricted");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# HAProxy manager configuration

# Ports that may never be bound by a custom frontend
restricted_ports = [22, 2375, 2376, 5555, 9999]

[dataplane]
endpoint = "unix:///var/run/dataplaneapi.sock"
username = "admin"
# password = "set via HAPROXY_MANAGER__DATAPLANE__PASSWORD"
base_path = "/v2"
timeout_secs = 10

[frontend]
max_connections = 2000
default_backend = "error_backend"

[backend]
resolver = "docker"
init_addr = "libc,none"

[retry]
attempts = 3
backoff_ms = 1000

[logging]
level = "info"
json = false
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'haproxy-manager --config {config_path} validate' to check it");
    Ok(())
}
