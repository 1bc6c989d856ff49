//! Deterministic names and ACL conditions.
//!
//! Every object this crate creates is found again by recomputing its name or condition,
//! so these encoders must stay bit-exact across releases.
use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::{ManagerError, ManagerResult};

pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

/// Always-present frontend bound to port 80
pub const HTTP_FRONTEND: &str = "fe_http";
/// Always-present frontend bound to port 443
pub const HTTPS_FRONTEND: &str = "fe_https";

/// ACL declared in the base configuration matching ACME http-01 challenge paths
pub const LETSENCRYPT_ACL: &str = "letsencrypt-acl";

/// Proxy mode of a frontend or backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Http,
    Tcp,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Http => "http",
            Mode::Tcp => "tcp",
        }
    }

    /// The mode that may not share a port with this one
    pub fn other(&self) -> Mode {
        match self {
            Mode::Http => Mode::Tcp,
            Mode::Tcp => Mode::Http,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Mode::Http),
            "tcp" => Ok(Mode::Tcp),
            other => Err(ManagerError::InvalidArgument(format!(
                "unknown mode '{other}', expected http or tcp"
            ))),
        }
    }
}

/// Ports 80 and 443 are served by the always-present frontends
pub fn is_standard_port(port: u16) -> bool {
    port == HTTP_PORT || port == HTTPS_PORT
}

/// `fe_<mode>_<port>`
pub fn frontend_name(mode: Mode, port: u16) -> String {
    format!("fe_{mode}_{port}")
}

/// Frontend that actually carries traffic for `port`: the fixed `fe_http`/`fe_https`
/// for the standard ports, the derived name otherwise.
pub fn listener_name(mode: Mode, port: u16) -> String {
    match port {
        HTTP_PORT => HTTP_FRONTEND.to_string(),
        HTTPS_PORT => HTTPS_FRONTEND.to_string(),
        _ => frontend_name(mode, port),
    }
}

/// `be_<protocol>_<service>_<port>`
pub fn backend_name(protocol: Mode, service: &str, port: u16) -> String {
    format!("be_{protocol}_{service}_{port}")
}

/// Host header value as seen by HAProxy: non-standard ports carry `:<port>`
pub fn host_with_port(domain: &str, port: u16) -> String {
    if is_standard_port(port) {
        domain.to_string()
    } else {
        format!("{domain}:{port}")
    }
}

// Host names, optionally with a leading wildcard label
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*\.)?[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("invalid domain regex")
});

/// Reject anything that would not survive being embedded in an ACL condition
pub fn validate_domain(domain: &str) -> ManagerResult<()> {
    if domain.len() > 253 || !DOMAIN_PATTERN.is_match(domain) {
        return Err(ManagerError::InvalidArgument(format!(
            "invalid domain '{domain}'"
        )));
    }
    Ok(())
}

/// `{ hdr(host) -i <domain>[:<port>] }`
pub fn host_condition(domain: &str, port: u16) -> String {
    format!("{{ hdr(host) -i {} }}", host_with_port(domain, port))
}

/// Condition for an HTTP Basic-Auth challenge. On the standard ports ACME challenge
/// requests are excluded so certificate renewal is never blocked.
pub fn basic_auth_condition(userlist: &str, domain: &str, port: u16) -> String {
    let condition = format!("!{{ http_auth({userlist}) }} {{ hdr(host) -i {domain} }}");
    if is_standard_port(port) {
        format!("{condition} !{LETSENCRYPT_ACL}")
    } else {
        condition
    }
}

/// Condition for a generic domain redirect
pub fn redirect_condition(domain: &str) -> String {
    format!("{{ hdr(host) -i {domain} }} !{LETSENCRYPT_ACL}")
}

/// `example.com` -> `example_com.pem`
pub fn ssl_file_name(domain: &str) -> String {
    format!("{}.pem", domain.replace('.', "_"))
}
