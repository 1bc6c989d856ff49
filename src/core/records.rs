//! Typed records exchanged with the Dataplane API.
//!
//! Responses are decoded straight into these structs; any shape mismatch becomes
//! [`ManagerError::MalformedResponse`] at the decode step instead of surfacing later.
use serde::{Deserialize, Serialize};

use crate::core::{error::ManagerError, naming::Mode};

/// `{"_version": N, "data": ...}` envelope used by configuration endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Versioned<T> {
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "_version")]
    pub version: i64,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontendRecord {
    pub name: String,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxconn: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BindRecord {
    pub name: String,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendRecord {
    pub name: String,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,
}

/// DNS-driven backend member range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerTemplateRecord {
    pub prefix: String,
    pub num_or_range: String,
    pub fqdn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(
        rename = "init-addr",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub init_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolvers: Option<String>,
}

impl ServerTemplateRecord {
    /// Replica count encoded in `num_or_range` ("3" or "1-3")
    pub fn replica_count(&self) -> Option<u32> {
        match self.num_or_range.split_once('-') {
            Some((low, high)) => {
                let low = low.trim().parse::<u32>().ok()?;
                let high = high.trim().parse::<u32>().ok()?;
                high.checked_sub(low).map(|span| span + 1)
            }
            None => self.num_or_range.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchingRuleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// Target backend
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond_test: Option<String>,
}

impl SwitchingRuleRecord {
    /// `use_backend <backend> [if <cond_test>]`
    pub fn new(backend: &str, cond_test: Option<String>) -> Self {
        Self {
            index: Some(0),
            name: backend.to_string(),
            cond: cond_test.as_ref().map(|_| "if".to_string()),
            cond_test,
        }
    }

    pub fn matches(&self, backend: &str, cond_test: Option<&str>) -> bool {
        if self.name != backend {
            return false;
        }
        match cond_test {
            Some(test) => {
                self.cond.as_deref() == Some("if") && self.cond_test.as_deref() == Some(test)
            }
            None => self.cond_test.as_deref().is_none_or(str::is_empty),
        }
    }
}

/// Flat wire shape of an http-request rule; see [`HttpRequestRule`] for the typed view
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HttpRequestRuleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond_test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redir_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redir_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redir_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_realm: Option<String>,
}

/// What an http-request rule does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpRequestAction {
    /// Challenge with HTTP Basic-Auth against a user list
    Auth { realm: String },
    /// `redirect scheme <scheme> code <code>`
    RedirectScheme { scheme: String, code: u16 },
    /// `redirect location <url> code <code>`
    RedirectLocation { url: String, code: u16 },
    /// Rule types this crate never manages
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestRule {
    pub index: i64,
    pub action: HttpRequestAction,
    pub condition: Option<String>,
}

impl HttpRequestRule {
    pub fn new(action: HttpRequestAction, condition: impl Into<String>) -> Self {
        Self {
            index: 0,
            action,
            condition: Some(condition.into()),
        }
    }

    pub fn condition_is(&self, condition: &str) -> bool {
        self.condition.as_deref() == Some(condition)
    }

    pub fn into_record(self) -> HttpRequestRuleRecord {
        let (cond, cond_test) = match self.condition {
            Some(test) => (Some("if".to_string()), Some(test)),
            None => (None, None),
        };
        let mut record = HttpRequestRuleRecord {
            index: Some(self.index),
            cond,
            cond_test,
            ..Default::default()
        };
        match self.action {
            HttpRequestAction::Auth { realm } => {
                record.rule_type = "auth".to_string();
                record.auth_realm = Some(realm);
            }
            HttpRequestAction::RedirectScheme { scheme, code } => {
                record.rule_type = "redirect".to_string();
                record.redir_type = Some("scheme".to_string());
                record.redir_value = Some(scheme);
                record.redir_code = Some(code);
            }
            HttpRequestAction::RedirectLocation { url, code } => {
                record.rule_type = "redirect".to_string();
                record.redir_type = Some("location".to_string());
                record.redir_value = Some(url);
                record.redir_code = Some(code);
            }
            HttpRequestAction::Other(rule_type) => record.rule_type = rule_type,
        }
        record
    }
}

impl TryFrom<HttpRequestRuleRecord> for HttpRequestRule {
    type Error = String;

    fn try_from(record: HttpRequestRuleRecord) -> Result<Self, Self::Error> {
        let index = record
            .index
            .ok_or_else(|| format!("{} rule without index", record.rule_type))?;
        let action = match record.rule_type.as_str() {
            "auth" => HttpRequestAction::Auth {
                realm: record.auth_realm.unwrap_or_default(),
            },
            "redirect" => {
                let value = record
                    .redir_value
                    .ok_or_else(|| format!("redirect rule {index} without redir_value"))?;
                let code = record.redir_code.unwrap_or(302);
                match record.redir_type.as_deref() {
                    Some("scheme") => HttpRequestAction::RedirectScheme {
                        scheme: value,
                        code,
                    },
                    Some("location") => HttpRequestAction::RedirectLocation { url: value, code },
                    other => HttpRequestAction::Other(format!(
                        "redirect {}",
                        other.unwrap_or_default()
                    )),
                }
            }
            other => HttpRequestAction::Other(other.to_string()),
        };
        Ok(HttpRequestRule {
            index,
            action,
            condition: record.cond_test.filter(|_| record.cond.as_deref() == Some("if")),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserListRecord {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub secure_password: bool,
}

/// Encode a record as a JSON request body
pub(crate) fn encode<T: Serialize>(record: &T) -> Result<serde_json::Value, ManagerError> {
    serde_json::to_value(record).map_err(|e| ManagerError::InvalidArgument(e.to_string()))
}

/// Decode a response body, mapping failures to a typed error
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    path: &str,
    body: &[u8],
) -> Result<T, ManagerError> {
    serde_json::from_slice(body).map_err(|e| ManagerError::malformed(path, e))
}
