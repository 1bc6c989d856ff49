use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use thiserror::Error;

/// Custom error type for Dataplane transport operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// Error when the connection to the Dataplane API cannot be established
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when a request exceeds the transport timeout
    #[error("Timeout error after {0} seconds")]
    Timeout(u64),

    /// Error when the HTTP exchange itself fails mid-flight
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Error when the request cannot be encoded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for Dataplane transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Body of an outgoing Dataplane API request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Text(String),
    /// A single-file `multipart/form-data` upload.
    Multipart {
        field: String,
        filename: String,
        content: String,
    },
}

/// A transport-agnostic Dataplane API call. `path` is relative to the API base path.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.body = RequestBody::Text(value.into());
        self
    }

    pub fn multipart(
        mut self,
        field: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            filename: filename.into(),
            content: content.into(),
        };
        self
    }

    /// Look up the first query value for `key`
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Raw response from the Dataplane API. Status classification is left to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Best-effort extraction of the API's `message` field for error reporting
    pub fn message(&self) -> String {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }
        match serde_json::from_slice::<ErrorBody>(&self.body) {
            Ok(ErrorBody {
                message: Some(message),
            }) => message,
            _ => String::from_utf8_lossy(&self.body).trim().to_string(),
        }
    }
}

/// DataplaneTransport defines the port (interface) to the reverse proxy's management API.
///
/// Implementations only move bytes: authentication, connection handling and timeouts
/// belong here, while every status code is surfaced untouched to the reconciler.
#[async_trait]
pub trait DataplaneTransport: Send + Sync + 'static {
    /// Issue a single authenticated API call
    ///
    /// # Arguments
    /// * `req` - The request to send
    ///
    /// # Returns
    /// A future that resolves to the raw response or a transport failure
    async fn issue(&self, req: ApiRequest) -> TransportResult<ApiResponse>;
}
