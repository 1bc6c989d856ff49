use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use http::{HeaderValue, Request, header};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::{
    net::{TcpStream, UnixStream},
    time::timeout,
};
use tracing::Instrument;
use url::form_urlencoded;

use crate::{
    config::DataplaneConfig,
    ports::dataplane::{
        ApiRequest, ApiResponse, DataplaneTransport, RequestBody, TransportError, TransportResult,
    },
};

const MULTIPART_BOUNDARY: &str = "haproxy-manager-boundary-7MA4YWxkTrZu0gW";

/// Where the Dataplane API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `unix:///var/run/dataplaneapi.sock`
    Unix(PathBuf),
    /// `tcp://127.0.0.1:5555`
    Tcp(String),
}

impl Endpoint {
    /// Value used for the `Host` header
    fn authority(&self) -> &str {
        match self {
            Endpoint::Unix(_) => "localhost",
            Endpoint::Tcp(addr) => addr,
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(TransportError::InvalidRequest(
                    "unix endpoint requires a socket path".to_string(),
                ));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = s.strip_prefix("tcp://") {
            let addr = addr.trim_end_matches('/');
            if addr.rsplit_once(':').is_none_or(|(host, port)| {
                host.is_empty() || port.parse::<u16>().is_err()
            }) {
                return Err(TransportError::InvalidRequest(format!(
                    "tcp endpoint must be host:port, got: {addr}"
                )));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }
        Err(TransportError::InvalidRequest(format!(
            "endpoint must start with unix:// or tcp://, got: {s}"
        )))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

/// Dataplane API client over hyper HTTP/1.1 connections.
///
/// Responsibilities:
/// * Opens one connection per call over a unix socket or TCP
/// * Adds Basic authentication and content negotiation headers
/// * Encodes query strings and request bodies (JSON, text, multipart upload)
/// * Bounds every exchange with a transport-level timeout
///
/// Status codes are never interpreted here; that is the reconciler's job.
pub struct DataplaneClient {
    endpoint: Endpoint,
    base_path: String,
    authorization: HeaderValue,
    timeout: Duration,
}

impl DataplaneClient {
    /// Create a new client for the given endpoint and credentials.
    pub fn new(
        endpoint: Endpoint,
        base_path: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> TransportResult<Self> {
        let credentials = STANDARD.encode(format!("{username}:{password}"));
        let authorization = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        tracing::info!(endpoint = %endpoint, base_path, "Created Dataplane API client");
        Ok(Self {
            endpoint,
            base_path: base_path.trim_end_matches('/').to_string(),
            authorization,
            timeout,
        })
    }

    /// Build a client from the `[dataplane]` configuration section.
    pub fn from_config(config: &DataplaneConfig) -> TransportResult<Self> {
        let endpoint = config.endpoint.parse::<Endpoint>()?;
        Self::new(
            endpoint,
            &config.base_path,
            &config.username,
            &config.password,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Full request target: base path, API path and encoded query string
    fn request_target(&self, req: &ApiRequest) -> String {
        let mut target = format!("{}{}", self.base_path, req.path);
        if !req.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(req.query.iter())
                .finish();
            target.push('?');
            target.push_str(&query);
        }
        target
    }

    /// Encode the body and pick its content type
    fn encode_body(body: &RequestBody) -> TransportResult<(Option<String>, Bytes)> {
        match body {
            RequestBody::Empty => Ok((None, Bytes::new())),
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(value)
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                Ok((Some("application/json".to_string()), Bytes::from(bytes)))
            }
            RequestBody::Text(text) => Ok((
                Some("text/plain".to_string()),
                Bytes::from(text.clone()),
            )),
            RequestBody::Multipart {
                field,
                filename,
                content,
            } => {
                let mut payload = String::new();
                payload.push_str(&format!("--{MULTIPART_BOUNDARY}\r\n"));
                payload.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
                ));
                payload.push_str("Content-Type: application/octet-stream\r\n\r\n");
                payload.push_str(content);
                payload.push_str(&format!("\r\n--{MULTIPART_BOUNDARY}--\r\n"));
                Ok((
                    Some(format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")),
                    Bytes::from(payload),
                ))
            }
        }
    }

    fn build_request(&self, req: &ApiRequest) -> TransportResult<Request<Full<Bytes>>> {
        let (content_type, body) = Self::encode_body(&req.body)?;
        let mut builder = Request::builder()
            .method(req.method.clone())
            .uri(self.request_target(req))
            .header(header::HOST, self.endpoint.authority())
            .header(header::AUTHORIZATION, self.authorization.clone())
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, "haproxy-manager/0.1");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder
            .body(Full::new(body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }

    async fn connect(&self) -> TransportResult<SendRequest<Full<Bytes>>> {
        match &self.endpoint {
            Endpoint::Unix(path) => {
                let stream = UnixStream::connect(path).await.map_err(|e| {
                    TransportError::ConnectionError(format!("{}: {e}", path.display()))
                })?;
                Self::handshake(TokioIo::new(stream)).await
            }
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str())
                    .await
                    .map_err(|e| TransportError::ConnectionError(format!("{addr}: {e}")))?;
                Self::handshake(TokioIo::new(stream)).await
            }
        }
    }

    async fn handshake<I>(io: I) -> TransportResult<SendRequest<Full<Bytes>>>
    where
        I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    {
        let (sender, connection) = http1::handshake(io)
            .await
            .map_err(|e| TransportError::ConnectionError(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!("Dataplane connection closed with error: {}", e);
            }
        });
        Ok(sender)
    }

    async fn exchange(&self, req: ApiRequest) -> TransportResult<ApiResponse> {
        let request = self.build_request(&req)?;
        let mut sender = self.connect().await?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| TransportError::ProtocolError(format!("{req}: {e}")))?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::ProtocolError(format!("{req}: {e}")))?
            .to_bytes();

        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl DataplaneTransport for DataplaneClient {
    async fn issue(&self, req: ApiRequest) -> TransportResult<ApiResponse> {
        let span = tracing::debug_span!(
            "dataplane_request",
            http.method = %req.method,
            http.path = %req.path,
            http.status_code = tracing::field::Empty,
        );

        let description = req.to_string();
        match timeout(self.timeout, self.exchange(req))
            .instrument(span.clone())
            .await
        {
            Ok(Ok(response)) => {
                span.record("http.status_code", response.status.as_u16());
                tracing::debug!("{} -> {}", description, response.status);
                Ok(response)
            }
            Ok(Err(e)) => {
                tracing::error!("Dataplane request {} failed: {}", description, e);
                Err(e)
            }
            Err(_) => {
                tracing::error!("Dataplane request {} timed out", description);
                Err(TransportError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
