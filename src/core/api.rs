use std::sync::Arc;

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::{
    core::{
        error::{ManagerError, ManagerResult},
        records::{Versioned, decode},
    },
    ports::dataplane::{ApiRequest, ApiResponse, DataplaneTransport},
};

pub(crate) const CONFIGURATION: &str = "/services/haproxy/configuration";
pub(crate) const TRANSACTIONS: &str = "/services/haproxy/transactions";
pub(crate) const SSL_STORAGE: &str = "/services/haproxy/storage/ssl_certificates";

/// Outcome of a create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Created {
    Created,
    /// 409: an object with the same identity is already present
    AlreadyExists,
}

/// Outcome of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removed {
    Removed,
    NotFound,
}

/// Status-classifying wrapper around the transport port.
///
/// Applies the Dataplane status contract: 2xx success, 404 on read or delete means
/// absent, 409 on create means already present, anything else is an error.
#[derive(Clone)]
pub(crate) struct DataplaneApi {
    transport: Arc<dyn DataplaneTransport>,
}

impl DataplaneApi {
    pub(crate) fn new(transport: Arc<dyn DataplaneTransport>) -> Self {
        Self { transport }
    }

    pub(crate) async fn send(&self, req: ApiRequest) -> ManagerResult<ApiResponse> {
        Ok(self.transport.issue(req).await?)
    }

    pub(crate) fn unexpected(req: &ApiRequest, resp: &ApiResponse) -> ManagerError {
        ManagerError::Api {
            method: req.method.to_string(),
            path: req.path.clone(),
            status: resp.status,
            message: resp.message(),
        }
    }

    /// Decode a plain (non-enveloped) 2xx body
    pub(crate) async fn read<T: DeserializeOwned>(&self, req: ApiRequest) -> ManagerResult<T> {
        let resp = self.send(req.clone()).await?;
        if !resp.is_success() {
            return Err(Self::unexpected(&req, &resp));
        }
        decode(&req.path, &resp.body)
    }

    /// GET a single object; `None` when the API answers 404
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        req: ApiRequest,
    ) -> ManagerResult<Option<T>> {
        let resp = self.send(req.clone()).await?;
        match resp.status {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let envelope: Versioned<T> = decode(&req.path, &resp.body)?;
                Ok(Some(envelope.data))
            }
            _ => Err(Self::unexpected(&req, &resp)),
        }
    }

    /// GET a collection; a missing parent (404) yields an empty list
    pub(crate) async fn list<T: DeserializeOwned>(&self, req: ApiRequest) -> ManagerResult<Vec<T>> {
        Ok(self.fetch::<Option<Vec<T>>>(req).await?.flatten().unwrap_or_default())
    }

    pub(crate) async fn create(&self, req: ApiRequest) -> ManagerResult<Created> {
        let resp = self.send(req.clone()).await?;
        match resp.status {
            StatusCode::CONFLICT => Ok(Created::AlreadyExists),
            status if status.is_success() => Ok(Created::Created),
            _ => Err(Self::unexpected(&req, &resp)),
        }
    }

    pub(crate) async fn apply(&self, req: ApiRequest) -> ManagerResult<()> {
        let resp = self.send(req.clone()).await?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(Self::unexpected(&req, &resp))
        }
    }

    pub(crate) async fn remove(&self, req: ApiRequest) -> ManagerResult<Removed> {
        let resp = self.send(req.clone()).await?;
        match resp.status {
            StatusCode::NOT_FOUND => Ok(Removed::NotFound),
            status if status.is_success() => Ok(Removed::Removed),
            _ => Err(Self::unexpected(&req, &resp)),
        }
    }
}
