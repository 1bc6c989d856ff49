use std::sync::Arc;

use crate::{
    config::models::{BackendDefaults, FrontendDefaults, ManagerConfig},
    core::api::DataplaneApi,
    ports::dataplane::DataplaneTransport,
};

/// Stateless reconciler between desired routing state and a live HAProxy.
///
/// Holds no record of what exists remotely: every probe re-queries the Dataplane API,
/// which keeps each operation idempotent and safe to re-run after an interrupted pass.
/// The controller operations live in the sibling modules (`frontend`, `backend`,
/// `switching`, `auth`, `redirect`, `ssl`, `link`).
#[derive(Clone)]
pub struct HaproxyManager {
    pub(crate) api: DataplaneApi,
    pub(crate) frontend: FrontendDefaults,
    pub(crate) backend: BackendDefaults,
}

impl HaproxyManager {
    pub fn new(transport: Arc<dyn DataplaneTransport>, config: &ManagerConfig) -> Self {
        Self {
            api: DataplaneApi::new(transport),
            frontend: config.frontend.clone(),
            backend: config.backend.clone(),
        }
    }

    /// Manager with default frontend/backend settings
    pub fn with_defaults(transport: Arc<dyn DataplaneTransport>) -> Self {
        Self::new(transport, &ManagerConfig::default())
    }
}
