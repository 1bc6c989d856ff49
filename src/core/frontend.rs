use crate::{
    core::{
        api::{CONFIGURATION, Created, Removed},
        error::{ManagerError, ManagerResult},
        manager::HaproxyManager,
        naming::{Mode, frontend_name, is_standard_port, listener_name},
        records::{BindRecord, FrontendRecord, encode},
        transaction::Transaction,
    },
    ports::dataplane::ApiRequest,
};

impl HaproxyManager {
    /// Ensure a listener for `mode` on `port` exists.
    ///
    /// Ports 80/443 are served by the permanent `fe_http`/`fe_https` frontends and are a
    /// no-op. A port may carry a single frontend whatever its mode.
    pub async fn add_frontend(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
        restricted_ports: &[u16],
    ) -> ManagerResult<()> {
        if is_standard_port(port) {
            tracing::debug!(port, "Standard port is served by a permanent frontend");
            return Ok(());
        }
        if restricted_ports.contains(&port) {
            return Err(ManagerError::Restricted(format!(
                "port {port} is restricted and cannot be bound"
            )));
        }
        if self.is_frontend_exist(tx, mode, port).await? {
            tracing::debug!(port, %mode, "Frontend already exists");
            return Ok(());
        }
        if self.is_frontend_exist(tx, mode.other(), port).await? {
            return Err(ManagerError::Conflict(format!(
                "port {port} is already bound by {}",
                frontend_name(mode.other(), port)
            )));
        }

        let name = frontend_name(mode, port);
        let record = FrontendRecord {
            name: name.clone(),
            mode,
            maxconn: Some(self.frontend.max_connections),
            default_backend: Some(self.frontend.default_backend.clone()),
        };
        let created = self
            .api
            .create(tx.scope(
                ApiRequest::post(format!("{CONFIGURATION}/frontends")).json(encode(&record)?),
            ))
            .await?;
        if created == Created::AlreadyExists {
            tracing::warn!(frontend = %name, "Frontend appeared concurrently, reusing it");
        }

        let bind = BindRecord {
            name: name.clone(),
            address: "*".to_string(),
            port,
        };
        let bound = self
            .api
            .create(tx.scope(
                ApiRequest::post(format!("{CONFIGURATION}/binds"))
                    .query("frontend", &name)
                    .json(encode(&bind)?),
            ))
            .await?;
        if bound == Created::AlreadyExists {
            tracing::warn!(frontend = %name, port, "Bind already present");
        }

        tracing::info!(frontend = %name, port, "Added frontend");
        Ok(())
    }

    /// Whether the frontend serving `mode`/`port` exists
    pub async fn is_frontend_exist(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
    ) -> ManagerResult<bool> {
        let name = listener_name(mode, port);
        let frontend: Option<FrontendRecord> = self
            .api
            .fetch(tx.scope(ApiRequest::get(format!("{CONFIGURATION}/frontends/{name}"))))
            .await?;
        Ok(frontend.is_some())
    }

    /// Every frontend of the configuration, the permanent ones included
    pub(crate) async fn frontends(&self, tx: &Transaction) -> ManagerResult<Vec<FrontendRecord>> {
        self.api
            .list(tx.scope(ApiRequest::get(format!("{CONFIGURATION}/frontends"))))
            .await
    }

    /// Whether any backend switching rule is still attached to the frontend
    pub async fn is_other_switching_rule_exist(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
    ) -> ManagerResult<bool> {
        let rules = self.switching_rules(tx, &listener_name(mode, port)).await?;
        Ok(!rules.is_empty())
    }

    /// Remove the frontend for `mode`/`port`.
    ///
    /// HTTP frontends are shared by every domain routed on the port and are kept while
    /// any switching rule remains. TCP frontends carry a single route and always go.
    pub async fn delete_frontend(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
    ) -> ManagerResult<()> {
        if is_standard_port(port) {
            return Ok(());
        }
        if !self.is_frontend_exist(tx, mode, port).await? {
            tracing::debug!(port, %mode, "Frontend already absent");
            return Ok(());
        }
        if mode == Mode::Http && self.is_other_switching_rule_exist(tx, mode, port).await? {
            tracing::info!(
                port,
                "Keeping HTTP frontend, switching rules of other domains are still attached"
            );
            return Ok(());
        }

        let name = frontend_name(mode, port);
        let removed = self
            .api
            .remove(tx.scope(ApiRequest::delete(format!("{CONFIGURATION}/frontends/{name}"))))
            .await?;
        if removed == Removed::Removed {
            tracing::info!(frontend = %name, "Deleted frontend");
        }
        Ok(())
    }
}
