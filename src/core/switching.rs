//! Backend switching rules (`use_backend`) on frontends.
//!
//! The Dataplane API addresses these rules by position only. Every delete therefore
//! re-lists the frontend's rules and resolves the index right before issuing the call;
//! deleting a lower rule shifts all following ones, so an index is never reused.
use crate::{
    core::{
        api::{CONFIGURATION, Removed},
        error::{ManagerError, ManagerResult},
        manager::HaproxyManager,
        naming::{Mode, host_condition, is_standard_port, listener_name, validate_domain},
        records::{SwitchingRuleRecord, encode},
        transaction::Transaction,
    },
    ports::dataplane::ApiRequest,
};

/// Condition selecting the backend: none for TCP, a Host match for HTTP
fn switch_condition(mode: Mode, port: u16, domain: Option<&str>) -> ManagerResult<Option<String>> {
    match mode {
        Mode::Tcp => Ok(None),
        Mode::Http => match domain {
            Some(domain) => {
                validate_domain(domain)?;
                Ok(Some(host_condition(domain, port)))
            }
            None => Err(ManagerError::InvalidArgument(
                "HTTP switching rules require a domain".to_string(),
            )),
        },
    }
}

/// Ports 80 and 443 belong to the HTTP frontends; TCP traffic cannot be switched there
pub(crate) fn ensure_mode_fits_port(mode: Mode, port: u16) -> ManagerResult<()> {
    if mode == Mode::Tcp && is_standard_port(port) {
        return Err(ManagerError::Restricted(format!(
            "port {port} is reserved for HTTP traffic"
        )));
    }
    Ok(())
}

impl HaproxyManager {
    /// All switching rules of a frontend, in evaluation order
    pub(crate) async fn switching_rules(
        &self,
        tx: &Transaction,
        frontend: &str,
    ) -> ManagerResult<Vec<SwitchingRuleRecord>> {
        self.api
            .list(tx.scope(
                ApiRequest::get(format!("{CONFIGURATION}/backend_switching_rules"))
                    .query("frontend", frontend),
            ))
            .await
    }

    /// Route traffic of the frontend on `port` to `backend`.
    ///
    /// TCP frontends get one unconditional rule; HTTP rules match the Host header.
    pub async fn add_backend_switch(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
        backend: &str,
        domain: Option<&str>,
    ) -> ManagerResult<()> {
        ensure_mode_fits_port(mode, port)?;
        let condition = switch_condition(mode, port, domain)?;
        let frontend = listener_name(mode, port);

        if self
            .find_switch_index(tx, &frontend, backend, condition.as_deref())
            .await?
            .is_some()
        {
            tracing::debug!(%frontend, backend, "Switching rule already attached");
            return Ok(());
        }

        let rule = SwitchingRuleRecord::new(backend, condition);
        self.api
            .apply(tx.scope(
                ApiRequest::post(format!("{CONFIGURATION}/backend_switching_rules"))
                    .query("frontend", &frontend)
                    .json(encode(&rule)?),
            ))
            .await?;

        tracing::info!(%frontend, backend, domain = ?domain, "Attached switching rule");
        Ok(())
    }

    /// Current position of the matching rule, `None` when absent
    pub async fn fetch_switch_index(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
        backend: &str,
        domain: Option<&str>,
    ) -> ManagerResult<Option<i64>> {
        let condition = switch_condition(mode, port, domain)?;
        self.find_switch_index(tx, &listener_name(mode, port), backend, condition.as_deref())
            .await
    }

    async fn find_switch_index(
        &self,
        tx: &Transaction,
        frontend: &str,
        backend: &str,
        condition: Option<&str>,
    ) -> ManagerResult<Option<i64>> {
        let rules = self.switching_rules(tx, frontend).await?;
        rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(backend, condition))
            .map(|(position, rule)| match rule.index {
                Some(index) => Ok(index),
                None => i64::try_from(position).map_err(|e| {
                    ManagerError::malformed("backend_switching_rules", e.to_string())
                }),
            })
            .transpose()
    }

    /// Detach the rule routing to `backend`; absent frontend or rule is success
    pub async fn delete_backend_switch(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
        backend: &str,
        domain: Option<&str>,
    ) -> ManagerResult<()> {
        let frontend = listener_name(mode, port);
        if !self.is_frontend_exist(tx, mode, port).await? {
            tracing::debug!(%frontend, "Frontend absent, nothing to detach");
            return Ok(());
        }
        let Some(index) = self
            .fetch_switch_index(tx, mode, port, backend, domain)
            .await?
        else {
            tracing::debug!(%frontend, backend, "Switching rule already absent");
            return Ok(());
        };

        let removed = self
            .api
            .remove(tx.scope(
                ApiRequest::delete(format!("{CONFIGURATION}/backend_switching_rules/{index}"))
                    .query("frontend", &frontend),
            ))
            .await?;
        if removed == Removed::Removed {
            tracing::info!(%frontend, backend, index, "Detached switching rule");
        }
        Ok(())
    }
}
