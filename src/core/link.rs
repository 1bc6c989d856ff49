//! Composite "route port/domain to backend" operations.
//!
//! A routable unit moves `absent -> frontend ensured -> backend ensured -> switch rule
//! attached` and back in reverse order on teardown. Each step is idempotent on its own,
//! so an interrupted pass is repaired by simply running it again.
use serde::{Deserialize, Serialize};

use crate::core::{
    error::{ManagerError, ManagerResult},
    manager::HaproxyManager,
    naming::{HTTP_PORT, HTTPS_PORT, Mode, backend_name, is_standard_port},
    switching::ensure_mode_fits_port,
    transaction::Transaction,
};

/// Desired route as delivered by the routing state source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Host to match; required for HTTP routes, ignored for TCP
    pub domain: Option<String>,
    pub protocol: Mode,
    /// Public port on the proxy
    pub port: u16,
    pub service: String,
    pub service_port: u16,
    pub replicas: u32,
}

impl RouteSpec {
    pub fn backend_name(&self) -> String {
        backend_name(self.protocol, &self.service, self.service_port)
    }
}

/// Certificate material as delivered by the ACME client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub domain: String,
    pub private_key: String,
    pub full_chain: String,
}

/// Basic-Auth credential as delivered by the credential source; `password` is plaintext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub userlist: String,
    pub username: String,
    pub password: String,
}

impl HaproxyManager {
    /// Route a custom port (optionally a domain on it) to `backend`
    pub async fn add_tcp_link(
        &self,
        tx: &Transaction,
        backend: &str,
        port: u16,
        domain: Option<&str>,
        mode: Mode,
        restricted_ports: &[u16],
    ) -> ManagerResult<()> {
        if restricted_ports.contains(&port) {
            return Err(ManagerError::Restricted(format!(
                "port {port} is restricted and cannot be linked"
            )));
        }
        if is_standard_port(port) {
            return Err(ManagerError::Restricted(format!(
                "port {port} is served by the HTTP/HTTPS links"
            )));
        }
        self.add_frontend(tx, mode, port, restricted_ports).await?;
        self.add_backend_switch(tx, mode, port, backend, domain).await
    }

    pub async fn delete_tcp_link(
        &self,
        tx: &Transaction,
        backend: &str,
        port: u16,
        domain: Option<&str>,
        mode: Mode,
    ) -> ManagerResult<()> {
        self.delete_backend_switch(tx, mode, port, backend, domain)
            .await?;
        self.delete_frontend(tx, mode, port).await
    }

    pub async fn add_http_link(
        &self,
        tx: &Transaction,
        backend: &str,
        domain: &str,
    ) -> ManagerResult<()> {
        self.add_backend_switch(tx, Mode::Http, HTTP_PORT, backend, Some(domain))
            .await
    }

    pub async fn delete_http_link(
        &self,
        tx: &Transaction,
        backend: &str,
        domain: &str,
    ) -> ManagerResult<()> {
        self.delete_backend_switch(tx, Mode::Http, HTTP_PORT, backend, Some(domain))
            .await
    }

    pub async fn add_https_link(
        &self,
        tx: &Transaction,
        backend: &str,
        domain: &str,
    ) -> ManagerResult<()> {
        self.add_backend_switch(tx, Mode::Http, HTTPS_PORT, backend, Some(domain))
            .await
    }

    pub async fn delete_https_link(
        &self,
        tx: &Transaction,
        backend: &str,
        domain: &str,
    ) -> ManagerResult<()> {
        self.delete_backend_switch(tx, Mode::Http, HTTPS_PORT, backend, Some(domain))
            .await
    }

    /// Bring a route to the fully routed state
    pub async fn route_service(
        &self,
        tx: &Transaction,
        route: &RouteSpec,
        restricted_ports: &[u16],
    ) -> ManagerResult<()> {
        if restricted_ports.contains(&route.port) {
            return Err(ManagerError::Restricted(format!(
                "port {} is restricted and cannot be linked",
                route.port
            )));
        }
        ensure_mode_fits_port(route.protocol, route.port)?;
        let backend = route.backend_name();
        let domain = route.domain.as_deref();

        self.add_frontend(tx, route.protocol, route.port, restricted_ports)
            .await?;
        self.add_backend(
            tx,
            route.protocol,
            &route.service,
            route.service_port,
            route.replicas,
        )
        .await?;
        self.add_backend_switch(tx, route.protocol, route.port, &backend, domain)
            .await?;

        tracing::info!(
            port = route.port,
            domain = ?domain,
            backend = %backend,
            "Route is in place"
        );
        Ok(())
    }

    /// Whether any frontend still names `backend` in a switching rule or as its default
    pub async fn is_backend_referenced(
        &self,
        tx: &Transaction,
        backend: &str,
    ) -> ManagerResult<bool> {
        for frontend in self.frontends(tx).await? {
            if frontend.default_backend.as_deref() == Some(backend) {
                return Ok(true);
            }
            let rules = self.switching_rules(tx, &frontend.name).await?;
            if rules.iter().any(|rule| rule.name == backend) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Tear a route down in reverse order.
    ///
    /// The backend is kept while any frontend still targets it, e.g. the same service
    /// served on both standard ports or a second domain on the same port.
    pub async fn unroute_service(&self, tx: &Transaction, route: &RouteSpec) -> ManagerResult<()> {
        let backend = route.backend_name();
        let domain = route.domain.as_deref();

        self.delete_backend_switch(tx, route.protocol, route.port, &backend, domain)
            .await?;
        if self.is_backend_referenced(tx, &backend).await? {
            tracing::info!(backend = %backend, "Backend still referenced, keeping it");
        } else {
            self.delete_backend(tx, route.protocol, &route.service, route.service_port)
                .await?;
        }
        self.delete_frontend(tx, route.protocol, route.port).await?;

        tracing::info!(port = route.port, domain = ?domain, backend = %backend, "Route removed");
        Ok(())
    }

    pub async fn apply_certificate(&self, bundle: &CertificateBundle) -> ManagerResult<()> {
        self.update_ssl(&bundle.domain, &bundle.private_key, &bundle.full_chain)
            .await
    }

    /// Make the credential present with the given password, creating the list if needed
    pub async fn ensure_credential(
        &self,
        tx: &Transaction,
        credential: &Credential,
    ) -> ManagerResult<()> {
        self.add_user_list(tx, &credential.userlist).await?;
        if self
            .is_user_exist(tx, &credential.userlist, &credential.username)
            .await?
        {
            self.change_user_password_in_user_list(
                tx,
                &credential.userlist,
                &credential.username,
                &credential.password,
            )
            .await
        } else {
            self.add_user_in_user_list(
                tx,
                &credential.userlist,
                &credential.username,
                &credential.password,
            )
            .await
        }
    }
}
