use crate::{
    core::{
        api::{CONFIGURATION, Created, Removed},
        error::{ManagerError, ManagerResult},
        manager::HaproxyManager,
        naming::{Mode, backend_name},
        records::{Balance, BackendRecord, ServerTemplateRecord, encode},
        transaction::Transaction,
    },
    ports::dataplane::ApiRequest,
};

/// Identity and size of a backend pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub protocol: Mode,
    /// Service DNS name resolved by the proxy's resolver
    pub service: String,
    pub port: u16,
    pub replicas: u32,
}

impl BackendSpec {
    pub fn new(protocol: Mode, service: impl Into<String>, port: u16, replicas: u32) -> Self {
        Self {
            protocol,
            service: service.into(),
            port,
            replicas,
        }
    }

    pub fn name(&self) -> String {
        backend_name(self.protocol, &self.service, self.port)
    }

    /// Same pool identity, possibly a different replica count
    pub fn same_identity(&self, other: &BackendSpec) -> bool {
        self.protocol == other.protocol && self.service == other.service && self.port == other.port
    }
}

fn validate_service(service: &str, port: u16) -> ManagerResult<()> {
    if service.is_empty() || service.chars().any(char::is_whitespace) {
        return Err(ManagerError::InvalidArgument(format!(
            "invalid service name '{service}'"
        )));
    }
    if port == 0 {
        return Err(ManagerError::InvalidArgument(
            "service port must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

impl HaproxyManager {
    /// Create a round-robin pool whose members come from a DNS server-template
    /// on the service name. At least one replica slot is always reserved.
    ///
    /// An existing pool has its replica range brought to `replicas`.
    pub async fn add_backend(
        &self,
        tx: &Transaction,
        protocol: Mode,
        service: &str,
        port: u16,
        replicas: u32,
    ) -> ManagerResult<()> {
        validate_service(service, port)?;
        let name = backend_name(protocol, service, port);

        let backend = BackendRecord {
            name: name.clone(),
            mode: protocol,
            balance: Some(Balance {
                algorithm: "roundrobin".to_string(),
            }),
        };
        let created = self
            .api
            .create(tx.scope(
                ApiRequest::post(format!("{CONFIGURATION}/backends")).json(encode(&backend)?),
            ))
            .await?;
        if created == Created::AlreadyExists {
            tracing::debug!(backend = %name, "Backend already exists");
        }

        let template = ServerTemplateRecord {
            prefix: service.to_string(),
            num_or_range: replicas.max(1).to_string(),
            fqdn: service.to_string(),
            port: Some(port),
            check: Some("disabled".to_string()),
            init_addr: Some(self.backend.init_addr.clone()),
            resolvers: Some(self.backend.resolver.clone()),
        };
        let created = self
            .api
            .create(tx.scope(
                ApiRequest::post(format!("{CONFIGURATION}/server_templates"))
                    .query("backend", &name)
                    .json(encode(&template)?),
            ))
            .await?;
        if created == Created::AlreadyExists {
            tracing::debug!(backend = %name, "Server template already exists");
            self.update_backend_replicas(tx, protocol, service, port, replicas)
                .await?;
        }

        tracing::info!(backend = %name, replicas = replicas.max(1), "Added backend");
        Ok(())
    }

    pub async fn is_backend_exist(
        &self,
        tx: &Transaction,
        protocol: Mode,
        service: &str,
        port: u16,
    ) -> ManagerResult<bool> {
        let name = backend_name(protocol, service, port);
        let backend: Option<BackendRecord> = self
            .api
            .fetch(tx.scope(ApiRequest::get(format!("{CONFIGURATION}/backends/{name}"))))
            .await?;
        Ok(backend.is_some())
    }

    /// Delete by name; an absent backend counts as deleted
    pub async fn delete_backend(
        &self,
        tx: &Transaction,
        protocol: Mode,
        service: &str,
        port: u16,
    ) -> ManagerResult<()> {
        let name = backend_name(protocol, service, port);
        match self
            .api
            .remove(tx.scope(ApiRequest::delete(format!("{CONFIGURATION}/backends/{name}"))))
            .await?
        {
            Removed::Removed => tracing::info!(backend = %name, "Deleted backend"),
            Removed::NotFound => tracing::debug!(backend = %name, "Backend already absent"),
        }
        Ok(())
    }

    /// Move a pool from `current` to `desired`.
    ///
    /// Identity changes (protocol, service, port) recreate the pool; a pure replica
    /// change patches the server-template in place.
    pub async fn update_backend(
        &self,
        tx: &Transaction,
        current: &BackendSpec,
        desired: &BackendSpec,
    ) -> ManagerResult<()> {
        if current.same_identity(desired) {
            if current.replicas != desired.replicas {
                self.update_backend_replicas(
                    tx,
                    desired.protocol,
                    &desired.service,
                    desired.port,
                    desired.replicas,
                )
                .await?;
            }
            return Ok(());
        }

        self.delete_backend(tx, current.protocol, &current.service, current.port)
            .await?;
        self.add_backend(
            tx,
            desired.protocol,
            &desired.service,
            desired.port,
            desired.replicas,
        )
        .await
    }

    async fn server_template(
        &self,
        tx: &Transaction,
        backend: &str,
        service: &str,
    ) -> ManagerResult<Option<ServerTemplateRecord>> {
        self.api
            .fetch(tx.scope(
                ApiRequest::get(format!("{CONFIGURATION}/server_templates/{service}"))
                    .query("backend", backend),
            ))
            .await
    }

    /// Replica slots of the pool's server-template, `None` when the pool is absent
    pub async fn get_replica_count(
        &self,
        tx: &Transaction,
        protocol: Mode,
        service: &str,
        port: u16,
    ) -> ManagerResult<Option<u32>> {
        let name = backend_name(protocol, service, port);
        let path = format!("{CONFIGURATION}/server_templates/{service}");
        match self.server_template(tx, &name, service).await? {
            Some(template) => template.replica_count().map(Some).ok_or_else(|| {
                ManagerError::malformed(
                    &path,
                    format!("unparsable num_or_range '{}'", template.num_or_range),
                )
            }),
            None => Ok(None),
        }
    }

    /// Patch the server-template's replica range in place
    pub async fn update_backend_replicas(
        &self,
        tx: &Transaction,
        protocol: Mode,
        service: &str,
        port: u16,
        replicas: u32,
    ) -> ManagerResult<()> {
        let name = backend_name(protocol, service, port);
        let Some(mut template) = self.server_template(tx, &name, service).await? else {
            return Err(ManagerError::InvalidArgument(format!(
                "backend {name} has no server template for {service}"
            )));
        };

        let replicas = replicas.max(1);
        if template.replica_count() == Some(replicas) {
            tracing::debug!(backend = %name, replicas, "Replica count unchanged");
            return Ok(());
        }
        template.num_or_range = replicas.to_string();
        self.api
            .apply(tx.scope(
                ApiRequest::put(format!("{CONFIGURATION}/server_templates/{service}"))
                    .query("backend", &name)
                    .json(encode(&template)?),
            ))
            .await?;

        tracing::info!(backend = %name, replicas, "Scaled backend");
        Ok(())
    }
}
