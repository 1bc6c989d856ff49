use crate::{
    core::{
        api::{Created, Removed, SSL_STORAGE},
        error::{ManagerError, ManagerResult},
        manager::HaproxyManager,
        naming::{ssl_file_name, validate_domain},
    },
    ports::dataplane::ApiRequest,
};

/// Multipart field name expected by the certificate storage endpoint
const UPLOAD_FIELD: &str = "file_upload";

/// Certificate object contents: full chain, newline, private key
pub fn certificate_blob(full_chain: &str, private_key: &str) -> String {
    format!("{full_chain}\n{private_key}")
}

impl HaproxyManager {
    /// Upload or replace the certificate bundle for `domain`.
    ///
    /// Certificate storage is not transactional; the upload triggers its own reload.
    pub async fn update_ssl(
        &self,
        domain: &str,
        private_key: &str,
        full_chain: &str,
    ) -> ManagerResult<()> {
        validate_domain(domain)?;
        if private_key.trim().is_empty() || full_chain.trim().is_empty() {
            return Err(ManagerError::InvalidArgument(format!(
                "certificate material for {domain} is incomplete"
            )));
        }

        let file_name = ssl_file_name(domain);
        let blob = certificate_blob(full_chain, private_key);

        let created = self
            .api
            .create(
                ApiRequest::post(SSL_STORAGE)
                    .query("force_reload", "true")
                    .multipart(UPLOAD_FIELD, &file_name, blob.clone()),
            )
            .await?;
        match created {
            Created::Created => tracing::info!(domain, file = %file_name, "Uploaded certificate"),
            Created::AlreadyExists => {
                self.api
                    .apply(
                        ApiRequest::put(format!("{SSL_STORAGE}/{file_name}"))
                            .query("force_reload", "true")
                            .text(blob),
                    )
                    .await?;
                tracing::info!(domain, file = %file_name, "Replaced certificate");
            }
        }
        Ok(())
    }

    /// Remove the certificate bundle for `domain`; an absent file is success
    pub async fn delete_ssl(&self, domain: &str) -> ManagerResult<()> {
        let file_name = ssl_file_name(domain);
        let removed = self
            .api
            .remove(
                ApiRequest::delete(format!("{SSL_STORAGE}/{file_name}"))
                    .query("force_reload", "true"),
            )
            .await?;
        if removed == Removed::Removed {
            tracing::info!(domain, file = %file_name, "Deleted certificate");
        }
        Ok(())
    }
}
