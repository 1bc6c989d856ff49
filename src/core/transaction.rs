use std::fmt;

use http::StatusCode;

use crate::{
    core::{
        api::{CONFIGURATION, DataplaneApi, TRANSACTIONS},
        error::{ManagerError, ManagerResult},
        manager::HaproxyManager,
        records::{TransactionRecord, Versioned},
    },
    ports::dataplane::ApiRequest,
};

/// An open Dataplane transaction: edits staged against `base_version` until commit.
///
/// Never share one transaction between concurrent writers; independent passes use
/// independent transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: String,
    base_version: i64,
}

impl Transaction {
    pub fn new(id: impl Into<String>, base_version: i64) -> Self {
        Self {
            id: id.into(),
            base_version,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_version(&self) -> i64 {
        self.base_version
    }

    /// Attach `transaction_id` to a configuration call
    pub(crate) fn scope(&self, req: ApiRequest) -> ApiRequest {
        req.query("transaction_id", &self.id)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.base_version)
    }
}

impl HaproxyManager {
    /// Current configuration version of the running proxy
    pub async fn configuration_version(&self) -> ManagerResult<i64> {
        self.api
            .read::<i64>(ApiRequest::get(format!("{CONFIGURATION}/version")))
            .await
    }

    /// Full rendered configuration text of the running proxy
    pub async fn raw_configuration(&self) -> ManagerResult<String> {
        let envelope: Versioned<String> = self
            .api
            .read(ApiRequest::get(format!("{CONFIGURATION}/raw")))
            .await?;
        Ok(envelope.data)
    }

    /// Read the current version and open a transaction scoped to it
    pub async fn new_transaction(&self) -> ManagerResult<Transaction> {
        let version = self.configuration_version().await?;
        let record: TransactionRecord = self
            .api
            .read(ApiRequest::post(TRANSACTIONS).query("version", version))
            .await?;

        tracing::debug!(
            transaction_id = %record.id,
            version = record.version,
            "Opened Dataplane transaction"
        );
        Ok(Transaction::new(record.id, record.version))
    }

    /// Commit with a forced reload.
    ///
    /// On failure the staged edits stay uncommitted and expire on the proxy side.
    pub async fn commit(&self, tx: &Transaction) -> ManagerResult<()> {
        let req = ApiRequest::put(format!("{TRANSACTIONS}/{}", tx.id()))
            .query("force_reload", "true");
        let resp = self.api.send(req.clone()).await?;

        match resp.status {
            status if status.is_success() => {
                tracing::info!(transaction = %tx, "Committed Dataplane transaction");
                Ok(())
            }
            StatusCode::CONFLICT | StatusCode::NOT_ACCEPTABLE => {
                tracing::warn!(transaction = %tx, "Transaction rejected as out of sequence");
                Err(ManagerError::VersionConflict {
                    transaction_id: tx.id().to_string(),
                    message: resp.message(),
                })
            }
            _ => Err(DataplaneApi::unexpected(&req, &resp)),
        }
    }
}
