use crate::{
    core::{
        api::{CONFIGURATION, Removed},
        error::{ManagerError, ManagerResult},
        manager::HaproxyManager,
        records::{HttpRequestRule, HttpRequestRuleRecord, encode},
        transaction::Transaction,
    },
    ports::dataplane::ApiRequest,
};

const HTTP_REQUEST_RULES: &str = "/services/haproxy/configuration/http_request_rules";

fn frontend_scope(req: ApiRequest, frontend: &str) -> ApiRequest {
    req.query("parent_type", "frontend")
        .query("parent_name", frontend)
}

impl HaproxyManager {
    /// All http-request rules of a frontend, decoded into their typed form
    pub async fn http_request_rules(
        &self,
        tx: &Transaction,
        frontend: &str,
    ) -> ManagerResult<Vec<HttpRequestRule>> {
        let records: Vec<HttpRequestRuleRecord> = self
            .api
            .list(tx.scope(frontend_scope(
                ApiRequest::get(format!("{CONFIGURATION}/http_request_rules")),
                frontend,
            )))
            .await?;
        records
            .into_iter()
            .map(|record| {
                HttpRequestRule::try_from(record)
                    .map_err(|reason| ManagerError::malformed(HTTP_REQUEST_RULES, reason))
            })
            .collect()
    }

    /// Index of the first rule satisfying `predicate`
    pub(crate) async fn find_http_request_rule(
        &self,
        tx: &Transaction,
        frontend: &str,
        predicate: impl Fn(&HttpRequestRule) -> bool,
    ) -> ManagerResult<Option<i64>> {
        let rules = self.http_request_rules(tx, frontend).await?;
        Ok(rules.iter().find(|rule| predicate(rule)).map(|rule| rule.index))
    }

    pub(crate) async fn add_http_request_rule(
        &self,
        tx: &Transaction,
        frontend: &str,
        rule: HttpRequestRule,
    ) -> ManagerResult<()> {
        let record = rule.into_record();
        self.api
            .apply(tx.scope(frontend_scope(
                ApiRequest::post(format!("{CONFIGURATION}/http_request_rules")),
                frontend,
            )
            .json(encode(&record)?)))
            .await
    }

    /// Delete by a freshly resolved index; a vanished rule is success
    pub(crate) async fn delete_http_request_rule(
        &self,
        tx: &Transaction,
        frontend: &str,
        index: i64,
    ) -> ManagerResult<Removed> {
        self.api
            .remove(tx.scope(frontend_scope(
                ApiRequest::delete(format!("{CONFIGURATION}/http_request_rules/{index}")),
                frontend,
            )))
            .await
    }
}
