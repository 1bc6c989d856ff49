use crate::core::{
    api::Removed,
    error::{ManagerError, ManagerResult},
    manager::HaproxyManager,
    naming::{
        HTTP_FRONTEND, HTTP_PORT, HTTPS_FRONTEND, host_condition, redirect_condition,
        validate_domain,
    },
    records::{HttpRequestAction, HttpRequestRule},
    transaction::Transaction,
};

const HTTPS_REDIRECT_CODE: u16 = 301;
const LOCATION_REDIRECT_CODE: u16 = 302;

fn is_https_redirect(rule: &HttpRequestRule, condition: &str) -> bool {
    matches!(&rule.action, HttpRequestAction::RedirectScheme { scheme, .. } if scheme == "https")
        && rule.condition_is(condition)
}

fn is_location_redirect(rule: &HttpRequestRule, condition: &str) -> bool {
    matches!(rule.action, HttpRequestAction::RedirectLocation { .. }) && rule.condition_is(condition)
}

fn is_location_redirect_to(rule: &HttpRequestRule, condition: &str, target: &str) -> bool {
    matches!(&rule.action, HttpRequestAction::RedirectLocation { url, .. } if url == target)
        && rule.condition_is(condition)
}

impl HaproxyManager {
    /// Whether plain-HTTP requests for `domain` are upgraded to HTTPS
    pub async fn is_https_redirection_enabled(
        &self,
        tx: &Transaction,
        domain: &str,
    ) -> ManagerResult<bool> {
        let condition = host_condition(domain, HTTP_PORT);
        Ok(self
            .find_http_request_rule(tx, HTTP_FRONTEND, |rule| is_https_redirect(rule, &condition))
            .await?
            .is_some())
    }

    /// Force HTTPS for `domain` on the port-80 frontend.
    pub async fn enable_https_redirection(
        &self,
        tx: &Transaction,
        domain: &str,
    ) -> ManagerResult<()> {
        // No `!letsencrypt-acl` exclusion here, unlike location redirects.
        validate_domain(domain)?;
        if self.is_https_redirection_enabled(tx, domain).await? {
            tracing::debug!(domain, "HTTPS redirection already enabled");
            return Ok(());
        }
        let rule = HttpRequestRule::new(
            HttpRequestAction::RedirectScheme {
                scheme: "https".to_string(),
                code: HTTPS_REDIRECT_CODE,
            },
            host_condition(domain, HTTP_PORT),
        );
        self.add_http_request_rule(tx, HTTP_FRONTEND, rule).await?;
        tracing::info!(domain, "Enabled HTTPS redirection");
        Ok(())
    }

    pub async fn disable_https_redirection(
        &self,
        tx: &Transaction,
        domain: &str,
    ) -> ManagerResult<()> {
        let condition = host_condition(domain, HTTP_PORT);
        self.delete_matching_rules(tx, HTTP_FRONTEND, |rule| is_https_redirect(rule, &condition))
            .await?;
        tracing::info!(domain, "Disabled HTTPS redirection");
        Ok(())
    }

    /// 302-redirect every request for `match_domain` to `redirect_url`
    /// on both standard frontends.
    pub async fn add_redirect_rule(
        &self,
        tx: &Transaction,
        match_domain: &str,
        redirect_url: &str,
    ) -> ManagerResult<()> {
        validate_domain(match_domain)?;
        if redirect_url.trim().is_empty() {
            return Err(ManagerError::InvalidArgument(
                "redirect target url is empty".to_string(),
            ));
        }

        let condition = redirect_condition(match_domain);
        for frontend in [HTTP_FRONTEND, HTTPS_FRONTEND] {
            let existing = self
                .find_http_request_rule(tx, frontend, |rule| {
                    is_location_redirect_to(rule, &condition, redirect_url)
                })
                .await?;
            if existing.is_some() {
                tracing::debug!(frontend, match_domain, "Redirect already present");
                continue;
            }
            // A stale target for the same domain would be evaluated first
            self.delete_matching_rules(tx, frontend, |rule| {
                is_location_redirect(rule, &condition)
            })
            .await?;
            let rule = HttpRequestRule::new(
                HttpRequestAction::RedirectLocation {
                    url: redirect_url.to_string(),
                    code: LOCATION_REDIRECT_CODE,
                },
                condition.clone(),
            );
            self.add_http_request_rule(tx, frontend, rule).await?;
        }

        tracing::info!(match_domain, redirect_url, "Added redirect rule");
        Ok(())
    }

    /// Remove every location redirect for `match_domain`; absent rules are success
    pub async fn delete_redirect_rule(
        &self,
        tx: &Transaction,
        match_domain: &str,
    ) -> ManagerResult<()> {
        if match_domain.trim().is_empty() {
            return Err(ManagerError::InvalidArgument(
                "redirect match domain is empty".to_string(),
            ));
        }
        let condition = redirect_condition(match_domain);
        for frontend in [HTTP_FRONTEND, HTTPS_FRONTEND] {
            self.delete_matching_rules(tx, frontend, |rule| is_location_redirect(rule, &condition))
                .await?;
        }
        tracing::info!(match_domain, "Deleted redirect rule");
        Ok(())
    }

    /// Delete rules one at a time, re-resolving the index after each delete
    async fn delete_matching_rules(
        &self,
        tx: &Transaction,
        frontend: &str,
        predicate: impl Fn(&HttpRequestRule) -> bool,
    ) -> ManagerResult<()> {
        while let Some(index) = self.find_http_request_rule(tx, frontend, &predicate).await? {
            if self.delete_http_request_rule(tx, frontend, index).await? == Removed::NotFound {
                break;
            }
        }
        Ok(())
    }
}
