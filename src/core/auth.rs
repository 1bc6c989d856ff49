use crate::{
    core::{
        api::{CONFIGURATION, Created, Removed},
        error::{ManagerError, ManagerResult},
        manager::HaproxyManager,
        naming::{Mode, basic_auth_condition, listener_name, validate_domain},
        records::{HttpRequestAction, HttpRequestRule, UserListRecord, UserRecord, encode},
        transaction::Transaction,
    },
    ports::dataplane::ApiRequest,
    utils::password::hash_password,
};

fn is_basic_auth(rule: &HttpRequestRule, condition: &str) -> bool {
    matches!(rule.action, HttpRequestAction::Auth { .. }) && rule.condition_is(condition)
}

impl HaproxyManager {
    pub async fn is_user_list_exist(&self, tx: &Transaction, userlist: &str) -> ManagerResult<bool> {
        let record: Option<UserListRecord> = self
            .api
            .fetch(tx.scope(ApiRequest::get(format!("{CONFIGURATION}/userlists/{userlist}"))))
            .await?;
        Ok(record.is_some())
    }

    pub async fn add_user_list(&self, tx: &Transaction, userlist: &str) -> ManagerResult<()> {
        if self.is_user_list_exist(tx, userlist).await? {
            return Ok(());
        }
        let record = UserListRecord {
            name: userlist.to_string(),
        };
        if self
            .api
            .create(tx.scope(
                ApiRequest::post(format!("{CONFIGURATION}/userlists")).json(encode(&record)?),
            ))
            .await?
            == Created::Created
        {
            tracing::info!(userlist, "Added user list");
        }
        Ok(())
    }

    pub async fn delete_user_list(&self, tx: &Transaction, userlist: &str) -> ManagerResult<()> {
        if self
            .api
            .remove(tx.scope(ApiRequest::delete(format!(
                "{CONFIGURATION}/userlists/{userlist}"
            ))))
            .await?
            == Removed::Removed
        {
            tracing::info!(userlist, "Deleted user list");
        }
        Ok(())
    }

    pub async fn is_user_exist(
        &self,
        tx: &Transaction,
        userlist: &str,
        username: &str,
    ) -> ManagerResult<bool> {
        let record: Option<UserRecord> = self
            .api
            .fetch(tx.scope(
                ApiRequest::get(format!("{CONFIGURATION}/users/{username}"))
                    .query("userlist", userlist),
            ))
            .await?;
        Ok(record.is_some())
    }

    fn hashed_user(username: &str, password: &str) -> ManagerResult<UserRecord> {
        let hashed = hash_password(password).map_err(|e| ManagerError::Hashing(e.to_string()))?;
        Ok(UserRecord {
            username: username.to_string(),
            password: Some(hashed),
            secure_password: true,
        })
    }

    /// Add a user; fails when the user is already present, so callers check first.
    pub async fn add_user_in_user_list(
        &self,
        tx: &Transaction,
        userlist: &str,
        username: &str,
        password: &str,
    ) -> ManagerResult<()> {
        if !self.is_user_list_exist(tx, userlist).await? {
            return Err(ManagerError::UserListNotFound(userlist.to_string()));
        }
        if self.is_user_exist(tx, userlist, username).await? {
            return Err(ManagerError::UserAlreadyExists {
                username: username.to_string(),
                userlist: userlist.to_string(),
            });
        }

        let user = Self::hashed_user(username, password)?;
        match self
            .api
            .create(tx.scope(
                ApiRequest::post(format!("{CONFIGURATION}/users"))
                    .query("userlist", userlist)
                    .json(encode(&user)?),
            ))
            .await?
        {
            Created::Created => {
                tracing::info!(userlist, username, "Added user");
                Ok(())
            }
            Created::AlreadyExists => Err(ManagerError::UserAlreadyExists {
                username: username.to_string(),
                userlist: userlist.to_string(),
            }),
        }
    }

    pub async fn change_user_password_in_user_list(
        &self,
        tx: &Transaction,
        userlist: &str,
        username: &str,
        password: &str,
    ) -> ManagerResult<()> {
        if !self.is_user_exist(tx, userlist, username).await? {
            return Err(ManagerError::UserNotFound {
                username: username.to_string(),
                userlist: userlist.to_string(),
            });
        }

        let user = Self::hashed_user(username, password)?;
        self.api
            .apply(tx.scope(
                ApiRequest::put(format!("{CONFIGURATION}/users/{username}"))
                    .query("userlist", userlist)
                    .json(encode(&user)?),
            ))
            .await?;
        tracing::info!(userlist, username, "Changed user password");
        Ok(())
    }

    pub async fn delete_user_from_user_list(
        &self,
        tx: &Transaction,
        userlist: &str,
        username: &str,
    ) -> ManagerResult<()> {
        if self
            .api
            .remove(tx.scope(
                ApiRequest::delete(format!("{CONFIGURATION}/users/{username}"))
                    .query("userlist", userlist),
            ))
            .await?
            == Removed::Removed
        {
            tracing::info!(userlist, username, "Deleted user");
        }
        Ok(())
    }

    /// Challenge requests for `domain` with Basic-Auth against `userlist`.
    pub async fn setup_basic_authentication(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
        domain: &str,
        userlist: &str,
    ) -> ManagerResult<()> {
        if mode == Mode::Tcp {
            return Err(ManagerError::Restricted(
                "basic authentication requires an HTTP frontend".to_string(),
            ));
        }
        validate_domain(domain)?;
        if !self.is_user_list_exist(tx, userlist).await? {
            return Err(ManagerError::UserListNotFound(userlist.to_string()));
        }

        let frontend = listener_name(mode, port);
        let condition = basic_auth_condition(userlist, domain, port);
        if self
            .find_http_request_rule(tx, &frontend, |rule| is_basic_auth(rule, &condition))
            .await?
            .is_some()
        {
            tracing::debug!(%frontend, domain, "Basic authentication already enabled");
            return Ok(());
        }

        let rule = HttpRequestRule::new(
            HttpRequestAction::Auth {
                realm: userlist.to_string(),
            },
            condition,
        );
        self.add_http_request_rule(tx, &frontend, rule).await?;
        tracing::info!(%frontend, domain, userlist, "Enabled basic authentication");
        Ok(())
    }

    /// Drop the Basic-Auth challenge for `domain`; absent rules are success.
    pub async fn remove_basic_authentication(
        &self,
        tx: &Transaction,
        mode: Mode,
        port: u16,
        domain: &str,
        userlist: &str,
    ) -> ManagerResult<()> {
        if mode == Mode::Tcp {
            return Ok(());
        }

        let frontend = listener_name(mode, port);
        let condition = basic_auth_condition(userlist, domain, port);
        let Some(index) = self
            .find_http_request_rule(tx, &frontend, |rule| is_basic_auth(rule, &condition))
            .await?
        else {
            tracing::debug!(%frontend, domain, "Basic authentication already absent");
            return Ok(());
        };

        if self.delete_http_request_rule(tx, &frontend, index).await? == Removed::Removed {
            tracing::info!(%frontend, domain, userlist, "Disabled basic authentication");
        }
        Ok(())
    }
}
