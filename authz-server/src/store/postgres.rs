//! PostgreSQL store backend.
//!
//! Implements both the OAuth token store and the policy adapter on a
//! shared connection pool. Queries are written by hand against the
//! schema in `migrations/`.

use crate::authz::{UserLookup, UserProfile};
use crate::oauth::models::{
    AccessToken, AuthorizationCode, ClientJwt, OauthClient, RefreshToken, RequestForm, Session,
};
use crate::store::{OauthStore, StorageError, TokenFilter, TokenUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use policy_engine::{EngineError, GroupingRule, PolicyAdapter, PolicyRule, PolicySet, Rule};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// PostgreSQL implementation of [`OauthStore`] and [`UserLookup`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn form_to_json(form: &RequestForm) -> Result<serde_json::Value, StorageError> {
    serde_json::to_value(form).map_err(|e| StorageError::Database(e.to_string()))
}

fn form_from_json(value: serde_json::Value) -> Result<RequestForm, StorageError> {
    serde_json::from_value(value).map_err(|e| StorageError::Database(e.to_string()))
}

fn row_to_access_token(row: PgRow) -> Result<AccessToken, StorageError> {
    Ok(AccessToken {
        id: row.try_get("id")?,
        active: row.try_get("active")?,
        signature: row.try_get("signature")?,
        requested_at: row.try_get("requested_at")?,
        client_id: row.try_get("client_id")?,
        requested_scopes: row.try_get("requested_scopes")?,
        granted_scopes: row.try_get("granted_scopes")?,
        form: form_from_json(row.try_get("form")?)?,
        session_id: row.try_get("session_id")?,
        requested_audience: row.try_get("requested_audience")?,
        granted_audience: row.try_get("granted_audience")?,
    })
}

fn row_to_refresh_token(row: PgRow) -> Result<RefreshToken, StorageError> {
    Ok(RefreshToken {
        id: row.try_get("id")?,
        active: row.try_get("active")?,
        signature: row.try_get("signature")?,
        requested_at: row.try_get("requested_at")?,
        client_id: row.try_get("client_id")?,
        requested_scopes: row.try_get("requested_scopes")?,
        granted_scopes: row.try_get("granted_scopes")?,
        form: form_from_json(row.try_get("form")?)?,
        session_id: row.try_get("session_id")?,
        requested_audience: row.try_get("requested_audience")?,
        granted_audience: row.try_get("granted_audience")?,
        graceful_expires_at: row.try_get("graceful_expires_at")?,
    })
}

fn row_to_authorization_code(row: PgRow) -> Result<AuthorizationCode, StorageError> {
    Ok(AuthorizationCode {
        id: row.try_get("id")?,
        active: row.try_get("active")?,
        code: row.try_get("code")?,
        requested_at: row.try_get("requested_at")?,
        client_id: row.try_get("client_id")?,
        requested_scopes: row.try_get("requested_scopes")?,
        granted_scopes: row.try_get("granted_scopes")?,
        form: form_from_json(row.try_get("form")?)?,
        session_id: row.try_get("session_id")?,
        requested_audience: row.try_get("requested_audience")?,
        granted_audience: row.try_get("granted_audience")?,
    })
}

fn row_to_client(row: PgRow) -> Result<OauthClient, StorageError> {
    Ok(OauthClient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        active: row.try_get("active")?,
        secret: row.try_get("secret")?,
        rotated_secrets: row.try_get("rotated_secrets")?,
        public: row.try_get("public")?,
        redirect_uris: row.try_get("redirect_uris")?,
        scopes: row.try_get("scopes")?,
        audience: row.try_get("audience")?,
        grants: row.try_get("grants")?,
        response_types: row.try_get("response_types")?,
        token_endpoint_auth_method: row.try_get("token_endpoint_auth_method")?,
    })
}

fn row_to_client_jwt(row: PgRow) -> Result<ClientJwt, StorageError> {
    Ok(ClientJwt {
        jti: row.try_get("jti")?,
        active: row.try_get("active")?,
        expires_at: row.try_get("expires_at")?,
    })
}

const ACCESS_TOKEN_COLUMNS: &str = "id, active, signature, requested_at, client_id, \
     requested_scopes, granted_scopes, form, session_id, requested_audience, granted_audience";

const REFRESH_TOKEN_COLUMNS: &str = "id, active, signature, requested_at, client_id, \
     requested_scopes, granted_scopes, form, session_id, requested_audience, granted_audience, \
     graceful_expires_at";

#[async_trait]
impl OauthStore for PostgresStore {
    async fn create_or_update_session(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_sessions (id, client_id, user_id, username, subject, extra)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                user_id = EXCLUDED.user_id,
                username = EXCLUDED.username,
                subject = EXCLUDED.subject,
                extra = EXCLUDED.extra
            "#,
        )
        .bind(&session.id)
        .bind(&session.client_id)
        .bind(&session.user_id)
        .bind(&session.username)
        .bind(&session.subject)
        .bind(&session.extra)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_access_token(&self, token: &AccessToken) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_access_tokens (
                id, active, signature, requested_at, client_id, requested_scopes,
                granted_scopes, form, session_id, requested_audience, granted_audience
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&token.id)
        .bind(token.active)
        .bind(&token.signature)
        .bind(token.requested_at)
        .bind(&token.client_id)
        .bind(&token.requested_scopes)
        .bind(&token.granted_scopes)
        .bind(form_to_json(&token.form)?)
        .bind(&token.session_id)
        .bind(&token.requested_audience)
        .bind(&token.granted_audience)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_refresh_tokens (
                id, active, signature, requested_at, client_id, requested_scopes,
                granted_scopes, form, session_id, requested_audience, granted_audience,
                graceful_expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&token.id)
        .bind(token.active)
        .bind(&token.signature)
        .bind(token.requested_at)
        .bind(&token.client_id)
        .bind(&token.requested_scopes)
        .bind(&token.granted_scopes)
        .bind(form_to_json(&token.form)?)
        .bind(&token.session_id)
        .bind(&token.requested_audience)
        .bind(&token.granted_audience)
        .bind(token.graceful_expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_authorization_code(
        &self,
        code: &AuthorizationCode,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_authorization_codes (
                id, active, code, requested_at, client_id, requested_scopes,
                granted_scopes, form, session_id, requested_audience, granted_audience
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&code.id)
        .bind(code.active)
        .bind(&code.code)
        .bind(code.requested_at)
        .bind(&code.client_id)
        .bind(&code.requested_scopes)
        .bind(&code.granted_scopes)
        .bind(form_to_json(&code.form)?)
        .bind(&code.session_id)
        .bind(&code.requested_audience)
        .bind(&code.granted_audience)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_client_jwt(&self, jwt: &ClientJwt) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO oauth_client_jwts (jti, active, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&jwt.jti)
        .bind(jwt.active)
        .bind(jwt.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_oauth_client(&self, client: &OauthClient) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_clients (
                id, name, active, secret, rotated_secrets, "public", redirect_uris,
                scopes, audience, grants, response_types, token_endpoint_auth_method
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(client.active)
        .bind(&client.secret)
        .bind(&client.rotated_secrets)
        .bind(client.public)
        .bind(&client.redirect_uris)
        .bind(&client.scopes)
        .bind(&client.audience)
        .bind(&client.grants)
        .bind(&client.response_types)
        .bind(&client.token_endpoint_auth_method)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_access_token(&self, filter: &TokenFilter) -> Result<AccessToken, StorageError> {
        let (clause, value) = match filter {
            TokenFilter::Id(id) => ("id", id),
            TokenFilter::Signature(signature) => ("signature", signature),
        };
        let row = sqlx::query(&format!(
            "SELECT {ACCESS_TOKEN_COLUMNS} FROM oauth_access_tokens WHERE {clause} = $1"
        ))
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        row_to_access_token(row)
    }

    async fn get_refresh_token(&self, filter: &TokenFilter) -> Result<RefreshToken, StorageError> {
        let (clause, value) = match filter {
            TokenFilter::Id(id) => ("id", id),
            TokenFilter::Signature(signature) => ("signature", signature),
        };
        let row = sqlx::query(&format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM oauth_refresh_tokens WHERE {clause} = $1"
        ))
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        row_to_refresh_token(row)
    }

    async fn get_authorization_code(
        &self,
        code: &str,
    ) -> Result<AuthorizationCode, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, active, code, requested_at, client_id, requested_scopes,
                   granted_scopes, form, session_id, requested_audience, granted_audience
            FROM oauth_authorization_codes WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        row_to_authorization_code(row)
    }

    async fn get_session(&self, id: &str) -> Result<Session, StorageError> {
        let row = sqlx::query(
            "SELECT id, client_id, user_id, username, subject, extra \
             FROM oauth_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Session {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            subject: row.try_get("subject")?,
            extra: row.try_get("extra")?,
        })
    }

    async fn get_oauth_client(&self, id: &str) -> Result<OauthClient, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, active, secret, rotated_secrets, "public", redirect_uris,
                   scopes, audience, grants, response_types, token_endpoint_auth_method
            FROM oauth_clients WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        row_to_client(row)
    }

    async fn get_client_jwt(&self, jti: &str) -> Result<ClientJwt, StorageError> {
        let row = sqlx::query(
            "SELECT jti, active, expires_at FROM oauth_client_jwts WHERE jti = $1",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;

        row_to_client_jwt(row)
    }

    async fn get_valid_client_jwt(&self, jti: &str) -> Result<ClientJwt, StorageError> {
        let row = sqlx::query(
            "SELECT jti, active, expires_at FROM oauth_client_jwts \
             WHERE jti = $1 AND active AND expires_at > $2",
        )
        .bind(jti)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row_to_client_jwt(row)
    }

    async fn update_access_token(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE oauth_access_tokens SET active = COALESCE($2, active) WHERE id = $1",
        )
        .bind(id)
        .bind(update.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE oauth_refresh_tokens SET \
                 active = COALESCE($2, active), \
                 graceful_expires_at = COALESCE($3, graceful_expires_at) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.active)
        .bind(update.graceful_expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn update_authorization_code(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE oauth_authorization_codes SET active = COALESCE($2, active) WHERE id = $1",
        )
        .bind(id)
        .bind(update.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_access_token(&self, signature: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM oauth_access_tokens WHERE signature = $1")
            .bind(signature)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_refresh_token(&self, signature: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM oauth_refresh_tokens WHERE signature = $1")
            .bind(signature)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_expired_client_jwts(&self, now: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM oauth_client_jwts WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl UserLookup for PostgresStore {
    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, StorageError> {
        let row = sqlx::query(
            "SELECT id, organization_id, active_program_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserProfile {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            active_program_id: row.try_get("active_program_id")?,
        })
    }
}

/// Persists policy and grouping rules to a Postgres table.
///
/// Rows use the casbin-style layout: `ptype` is `'p'` for policies and
/// `'g'` for groupings, and grouping rows carry the role in the `object`
/// column with an empty `action`.
#[derive(Clone)]
pub struct PostgresPolicyAdapter {
    pool: PgPool,
    table: String,
}

impl PostgresPolicyAdapter {
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    fn rule_columns(rule: &Rule) -> (&'static str, [&str; 5]) {
        match rule {
            Rule::Policy(p) => (
                "p",
                [
                    &p.organization_id,
                    &p.program_id,
                    &p.subject,
                    &p.object,
                    &p.action,
                ],
            ),
            Rule::Grouping(g) => (
                "g",
                [&g.organization_id, &g.program_id, &g.subject, &g.role, ""],
            ),
        }
    }
}

fn db_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Adapter(e.to_string())
}

#[async_trait]
impl PolicyAdapter for PostgresPolicyAdapter {
    async fn load_policy(&self) -> Result<PolicySet, EngineError> {
        let rows = sqlx::query(&format!(
            "SELECT ptype, organization_id, program_id, subject, object, action FROM {}",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut set = PolicySet::new();
        for row in rows {
            let ptype: String = row.try_get("ptype").map_err(db_err)?;
            let organization_id: String = row.try_get("organization_id").map_err(db_err)?;
            let program_id: String = row.try_get("program_id").map_err(db_err)?;
            let subject: String = row.try_get("subject").map_err(db_err)?;
            let object: String = row.try_get("object").map_err(db_err)?;

            let rule = match ptype.as_str() {
                "p" => Rule::Policy(PolicyRule {
                    organization_id,
                    program_id,
                    subject,
                    object,
                    action: row.try_get("action").map_err(db_err)?,
                }),
                "g" => Rule::Grouping(GroupingRule {
                    organization_id,
                    program_id,
                    subject,
                    role: object,
                }),
                other => {
                    return Err(EngineError::Adapter(format!(
                        "unknown rule type {other} in {}",
                        self.table
                    )))
                }
            };
            set.insert(rule);
        }

        Ok(set)
    }

    async fn save_policy(&self, set: &PolicySet) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for rule in set.rules() {
            let (ptype, cols) = Self::rule_columns(&rule);
            sqlx::query(&format!(
                "INSERT INTO {} (ptype, organization_id, program_id, subject, object, action) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                self.table
            ))
            .bind(ptype)
            .bind(cols[0])
            .bind(cols[1])
            .bind(cols[2])
            .bind(cols[3])
            .bind(cols[4])
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn add_rule(&self, rule: &Rule) -> Result<(), EngineError> {
        let (ptype, cols) = Self::rule_columns(rule);
        sqlx::query(&format!(
            "INSERT INTO {} (ptype, organization_id, program_id, subject, object, action) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
            self.table
        ))
        .bind(ptype)
        .bind(cols[0])
        .bind(cols[1])
        .bind(cols[2])
        .bind(cols[3])
        .bind(cols[4])
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn remove_rule(&self, rule: &Rule) -> Result<(), EngineError> {
        let (ptype, cols) = Self::rule_columns(rule);
        sqlx::query(&format!(
            "DELETE FROM {} WHERE ptype = $1 AND organization_id = $2 AND program_id = $3 \
             AND subject = $4 AND object = $5 AND action = $6",
            self.table
        ))
        .bind(ptype)
        .bind(cols[0])
        .bind(cols[1])
        .bind(cols[2])
        .bind(cols[3])
        .bind(cols[4])
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
