//! Storage traits and backends for OAuth token records.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PostgresPolicyAdapter, PostgresStore};

use crate::oauth::models::{
    AccessToken, AuthorizationCode, ClientJwt, OauthClient, RefreshToken, Session,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage-layer failures, independent of any OAuth semantics.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            other => StorageError::Database(other.to_string()),
        }
    }
}

/// Identifies a token row either by its primary id or by the token
/// signature presented on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenFilter {
    Id(String),
    Signature(String),
}

/// A targeted partial update to a token row. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUpdate {
    pub active: Option<bool>,
    pub graceful_expires_at: Option<DateTime<Utc>>,
}

impl TokenUpdate {
    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            ..Self::default()
        }
    }

    pub fn grace_until(instant: DateTime<Utc>) -> Self {
        Self {
            graceful_expires_at: Some(instant),
            ..Self::default()
        }
    }
}

/// Persistence contract for OAuth sessions, tokens, clients and JWT
/// replay records. Implemented by [`PostgresStore`] in production and
/// [`MemoryStore`] in tests.
#[async_trait]
pub trait OauthStore: Send + Sync {
    // Create operations. Sessions upsert by id; everything else inserts.
    async fn create_or_update_session(&self, session: &Session) -> Result<(), StorageError>;
    async fn create_access_token(&self, token: &AccessToken) -> Result<(), StorageError>;
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError>;
    async fn create_authorization_code(&self, code: &AuthorizationCode)
        -> Result<(), StorageError>;
    async fn create_client_jwt(&self, jwt: &ClientJwt) -> Result<(), StorageError>;
    async fn create_oauth_client(&self, client: &OauthClient) -> Result<(), StorageError>;

    // Query operations.
    async fn get_access_token(&self, filter: &TokenFilter) -> Result<AccessToken, StorageError>;
    async fn get_refresh_token(&self, filter: &TokenFilter) -> Result<RefreshToken, StorageError>;
    async fn get_authorization_code(&self, code: &str) -> Result<AuthorizationCode, StorageError>;
    async fn get_session(&self, id: &str) -> Result<Session, StorageError>;
    async fn get_oauth_client(&self, id: &str) -> Result<OauthClient, StorageError>;
    async fn get_client_jwt(&self, jti: &str) -> Result<ClientJwt, StorageError>;
    /// Like [`OauthStore::get_client_jwt`] but only matches rows that are
    /// active and not yet expired.
    async fn get_valid_client_jwt(&self, jti: &str) -> Result<ClientJwt, StorageError>;

    // Update operations, all partial.
    async fn update_access_token(&self, id: &str, update: &TokenUpdate)
        -> Result<(), StorageError>;
    async fn update_refresh_token(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError>;
    async fn update_authorization_code(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError>;

    // Delete operations.
    async fn delete_access_token(&self, signature: &str) -> Result<(), StorageError>;
    async fn delete_refresh_token(&self, signature: &str) -> Result<(), StorageError>;
    async fn delete_expired_client_jwts(&self, now: DateTime<Utc>) -> Result<(), StorageError>;

    /// Cheap liveness probe against the backing store.
    async fn health_check(&self) -> Result<(), String>;
}
