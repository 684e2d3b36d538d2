//! Token storage use case.
//!
//! Each token kind gets the same lifecycle surface: create (which also
//! upserts the owning session), get (reconstructing the full request),
//! delete, and revoke. Split across one file per token kind plus client
//! handling.

mod access_token;
mod authorization_code;
mod client;
mod refresh_token;

use crate::oauth::error::OauthStorageError;
use crate::oauth::models::{OauthClient, Session};
use crate::store::OauthStore;
use std::sync::Arc;

/// Storage facade the OAuth framework is wired against.
#[derive(Clone)]
pub struct OauthStorage {
    store: Arc<dyn OauthStore>,
    /// How long a rotated refresh token stays usable. Zero disables the
    /// grace window and revokes immediately.
    refresh_grace_period_secs: u64,
}

impl OauthStorage {
    pub fn new(store: Arc<dyn OauthStore>, refresh_grace_period_secs: u64) -> Self {
        Self {
            store,
            refresh_grace_period_secs,
        }
    }

    /// Loads the session and client a stored token points at.
    async fn resolve(
        &self,
        client_id: &str,
        session_id: &str,
    ) -> Result<(OauthClient, Session), OauthStorageError> {
        let session = self
            .store
            .get_session(session_id)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to load token session", e))?;
        let client = self
            .store
            .get_oauth_client(client_id)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to load token client", e))?;
        Ok((client, session))
    }
}
