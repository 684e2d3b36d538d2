//! In-memory store backend.
//!
//! Keeps every record in process-local maps behind an async `RwLock`.
//! Used by the test fixtures and useful for local development without a
//! database.

use crate::authz::{UserLookup, UserProfile};
use crate::oauth::models::{
    AccessToken, AuthorizationCode, ClientJwt, OauthClient, RefreshToken, Session,
};
use crate::store::{OauthStore, StorageError, TokenFilter, TokenUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Records {
    sessions: HashMap<String, Session>,
    clients: HashMap<String, OauthClient>,
    access_tokens: HashMap<String, AccessToken>,
    refresh_tokens: HashMap<String, RefreshToken>,
    authorization_codes: HashMap<String, AuthorizationCode>,
    client_jwts: HashMap<String, ClientJwt>,
    users: HashMap<String, UserProfile>,
}

/// Process-local [`OauthStore`] and [`UserLookup`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user profile so identity lookups can resolve it.
    pub async fn add_user(&self, profile: UserProfile) {
        let mut records = self.records.write().await;
        records.users.insert(profile.id.clone(), profile);
    }
}

fn apply_update(active: &mut bool, grace: Option<&mut Option<DateTime<Utc>>>, update: &TokenUpdate) {
    if let Some(value) = update.active {
        *active = value;
    }
    if let (Some(slot), Some(instant)) = (grace, update.graceful_expires_at) {
        *slot = Some(instant);
    }
}

#[async_trait]
impl OauthStore for MemoryStore {
    async fn create_or_update_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn create_access_token(&self, token: &AccessToken) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records
            .access_tokens
            .insert(token.signature.clone(), token.clone());
        Ok(())
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records
            .refresh_tokens
            .insert(token.signature.clone(), token.clone());
        Ok(())
    }

    async fn create_authorization_code(
        &self,
        code: &AuthorizationCode,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records
            .authorization_codes
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn create_client_jwt(&self, jwt: &ClientJwt) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.client_jwts.insert(jwt.jti.clone(), jwt.clone());
        Ok(())
    }

    async fn create_oauth_client(&self, client: &OauthClient) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn get_access_token(&self, filter: &TokenFilter) -> Result<AccessToken, StorageError> {
        let records = self.records.read().await;
        let token = match filter {
            TokenFilter::Signature(signature) => records.access_tokens.get(signature),
            TokenFilter::Id(id) => records.access_tokens.values().find(|t| &t.id == id),
        };
        token.cloned().ok_or(StorageError::NotFound)
    }

    async fn get_refresh_token(&self, filter: &TokenFilter) -> Result<RefreshToken, StorageError> {
        let records = self.records.read().await;
        let token = match filter {
            TokenFilter::Signature(signature) => records.refresh_tokens.get(signature),
            TokenFilter::Id(id) => records.refresh_tokens.values().find(|t| &t.id == id),
        };
        token.cloned().ok_or(StorageError::NotFound)
    }

    async fn get_authorization_code(
        &self,
        code: &str,
    ) -> Result<AuthorizationCode, StorageError> {
        let records = self.records.read().await;
        records
            .authorization_codes
            .get(code)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_session(&self, id: &str) -> Result<Session, StorageError> {
        let records = self.records.read().await;
        records.sessions.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn get_oauth_client(&self, id: &str) -> Result<OauthClient, StorageError> {
        let records = self.records.read().await;
        records.clients.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn get_client_jwt(&self, jti: &str) -> Result<ClientJwt, StorageError> {
        let records = self.records.read().await;
        records
            .client_jwts
            .get(jti)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_valid_client_jwt(&self, jti: &str) -> Result<ClientJwt, StorageError> {
        let records = self.records.read().await;
        records
            .client_jwts
            .get(jti)
            .filter(|jwt| jwt.active && jwt.expires_at > Utc::now())
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn update_access_token(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let token = records
            .access_tokens
            .values_mut()
            .find(|t| t.id == id)
            .ok_or(StorageError::NotFound)?;
        apply_update(&mut token.active, None, update);
        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let token = records
            .refresh_tokens
            .values_mut()
            .find(|t| t.id == id)
            .ok_or(StorageError::NotFound)?;
        apply_update(&mut token.active, Some(&mut token.graceful_expires_at), update);
        Ok(())
    }

    async fn update_authorization_code(
        &self,
        id: &str,
        update: &TokenUpdate,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let code = records
            .authorization_codes
            .values_mut()
            .find(|c| c.id == id)
            .ok_or(StorageError::NotFound)?;
        apply_update(&mut code.active, None, update);
        Ok(())
    }

    async fn delete_access_token(&self, signature: &str) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records
            .access_tokens
            .remove(signature)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn delete_refresh_token(&self, signature: &str) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records
            .refresh_tokens
            .remove(signature)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn delete_expired_client_jwts(&self, now: DateTime<Utc>) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.client_jwts.retain(|_, jwt| jwt.expires_at > now);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}

#[async_trait]
impl UserLookup for MemoryStore {
    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, StorageError> {
        let records = self.records.read().await;
        records
            .users
            .get(user_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::models::RequestForm;

    fn access_token(id: &str, signature: &str) -> AccessToken {
        AccessToken {
            id: id.to_string(),
            active: true,
            signature: signature.to_string(),
            requested_at: Utc::now(),
            client_id: "client-1".to_string(),
            requested_scopes: vec!["openid".to_string()],
            granted_scopes: vec!["openid".to_string()],
            form: RequestForm::new(),
            session_id: "session-1".to_string(),
            requested_audience: vec![],
            granted_audience: vec![],
        }
    }

    #[tokio::test]
    async fn access_tokens_resolve_by_id_and_signature() {
        let store = MemoryStore::new();
        store
            .create_access_token(&access_token("token-1", "sig-1"))
            .await
            .unwrap();

        let by_sig = store
            .get_access_token(&TokenFilter::Signature("sig-1".to_string()))
            .await
            .unwrap();
        let by_id = store
            .get_access_token(&TokenFilter::Id("token-1".to_string()))
            .await
            .unwrap();
        assert_eq!(by_sig, by_id);
    }

    #[tokio::test]
    async fn partial_update_leaves_unset_fields_alone() {
        let store = MemoryStore::new();
        store
            .create_access_token(&access_token("token-1", "sig-1"))
            .await
            .unwrap();

        store
            .update_access_token("token-1", &TokenUpdate::deactivate())
            .await
            .unwrap();

        let token = store
            .get_access_token(&TokenFilter::Id("token-1".to_string()))
            .await
            .unwrap();
        assert!(!token.active);
        assert_eq!(token.signature, "sig-1");
    }

    #[tokio::test]
    async fn deleting_a_missing_token_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_access_token("sig-missing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn expired_jwts_are_purged() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create_client_jwt(&ClientJwt {
                jti: "stale".to_string(),
                active: true,
                expires_at: now - chrono::Duration::minutes(5),
            })
            .await
            .unwrap();
        store
            .create_client_jwt(&ClientJwt {
                jti: "fresh".to_string(),
                active: true,
                expires_at: now + chrono::Duration::minutes(5),
            })
            .await
            .unwrap();

        store.delete_expired_client_jwts(now).await.unwrap();

        assert!(store.get_client_jwt("stale").await.is_err());
        assert!(store.get_client_jwt("fresh").await.is_ok());
    }
}
