//! Refresh token lifecycle, including the rotation grace window.

use crate::oauth::error::OauthStorageError;
use crate::oauth::models::{OauthRequest, RefreshToken};
use crate::oauth::storage::OauthStorage;
use crate::store::{TokenFilter, TokenUpdate};
use chrono::{Duration, Utc};

impl OauthStorage {
    /// Persists a refresh token under its signature, upserting the
    /// owning session first.
    pub async fn create_refresh_token(
        &self,
        signature: &str,
        request: &OauthRequest,
    ) -> Result<(), OauthStorageError> {
        self.store
            .create_or_update_session(&request.session)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store token session", e))?;

        let token = RefreshToken {
            id: request.id.clone(),
            active: true,
            signature: signature.to_string(),
            requested_at: request.requested_at,
            client_id: request.client.id.clone(),
            requested_scopes: request.requested_scopes.clone(),
            granted_scopes: request.granted_scopes.clone(),
            form: request.form.clone(),
            session_id: request.session.id.clone(),
            requested_audience: request.requested_audience.clone(),
            granted_audience: request.granted_audience.clone(),
            graceful_expires_at: None,
        };
        self.store
            .create_refresh_token(&token)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store refresh token", e))
    }

    /// Looks up a refresh token by signature.
    ///
    /// A token that is inactive, or whose grace window has lapsed, fails
    /// with [`OauthStorageError::InactiveToken`] carrying the
    /// reconstructed request so the caller can revoke the whole grant.
    pub async fn get_refresh_token(
        &self,
        signature: &str,
    ) -> Result<OauthRequest, OauthStorageError> {
        let token = self
            .store
            .get_refresh_token(&TokenFilter::Signature(signature.to_string()))
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to load refresh token", e))?;

        let (client, session) = self.resolve(&token.client_id, &token.session_id).await?;
        let request = OauthRequest {
            id: token.id,
            requested_at: token.requested_at,
            client,
            requested_scopes: token.requested_scopes,
            granted_scopes: token.granted_scopes,
            form: token.form,
            session,
            requested_audience: token.requested_audience,
            granted_audience: token.granted_audience,
        };

        let grace_lapsed = token
            .graceful_expires_at
            .is_some_and(|instant| instant <= Utc::now());
        if !token.active || grace_lapsed {
            return Err(OauthStorageError::InactiveToken(Box::new(request)));
        }

        Ok(request)
    }

    /// Removes a refresh token by signature.
    pub async fn delete_refresh_token(&self, signature: &str) -> Result<(), OauthStorageError> {
        self.store
            .delete_refresh_token(signature)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to delete refresh token", e))
    }

    /// Marks the refresh token minted for `request_id` inactive.
    pub async fn revoke_refresh_token(&self, request_id: &str) -> Result<(), OauthStorageError> {
        self.store
            .update_refresh_token(request_id, &TokenUpdate::deactivate())
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to revoke refresh token", e))
    }

    /// Revokes a rotated refresh token, honoring the configured grace
    /// window: with a nonzero window the token stays active but gets a
    /// hard expiry stamped, so a client that lost the rotation response
    /// can retry briefly.
    pub async fn revoke_refresh_token_maybe_grace_period(
        &self,
        request_id: &str,
        _signature: &str,
    ) -> Result<(), OauthStorageError> {
        if self.refresh_grace_period_secs == 0 {
            return self.revoke_refresh_token(request_id).await;
        }

        let expiry = Utc::now() + Duration::seconds(self.refresh_grace_period_secs as i64);
        self.store
            .update_refresh_token(request_id, &TokenUpdate::grace_until(expiry))
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to revoke refresh token", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::storage::test_support::{request, storage_with_client};
    use crate::store::OauthStore;

    #[tokio::test]
    async fn create_then_get_roundtrips_the_request() {
        let (storage, _, client) = storage_with_client(0).await;
        let req = request("req-1", client);

        storage.create_refresh_token("sig-1", &req).await.unwrap();
        let loaded = storage.get_refresh_token("sig-1").await.unwrap();

        assert_eq!(loaded.id, "req-1");
        assert_eq!(loaded.session, req.session);
    }

    #[tokio::test]
    async fn revoked_token_surfaces_as_inactive_with_its_request() {
        let (storage, _, client) = storage_with_client(0).await;
        let req = request("req-1", client);
        storage.create_refresh_token("sig-1", &req).await.unwrap();

        storage.revoke_refresh_token("req-1").await.unwrap();

        match storage.get_refresh_token("sig-1").await.unwrap_err() {
            OauthStorageError::InactiveToken(inner) => assert_eq!(inner.id, "req-1"),
            other => panic!("expected InactiveToken, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_grace_period_revokes_unconditionally() {
        let (storage, _, client) = storage_with_client(0).await;
        storage
            .create_refresh_token("sig-1", &request("req-1", client))
            .await
            .unwrap();

        storage
            .revoke_refresh_token_maybe_grace_period("req-1", "sig-1")
            .await
            .unwrap();

        assert!(matches!(
            storage.get_refresh_token("sig-1").await.unwrap_err(),
            OauthStorageError::InactiveToken(_)
        ));
    }

    #[tokio::test]
    async fn grace_period_keeps_the_token_usable() {
        let (storage, store, client) = storage_with_client(300).await;
        storage
            .create_refresh_token("sig-1", &request("req-1", client))
            .await
            .unwrap();

        storage
            .revoke_refresh_token_maybe_grace_period("req-1", "sig-1")
            .await
            .unwrap();

        // Still resolvable inside the window.
        let loaded = storage.get_refresh_token("sig-1").await.unwrap();
        assert_eq!(loaded.id, "req-1");

        let row = store
            .get_refresh_token(&TokenFilter::Signature("sig-1".to_string()))
            .await
            .unwrap();
        assert!(row.active);
        assert!(row.graceful_expires_at.is_some());
    }

    #[tokio::test]
    async fn lapsed_grace_window_is_inactive() {
        let (storage, store, client) = storage_with_client(300).await;
        storage
            .create_refresh_token("sig-1", &request("req-1", client))
            .await
            .unwrap();

        // Stamp an expiry in the past directly.
        store
            .update_refresh_token(
                "req-1",
                &TokenUpdate::grace_until(Utc::now() - Duration::seconds(1)),
            )
            .await
            .unwrap();

        assert!(matches!(
            storage.get_refresh_token("sig-1").await.unwrap_err(),
            OauthStorageError::InactiveToken(_)
        ));
    }
}
