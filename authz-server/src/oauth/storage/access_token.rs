//! Access token lifecycle.

use crate::oauth::error::OauthStorageError;
use crate::oauth::models::{AccessToken, OauthRequest};
use crate::oauth::storage::OauthStorage;
use crate::store::{TokenFilter, TokenUpdate};

impl OauthStorage {
    /// Persists an access token under its signature. The owning session
    /// is upserted first so rotated tokens keep pointing at one session
    /// row.
    pub async fn create_access_token(
        &self,
        signature: &str,
        request: &OauthRequest,
    ) -> Result<(), OauthStorageError> {
        self.store
            .create_or_update_session(&request.session)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store token session", e))?;

        let token = AccessToken {
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
        };
        self.store
            .create_access_token(&token)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store access token", e))
    }

    /// Looks up an access token by signature and rebuilds the request it
    /// was minted for. Revoked rows still resolve; the `active` flag is
    /// the caller's concern.
    pub async fn get_access_token(
        &self,
        signature: &str,
    ) -> Result<OauthRequest, OauthStorageError> {
        let token = self
            .store
            .get_access_token(&TokenFilter::Signature(signature.to_string()))
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to load access token", e))?;

        let (client, session) = self.resolve(&token.client_id, &token.session_id).await?;
        Ok(OauthRequest {
            id: token.id,
            requested_at: token.requested_at,
            client,
            requested_scopes: token.requested_scopes,
            granted_scopes: token.granted_scopes,
            form: token.form,
            session,
            requested_audience: token.requested_audience,
            granted_audience: token.granted_audience,
        })
    }

    /// Removes an access token by signature.
    pub async fn delete_access_token(&self, signature: &str) -> Result<(), OauthStorageError> {
        self.store
            .delete_access_token(signature)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to delete access token", e))
    }

    /// Marks the access token minted for `request_id` inactive. The row
    /// is kept; deletion is a separate lifecycle end.
    pub async fn revoke_access_token(&self, request_id: &str) -> Result<(), OauthStorageError> {
        self.store
            .update_access_token(request_id, &TokenUpdate::deactivate())
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to revoke access token", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::storage::test_support::{request, storage_with_client};

    #[tokio::test]
    async fn create_then_get_roundtrips_the_request() {
        let (storage, _, client) = storage_with_client(0).await;
        let req = request("req-1", client);

        storage.create_access_token("sig-1", &req).await.unwrap();
        let loaded = storage.get_access_token("sig-1").await.unwrap();

        assert_eq!(loaded.id, "req-1");
        assert_eq!(loaded.client, req.client);
        assert_eq!(loaded.session, req.session);
        assert_eq!(loaded.granted_scopes, req.granted_scopes);
    }

    #[tokio::test]
    async fn missing_signature_is_not_found() {
        let (storage, _, _) = storage_with_client(0).await;
        let err = storage.get_access_token("sig-missing").await.unwrap_err();
        assert!(matches!(err, OauthStorageError::NotFound));
    }

    #[tokio::test]
    async fn deleted_tokens_stop_resolving() {
        let (storage, _, client) = storage_with_client(0).await;
        storage
            .create_access_token("sig-1", &request("req-1", client))
            .await
            .unwrap();

        storage.delete_access_token("sig-1").await.unwrap();

        let err = storage.get_access_token("sig-1").await.unwrap_err();
        assert!(matches!(err, OauthStorageError::NotFound));
    }

    #[tokio::test]
    async fn revoked_tokens_still_resolve_until_deleted() {
        let (storage, store, client) = storage_with_client(0).await;
        storage
            .create_access_token("sig-1", &request("req-1", client))
            .await
            .unwrap();

        storage.revoke_access_token("req-1").await.unwrap();

        // The row survives revocation with its active flag cleared.
        let loaded = storage.get_access_token("sig-1").await.unwrap();
        assert_eq!(loaded.id, "req-1");
        use crate::store::OauthStore;
        let row = store
            .get_access_token(&TokenFilter::Signature("sig-1".to_string()))
            .await
            .unwrap();
        assert!(!row.active);

        // Deletion is a separate step and still succeeds afterwards.
        storage.delete_access_token("sig-1").await.unwrap();
        let err = storage.get_access_token("sig-1").await.unwrap_err();
        assert!(matches!(err, OauthStorageError::NotFound));
    }

    #[tokio::test]
    async fn revoking_an_unknown_request_id_is_not_found() {
        let (storage, _, _) = storage_with_client(0).await;
        let err = storage.revoke_access_token("req-missing").await.unwrap_err();
        assert!(matches!(err, OauthStorageError::NotFound));
    }

    #[tokio::test]
    async fn rotation_reuses_the_session_row() {
        let (storage, store, client) = storage_with_client(0).await;
        let mut req = request("req-1", client);
        storage.create_access_token("sig-1", &req).await.unwrap();

        // Same session id with updated attributes, as happens on refresh.
        req.id = "req-2".to_string();
        req.session.username = "jane.d".to_string();
        storage.create_access_token("sig-2", &req).await.unwrap();

        use crate::store::OauthStore;
        let session = store.get_session(&req.session.id).await.unwrap();
        assert_eq!(session.username, "jane.d");
    }
}
