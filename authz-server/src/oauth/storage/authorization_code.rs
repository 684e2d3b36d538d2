//! Authorization code lifecycle.

use crate::oauth::error::OauthStorageError;
use crate::oauth::models::{AuthorizationCode, OauthRequest};
use crate::oauth::storage::OauthStorage;
use crate::store::TokenUpdate;

impl OauthStorage {
    /// Persists an authorization code, upserting the owning session
    /// first.
    pub async fn create_authorization_code(
        &self,
        code: &str,
        request: &OauthRequest,
    ) -> Result<(), OauthStorageError> {
        self.store
            .create_or_update_session(&request.session)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store token session", e))?;

        let record = AuthorizationCode {
            id: request.id.clone(),
            active: true,
            code: code.to_string(),
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
            .create_authorization_code(&record)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store authorization code", e))
    }

    /// Looks up an authorization code.
    ///
    /// A code that was already consumed fails with
    /// [`OauthStorageError::InvalidatedAuthorizationCode`] carrying the
    /// reconstructed request, so the caller can revoke everything that
    /// was issued from the replayed code.
    pub async fn get_authorization_code(
        &self,
        code: &str,
    ) -> Result<OauthRequest, OauthStorageError> {
        let record = self
            .store
            .get_authorization_code(code)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to load authorization code", e))?;

        let (client, session) = self.resolve(&record.client_id, &record.session_id).await?;
        let request = OauthRequest {
            id: record.id,
            requested_at: record.requested_at,
            client,
            requested_scopes: record.requested_scopes,
            granted_scopes: record.granted_scopes,
            form: record.form,
            session,
            requested_audience: record.requested_audience,
            granted_audience: record.granted_audience,
        };

        if !record.active {
            return Err(OauthStorageError::InvalidatedAuthorizationCode(Box::new(
                request,
            )));
        }

        Ok(request)
    }

    /// Marks an authorization code as consumed. The row is kept so a
    /// replay can be detected and reported with its original request.
    pub async fn invalidate_authorization_code(
        &self,
        code: &str,
    ) -> Result<(), OauthStorageError> {
        let record = self
            .store
            .get_authorization_code(code)
            .await
            .map_err(|e| {
                OauthStorageError::from_storage("failed to invalidate authorization code", e)
            })?;

        self.store
            .update_authorization_code(&record.id, &TokenUpdate::deactivate())
            .await
            .map_err(|e| {
                OauthStorageError::from_storage("failed to invalidate authorization code", e)
            })
    }
}
