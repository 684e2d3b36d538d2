//! OAuth client lookup and client-assertion JWT replay protection.

use crate::oauth::error::OauthStorageError;
use crate::oauth::models::{ClientJwt, OauthClient};
use crate::oauth::storage::OauthStorage;
use crate::store::StorageError;
use chrono::{DateTime, Utc};

impl OauthStorage {
    /// Looks up a registered OAuth client by id.
    pub async fn get_client(&self, id: &str) -> Result<OauthClient, OauthStorageError> {
        self.store
            .get_oauth_client(id)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to load oauth client", e))
    }

    /// Registers a new OAuth client.
    pub async fn create_client(&self, client: &OauthClient) -> Result<(), OauthStorageError> {
        self.store
            .create_oauth_client(client)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store oauth client", e))
    }

    /// Checks whether a client assertion JWT id can still be used.
    ///
    /// Fails with [`OauthStorageError::JtiKnown`] when a live record for
    /// the jti exists; an unknown or expired jti is fine.
    pub async fn client_assertion_jwt_valid(&self, jti: &str) -> Result<(), OauthStorageError> {
        match self.store.get_valid_client_jwt(jti).await {
            Ok(_) => Err(OauthStorageError::JtiKnown),
            Err(StorageError::NotFound) => Ok(()),
            Err(e) => Err(OauthStorageError::from_storage(
                "failed to check client assertion jwt",
                e,
            )),
        }
    }

    /// Records a client assertion JWT id so replays are rejected until
    /// `expires_at`. Expired records are purged on the way in.
    pub async fn set_client_assertion_jwt(
        &self,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), OauthStorageError> {
        self.store
            .delete_expired_client_jwts(Utc::now())
            .await
            .map_err(|e| {
                OauthStorageError::from_storage("failed to purge expired client jwts", e)
            })?;

        match self.store.get_valid_client_jwt(jti).await {
            Ok(_) => return Err(OauthStorageError::JtiKnown),
            Err(StorageError::NotFound) => {}
            Err(e) => {
                return Err(OauthStorageError::from_storage(
                    "failed to check client assertion jwt",
                    e,
                ))
            }
        }

        let record = ClientJwt {
            jti: jti.to_string(),
            active: true,
            expires_at,
        };
        self.store
            .create_client_jwt(&record)
            .await
            .map_err(|e| OauthStorageError::from_storage("failed to store client jwt", e))
    }
}
