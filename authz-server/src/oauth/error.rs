use crate::oauth::models::OauthRequest;
use crate::store::StorageError;
use thiserror::Error;

/// Failures surfaced to the OAuth framework by the token storage layer.
///
/// The invalidated-code and inactive-token variants carry the
/// reconstructed request: the framework still needs the session and
/// client attached to the dead token, for example to revoke every token
/// issued from a replayed authorization code.
#[derive(Debug, Error)]
pub enum OauthStorageError {
    #[error("record not found")]
    NotFound,

    #[error("authorization code has been invalidated")]
    InvalidatedAuthorizationCode(Box<OauthRequest>),

    #[error("token is inactive")]
    InactiveToken(Box<OauthRequest>),

    #[error("jti is already known")]
    JtiKnown,

    #[error("{context}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },
}

impl OauthStorageError {
    /// Wraps a storage failure, mapping the missing-row case straight to
    /// [`OauthStorageError::NotFound`].
    pub fn from_storage(context: &str, source: StorageError) -> Self {
        match source {
            StorageError::NotFound => OauthStorageError::NotFound,
            other => OauthStorageError::Storage {
                context: context.to_string(),
                source: other,
            },
        }
    }
}
