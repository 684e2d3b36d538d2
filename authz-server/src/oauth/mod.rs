//! OAuth2 token storage.
//!
//! [`storage::OauthStorage`] implements the storage contract an OAuth2
//! framework expects: create, look up, invalidate and revoke tokens per
//! kind, plus client lookup and client-assertion JWT replay protection.

pub mod error;
pub mod models;
pub mod storage;

pub use error::OauthStorageError;
pub use storage::OauthStorage;
