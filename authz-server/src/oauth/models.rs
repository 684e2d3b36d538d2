//! Persistent OAuth2 records.
//!
//! These are the rows the token store reads and writes. Tokens reference
//! their session and client by id; [`OauthRequest`] is the denormalized
//! view handed back to the OAuth framework on lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The raw request form captured at token issuance, keyed by parameter
/// name with repeated values preserved.
pub type RequestForm = HashMap<String, Vec<String>>;

/// An authenticated session shared by the tokens minted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub client_id: String,
    pub user_id: String,
    pub username: String,
    pub subject: String,
    /// Arbitrary session payload the OAuth framework round-trips.
    pub extra: serde_json::Value,
}

impl Session {
    pub fn new(client_id: &str, user_id: &str, username: &str, subject: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            subject: subject.to_string(),
            extra: serde_json::Value::Null,
        }
    }
}

/// A registered OAuth2 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OauthClient {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub secret: String,
    pub rotated_secrets: Vec<String>,
    pub public: bool,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub audience: Vec<String>,
    pub grants: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
}

/// An issued access token, stored by its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: String,
    pub active: bool,
    pub signature: String,
    pub requested_at: DateTime<Utc>,
    pub client_id: String,
    pub requested_scopes: Vec<String>,
    pub granted_scopes: Vec<String>,
    pub form: RequestForm,
    pub session_id: String,
    pub requested_audience: Vec<String>,
    pub granted_audience: Vec<String>,
}

/// An issued refresh token.
///
/// `graceful_expires_at` is set instead of flipping `active` when the
/// grace period is configured: the token stays usable until that instant
/// even though it has been rotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: String,
    pub active: bool,
    pub signature: String,
    pub requested_at: DateTime<Utc>,
    pub client_id: String,
    pub requested_scopes: Vec<String>,
    pub granted_scopes: Vec<String>,
    pub form: RequestForm,
    pub session_id: String,
    pub requested_audience: Vec<String>,
    pub granted_audience: Vec<String>,
    pub graceful_expires_at: Option<DateTime<Utc>>,
}

/// An authorization code, stored by the code value itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub id: String,
    pub active: bool,
    pub code: String,
    pub requested_at: DateTime<Utc>,
    pub client_id: String,
    pub requested_scopes: Vec<String>,
    pub granted_scopes: Vec<String>,
    pub form: RequestForm,
    pub session_id: String,
    pub requested_audience: Vec<String>,
    pub granted_audience: Vec<String>,
}

/// A client assertion JWT identifier, kept for replay protection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientJwt {
    pub jti: String,
    pub active: bool,
    pub expires_at: DateTime<Utc>,
}

/// The fully resolved request the OAuth framework consumes: a token row
/// joined with its client and session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OauthRequest {
    pub id: String,
    pub requested_at: DateTime<Utc>,
    pub client: OauthClient,
    pub requested_scopes: Vec<String>,
    pub granted_scopes: Vec<String>,
    pub form: RequestForm,
    pub session: Session,
    pub requested_audience: Vec<String>,
    pub granted_audience: Vec<String>,
}
