use config::{Config as ConfigCrate, ConfigError};
use serde::Deserialize;

/// Main configuration structure for the authorization server
#[derive(Debug, Deserialize, Clone)]
pub struct AuthzConfig {
    /// The port the server will listen on (default: 8600)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Postgres connection string
    #[serde(default)]
    pub database_url: String,

    /// Maximum number of pooled database connections
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// Name of the table holding policy rules
    #[serde(default = "default_policy_table")]
    pub policy_table: String,

    /// Grace period applied when revoking refresh tokens, in seconds.
    /// Zero revokes unconditionally.
    #[serde(default)]
    pub refresh_token_grace_period_secs: u64,
}

fn default_port() -> u16 {
    8600
}

fn default_max_connections() -> u32 {
    10
}

fn default_policy_table() -> String {
    "policy_rules".to_string()
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: "".to_string(),
            database_max_connections: default_max_connections(),
            policy_table: default_policy_table(),
            refresh_token_grace_period_secs: 0,
        }
    }
}

impl AuthzConfig {
    /// Creates a new config instance from environment variables.
    ///
    /// All settings are flat and read with an `AUTHZ_` prefix, e.g.
    /// `AUTHZ_DATABASE_URL`, `AUTHZ_POLICY_TABLE`.
    pub fn new() -> Result<Self, String> {
        ConfigCrate::builder()
            .add_source(config::Environment::with_prefix("AUTHZ"))
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            port: 0, // Let the OS choose a port
            database_url: "".to_string(),
            database_max_connections: 1,
            policy_table: default_policy_table(),
            refresh_token_grace_period_secs: 0,
        }
    }
}
