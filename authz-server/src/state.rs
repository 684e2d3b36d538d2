use crate::authz::{AuthorizationService, UserLookup};
use crate::config::AuthzConfig;
use crate::oauth::OauthStorage;
use crate::registry::PermissionRegistry;
use crate::store::OauthStore;
use policy_engine::{Enforcer, PolicyAdapter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthzConfig>,
    pub registry: Arc<PermissionRegistry>,
    pub enforcer: Arc<Enforcer>,
    pub authorization: AuthorizationService,
    pub oauth: Arc<OauthStorage>,
    pub store: Arc<dyn OauthStore>,
}

impl AppState {
    /// Wires up the full application state. Fails if the initial policy
    /// load fails; starting without policies would answer every check
    /// with a stale or empty set.
    pub async fn new(
        config: AuthzConfig,
        store: Arc<dyn OauthStore>,
        users: Arc<dyn UserLookup>,
        adapter: Arc<dyn PolicyAdapter>,
    ) -> Result<Self, std::io::Error> {
        let enforcer = Arc::new(Enforcer::new(adapter).await.map_err(|e| {
            std::io::Error::other(format!("Failed to load policies: {}", e))
        })?);

        let oauth = Arc::new(OauthStorage::new(
            store.clone(),
            config.refresh_token_grace_period_secs,
        ));

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(PermissionRegistry::builtin()),
            authorization: AuthorizationService::new(enforcer.clone(), users),
            enforcer,
            oauth,
            store,
        })
    }

    /// Check if the backing store is reachable
    pub async fn health_check(&self) -> bool {
        self.store.health_check().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use policy_engine::MemoryAdapter;

    async fn test_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        AppState::new(
            AuthzConfig::for_tests(),
            store.clone(),
            store,
            Arc::new(MemoryAdapter::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_app_state_health_check() {
        let state = test_state().await;
        assert!(state.health_check().await);
    }

    #[tokio::test]
    async fn test_app_state_oauth_is_wired_to_the_store() {
        let state = test_state().await;
        let err = state.oauth.get_client("nope").await.unwrap_err();
        assert!(matches!(err, crate::oauth::OauthStorageError::NotFound));
    }

    #[tokio::test]
    async fn test_app_state_clone() {
        let state = test_state().await;
        let state2 = state.clone();

        // After cloning, both instances should point to the same data
        assert_eq!(Arc::as_ptr(&state.config), Arc::as_ptr(&state2.config));
        assert_eq!(Arc::as_ptr(&state.enforcer), Arc::as_ptr(&state2.enforcer));
    }
}
