use crate::error::EngineError;
use crate::model::{PolicySet, Rule};
use tokio::sync::Mutex;

/// Durable storage for policy rules.
///
/// Implementations must distinguish storage faults (returned as
/// [`EngineError::Adapter`]) from an empty policy set, which is a normal
/// result. Rule-level mutations are expected to be idempotent at the
/// storage layer: adding a rule that already exists or removing one that
/// does not must not fail.
#[async_trait::async_trait]
pub trait PolicyAdapter: Send + Sync {
    /// Loads every persisted rule.
    async fn load_policy(&self) -> Result<PolicySet, EngineError>;

    /// Replaces the persisted rules with the given set.
    async fn save_policy(&self, set: &PolicySet) -> Result<(), EngineError>;

    /// Persists a single rule.
    async fn add_rule(&self, rule: &Rule) -> Result<(), EngineError>;

    /// Removes a single rule.
    async fn remove_rule(&self, rule: &Rule) -> Result<(), EngineError>;
}

/// An adapter that keeps rules in process memory.
///
/// Useful for tests and for embedding the enforcer without a database.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    rules: Mutex<PolicySet>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the adapter with rules, bypassing an enforcer. Used to model
    /// mutations made by another process.
    pub async fn seed(&self, rule: Rule) {
        self.rules.lock().await.insert(rule);
    }
}

#[async_trait::async_trait]
impl PolicyAdapter for MemoryAdapter {
    async fn load_policy(&self) -> Result<PolicySet, EngineError> {
        Ok(self.rules.lock().await.clone())
    }

    async fn save_policy(&self, set: &PolicySet) -> Result<(), EngineError> {
        *self.rules.lock().await = set.clone();
        Ok(())
    }

    async fn add_rule(&self, rule: &Rule) -> Result<(), EngineError> {
        self.rules.lock().await.insert(rule.clone());
        Ok(())
    }

    async fn remove_rule(&self, rule: &Rule) -> Result<(), EngineError> {
        self.rules.lock().await.remove(rule);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PolicyRule;

    fn rule() -> Rule {
        Rule::Policy(PolicyRule {
            organization_id: "org-1".to_string(),
            program_id: "prog-1".to_string(),
            subject: "user-1".to_string(),
            object: "facility".to_string(),
            action: "facility.read".to_string(),
        })
    }

    #[tokio::test]
    async fn add_then_load_returns_rule() {
        let adapter = MemoryAdapter::new();
        adapter.add_rule(&rule()).await.unwrap();

        let set = adapter.load_policy().await.unwrap();
        assert!(set.contains(&rule()));
    }

    #[tokio::test]
    async fn save_replaces_previous_rules() {
        let adapter = MemoryAdapter::new();
        adapter.add_rule(&rule()).await.unwrap();

        adapter.save_policy(&PolicySet::new()).await.unwrap();
        assert!(adapter.load_policy().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_missing_rule_is_not_an_error() {
        let adapter = MemoryAdapter::new();
        adapter.remove_rule(&rule()).await.unwrap();
    }
}
