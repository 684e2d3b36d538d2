use crate::adapter::PolicyAdapter;
use crate::error::EngineError;
use crate::model::{GroupingRule, PolicyRule, PolicySet, Rule};
use log::debug;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The question side of a policy tuple: everything except the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub organization_id: String,
    pub program_id: String,
    pub object: String,
    pub action: String,
}

impl AccessRequest {
    fn policy_for(&self, subject: &str) -> PolicyRule {
        PolicyRule {
            organization_id: self.organization_id.clone(),
            program_id: self.program_id.clone(),
            subject: subject.to_string(),
            object: self.object.clone(),
            action: self.action.clone(),
        }
    }
}

/// Policy decision point backed by a [`PolicyAdapter`].
///
/// The full policy set is cached behind an `RwLock`: concurrent `enforce`
/// calls share the read lock, while mutations serialize on the write lock
/// and persist through the adapter before touching the cache. Mutations
/// made by another process are not visible until [`Enforcer::load_policy`]
/// is called.
pub struct Enforcer {
    adapter: Arc<dyn PolicyAdapter>,
    set: RwLock<PolicySet>,
}

impl Enforcer {
    /// Builds an enforcer, loading the policy set from the adapter.
    ///
    /// Fails if the initial load fails: serving authorization decisions
    /// without the policy set is not safe, so callers should treat this
    /// error as fatal.
    pub async fn new(adapter: Arc<dyn PolicyAdapter>) -> Result<Self, EngineError> {
        let set = adapter.load_policy().await?;
        debug!("loaded {} policy rules", set.len());
        Ok(Self {
            adapter,
            set: RwLock::new(set),
        })
    }

    /// Answers whether `subject` may perform the requested action.
    ///
    /// A subject is allowed if a policy names it directly, or if it is
    /// bound (possibly through a chain of grouping rules) to a role that a
    /// policy names. Matching is strictly scoped to the request's
    /// (organization, program) pair. No matching rule is a normal `false`.
    pub async fn enforce(
        &self,
        subject: &str,
        request: &AccessRequest,
    ) -> Result<bool, EngineError> {
        let set = self.set.read().await;

        if set.policies.contains(&request.policy_for(subject)) {
            return Ok(true);
        }

        // Walk role inheritance breadth-first. `seen` keeps grouping
        // cycles from looping forever.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(subject);

        while let Some(current) = queue.pop_front() {
            for grouping in set.groupings.iter().filter(|g| {
                g.organization_id == request.organization_id
                    && g.program_id == request.program_id
                    && g.subject == current
            }) {
                if !seen.insert(grouping.role.as_str()) {
                    continue;
                }
                if set.policies.contains(&request.policy_for(&grouping.role)) {
                    return Ok(true);
                }
                queue.push_back(grouping.role.as_str());
            }
        }

        Ok(false)
    }

    /// Grants `subject` the requested action. Returns whether the policy
    /// set changed; re-adding an existing policy is a no-op.
    pub async fn add_policy(
        &self,
        subject: &str,
        request: &AccessRequest,
    ) -> Result<bool, EngineError> {
        self.add_rule(Rule::Policy(request.policy_for(subject))).await
    }

    /// Removes a previously granted policy. Returns whether anything was
    /// removed.
    pub async fn remove_policy(
        &self,
        subject: &str,
        request: &AccessRequest,
    ) -> Result<bool, EngineError> {
        self.remove_rule(&Rule::Policy(request.policy_for(subject))).await
    }

    /// Binds `subject` to `role` within the given scope.
    pub async fn add_grouping_policy(&self, grouping: GroupingRule) -> Result<bool, EngineError> {
        self.add_rule(Rule::Grouping(grouping)).await
    }

    /// Removes a subject-to-role binding.
    pub async fn remove_grouping_policy(
        &self,
        grouping: &GroupingRule,
    ) -> Result<bool, EngineError> {
        self.remove_rule(&Rule::Grouping(grouping.clone())).await
    }

    /// Discards the cached policy set and reloads it from the adapter.
    pub async fn load_policy(&self) -> Result<(), EngineError> {
        let fresh = self.adapter.load_policy().await?;
        let mut set = self.set.write().await;
        debug!("reloaded {} policy rules", fresh.len());
        *set = fresh;
        Ok(())
    }

    /// Flushes the cached policy set to the adapter.
    pub async fn save_policy(&self) -> Result<(), EngineError> {
        let set = self.set.read().await;
        self.adapter.save_policy(&set).await
    }

    async fn add_rule(&self, rule: Rule) -> Result<bool, EngineError> {
        let mut set = self.set.write().await;
        if set.contains(&rule) {
            return Ok(false);
        }
        self.adapter.add_rule(&rule).await?;
        set.insert(rule);
        Ok(true)
    }

    async fn remove_rule(&self, rule: &Rule) -> Result<bool, EngineError> {
        let mut set = self.set.write().await;
        if !set.contains(rule) {
            return Ok(false);
        }
        self.adapter.remove_rule(rule).await?;
        set.remove(rule);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;

    fn request(org: &str, program: &str, object: &str, action: &str) -> AccessRequest {
        AccessRequest {
            organization_id: org.to_string(),
            program_id: program.to_string(),
            object: object.to_string(),
            action: action.to_string(),
        }
    }

    fn facility_read(org: &str) -> AccessRequest {
        request(org, "prog-1", "facility", "facility.read")
    }

    fn grouping(org: &str, subject: &str, role: &str) -> GroupingRule {
        GroupingRule {
            organization_id: org.to_string(),
            program_id: "prog-1".to_string(),
            subject: subject.to_string(),
            role: role.to_string(),
        }
    }

    async fn enforcer() -> Enforcer {
        Enforcer::new(Arc::new(MemoryAdapter::new())).await.unwrap()
    }

    #[tokio::test]
    async fn no_policy_is_a_plain_false() {
        let e = enforcer().await;
        let allowed = e.enforce("user-1", &facility_read("org-1")).await.unwrap();
        assert!(!allowed);
    }

    #[tokio::test]
    async fn policy_lifecycle_add_enforce_remove() {
        let e = enforcer().await;
        let req = facility_read("org-1");

        assert!(e.add_policy("user-1", &req).await.unwrap());
        assert!(e.enforce("user-1", &req).await.unwrap());

        assert!(e.remove_policy("user-1", &req).await.unwrap());
        assert!(!e.enforce("user-1", &req).await.unwrap());
    }

    #[tokio::test]
    async fn adding_the_same_policy_twice_reports_no_change() {
        let e = enforcer().await;
        let req = facility_read("org-1");

        assert!(e.add_policy("user-1", &req).await.unwrap());
        assert!(!e.add_policy("user-1", &req).await.unwrap());
        assert!(e.enforce("user-1", &req).await.unwrap());
    }

    #[tokio::test]
    async fn removing_a_missing_policy_reports_no_change() {
        let e = enforcer().await;
        assert!(!e.remove_policy("user-1", &facility_read("org-1")).await.unwrap());
    }

    #[tokio::test]
    async fn organization_scoping_is_strict() {
        let e = enforcer().await;
        e.add_policy("user-1", &facility_read("org-a")).await.unwrap();

        assert!(e.enforce("user-1", &facility_read("org-a")).await.unwrap());
        assert!(!e.enforce("user-1", &facility_read("org-b")).await.unwrap());
    }

    #[tokio::test]
    async fn program_scoping_is_strict() {
        let e = enforcer().await;
        let prog_a = request("org-1", "prog-a", "facility", "facility.read");
        let prog_b = request("org-1", "prog-b", "facility", "facility.read");
        e.add_policy("user-1", &prog_a).await.unwrap();

        assert!(e.enforce("user-1", &prog_a).await.unwrap());
        assert!(!e.enforce("user-1", &prog_b).await.unwrap());
    }

    #[tokio::test]
    async fn role_membership_grants_access() {
        let e = enforcer().await;
        let req = facility_read("org-1");

        e.add_policy("Default Admin", &req).await.unwrap();
        assert!(!e.enforce("user-1", &req).await.unwrap());

        e.add_grouping_policy(grouping("org-1", "user-1", "Default Admin"))
            .await
            .unwrap();
        assert!(e.enforce("user-1", &req).await.unwrap());

        e.remove_grouping_policy(&grouping("org-1", "user-1", "Default Admin"))
            .await
            .unwrap();
        assert!(!e.enforce("user-1", &req).await.unwrap());
    }

    #[tokio::test]
    async fn role_membership_respects_scope() {
        let e = enforcer().await;
        e.add_policy("Default Admin", &facility_read("org-a")).await.unwrap();
        // Bound to the role in a different organization.
        e.add_grouping_policy(grouping("org-b", "user-1", "Default Admin"))
            .await
            .unwrap();

        assert!(!e.enforce("user-1", &facility_read("org-a")).await.unwrap());
    }

    #[tokio::test]
    async fn role_inheritance_is_transitive() {
        let e = enforcer().await;
        let req = facility_read("org-1");

        e.add_policy("admins", &req).await.unwrap();
        e.add_grouping_policy(grouping("org-1", "supervisors", "admins"))
            .await
            .unwrap();
        e.add_grouping_policy(grouping("org-1", "user-1", "supervisors"))
            .await
            .unwrap();

        assert!(e.enforce("user-1", &req).await.unwrap());
    }

    #[tokio::test]
    async fn grouping_cycles_terminate() {
        let e = enforcer().await;
        e.add_grouping_policy(grouping("org-1", "a", "b")).await.unwrap();
        e.add_grouping_policy(grouping("org-1", "b", "a")).await.unwrap();

        assert!(!e.enforce("a", &facility_read("org-1")).await.unwrap());
    }

    #[tokio::test]
    async fn load_policy_picks_up_external_mutations() {
        let adapter = Arc::new(MemoryAdapter::new());
        let e = Enforcer::new(adapter.clone()).await.unwrap();
        let req = facility_read("org-1");

        // Another process writes a rule directly to storage.
        adapter
            .seed(Rule::Policy(PolicyRule {
                organization_id: "org-1".to_string(),
                program_id: "prog-1".to_string(),
                subject: "user-1".to_string(),
                object: "facility".to_string(),
                action: "facility.read".to_string(),
            }))
            .await;

        assert!(!e.enforce("user-1", &req).await.unwrap());
        e.load_policy().await.unwrap();
        assert!(e.enforce("user-1", &req).await.unwrap());
    }

    #[tokio::test]
    async fn save_policy_flushes_cache_to_storage() {
        let adapter = Arc::new(MemoryAdapter::new());
        let e = Enforcer::new(adapter.clone()).await.unwrap();
        e.add_policy("user-1", &facility_read("org-1")).await.unwrap();

        e.save_policy().await.unwrap();
        let stored = adapter.load_policy().await.unwrap();
        assert_eq!(stored.policies.len(), 1);
    }
}
