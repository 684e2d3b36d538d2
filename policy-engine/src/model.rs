use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single permission grant: `subject` may perform `action` on `object`
/// within the given organization and program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub organization_id: String,
    pub program_id: String,
    pub subject: String,
    pub object: String,
    pub action: String,
}

/// Role membership: `subject` inherits every policy granted to `role`
/// within the given organization and program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupingRule {
    pub organization_id: String,
    pub program_id: String,
    pub subject: String,
    pub role: String,
}

/// A rule as persisted by a [`crate::PolicyAdapter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    Policy(PolicyRule),
    Grouping(GroupingRule),
}

/// The complete policy state of an enforcer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    pub policies: HashSet<PolicyRule>,
    pub groupings: HashSet<GroupingRule>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.policies.len() + self.groupings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.groupings.is_empty()
    }

    pub fn contains(&self, rule: &Rule) -> bool {
        match rule {
            Rule::Policy(p) => self.policies.contains(p),
            Rule::Grouping(g) => self.groupings.contains(g),
        }
    }

    /// Inserts a rule, returning whether the set changed.
    pub fn insert(&mut self, rule: Rule) -> bool {
        match rule {
            Rule::Policy(p) => self.policies.insert(p),
            Rule::Grouping(g) => self.groupings.insert(g),
        }
    }

    /// Removes a rule, returning whether the set changed.
    pub fn remove(&mut self, rule: &Rule) -> bool {
        match rule {
            Rule::Policy(p) => self.policies.remove(p),
            Rule::Grouping(g) => self.groupings.remove(g),
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.policies
            .iter()
            .cloned()
            .map(Rule::Policy)
            .chain(self.groupings.iter().cloned().map(Rule::Grouping))
    }
}
