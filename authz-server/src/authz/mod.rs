//! Authorization use case.
//!
//! Wraps the policy engine with identity resolution: callers either name
//! a subject explicitly or ask about "the logged-in user", in which case
//! the user's profile pins the organization and active program the check
//! runs against.

use crate::store::StorageError;
use async_trait::async_trait;
use policy_engine::{AccessRequest, Enforcer, EngineError, GroupingRule};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

/// A permission check: the scoped object/action pair plus where it
/// applies.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PermissionInput {
    pub organization_id: String,
    pub program_id: String,
    pub object: String,
    pub action: String,
}

impl PermissionInput {
    fn as_access_request(&self) -> AccessRequest {
        AccessRequest {
            organization_id: self.organization_id.clone(),
            program_id: self.program_id.clone(),
            object: self.object.clone(),
            action: self.action.clone(),
        }
    }
}

/// Per-request identity, extracted from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_id: Option<String>,
}

/// The slice of a user record authorization needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub organization_id: String,
    pub active_program_id: String,
}

/// Resolves user ids to profiles. Backed by the user table in
/// production.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, StorageError>;
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("failed to get logged in user")]
    GetLoggedInUserUid,

    #[error("failed to load profile for user {user_id}")]
    ProfileNotFound {
        user_id: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Enforcement(#[from] EngineError),
}

/// Binds a subject to a role within an organization and program.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleBinding {
    pub organization_id: String,
    pub program_id: String,
    pub role: String,
}

impl RoleBinding {
    fn as_grouping(&self, subject: &str) -> GroupingRule {
        GroupingRule {
            organization_id: self.organization_id.clone(),
            program_id: self.program_id.clone(),
            subject: subject.to_string(),
            role: self.role.clone(),
        }
    }
}

/// Authorization decisions and policy management over the enforcer.
#[derive(Clone)]
pub struct AuthorizationService {
    enforcer: Arc<Enforcer>,
    users: Arc<dyn UserLookup>,
}

impl AuthorizationService {
    pub fn new(enforcer: Arc<Enforcer>, users: Arc<dyn UserLookup>) -> Self {
        Self { enforcer, users }
    }

    /// Answers whether `subject` holds the permission, exactly as asked.
    pub async fn check_permissions(
        &self,
        subject: &str,
        input: &PermissionInput,
    ) -> Result<bool, AuthorizationError> {
        Ok(self
            .enforcer
            .enforce(subject, &input.as_access_request())
            .await?)
    }

    /// Like [`AuthorizationService::check_permissions`] but for the
    /// logged-in user: the check runs against the user's own
    /// organization and active program, overriding whatever scope the
    /// caller supplied.
    pub async fn check_authorization(
        &self,
        ctx: &RequestContext,
        input: &PermissionInput,
    ) -> Result<bool, AuthorizationError> {
        let user_id = ctx
            .user_id
            .as_deref()
            .ok_or(AuthorizationError::GetLoggedInUserUid)?;
        let profile = self.users.user_profile(user_id).await.map_err(|source| {
            AuthorizationError::ProfileNotFound {
                user_id: user_id.to_string(),
                source,
            }
        })?;

        let request = AccessRequest {
            organization_id: profile.organization_id,
            program_id: profile.active_program_id,
            object: input.object.clone(),
            action: input.action.clone(),
        };
        Ok(self.enforcer.enforce(&profile.id, &request).await?)
    }

    pub async fn add_policy(
        &self,
        subject: &str,
        input: &PermissionInput,
    ) -> Result<bool, AuthorizationError> {
        Ok(self
            .enforcer
            .add_policy(subject, &input.as_access_request())
            .await?)
    }

    pub async fn remove_policy(
        &self,
        subject: &str,
        input: &PermissionInput,
    ) -> Result<bool, AuthorizationError> {
        Ok(self
            .enforcer
            .remove_policy(subject, &input.as_access_request())
            .await?)
    }

    pub async fn add_grouping_policy(
        &self,
        subject: &str,
        binding: &RoleBinding,
    ) -> Result<bool, AuthorizationError> {
        Ok(self
            .enforcer
            .add_grouping_policy(binding.as_grouping(subject))
            .await?)
    }

    pub async fn remove_grouping_policy(
        &self,
        subject: &str,
        binding: &RoleBinding,
    ) -> Result<bool, AuthorizationError> {
        Ok(self
            .enforcer
            .remove_grouping_policy(&binding.as_grouping(subject))
            .await?)
    }
}
