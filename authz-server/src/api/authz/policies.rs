use crate::authz::{PermissionInput, RoleBinding};
use crate::errors::ApiError;
use crate::openapi::POLICY_TAG;
use crate::state::AppState;
use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Grants or revokes a single policy for a subject
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct PolicyMutation {
    /// Subject the policy applies to: a user id or a role name
    pub subject: String,
    pub organization_id: String,
    pub program_id: String,
    pub object: String,
    pub action: String,
}

/// Binds or unbinds a subject to a role
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct RoleBindingMutation {
    /// Subject being bound, typically a user id
    pub subject: String,
    pub organization_id: String,
    pub program_id: String,
    pub role: String,
}

/// Response for policy mutations
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct MutationResult {
    /// Whether the policy set changed; false means the mutation was a
    /// no-op
    pub changed: bool,
}

impl PolicyMutation {
    fn input(&self) -> PermissionInput {
        PermissionInput {
            organization_id: self.organization_id.clone(),
            program_id: self.program_id.clone(),
            object: self.object.clone(),
            action: self.action.clone(),
        }
    }
}

impl RoleBindingMutation {
    fn binding(&self) -> RoleBinding {
        RoleBinding {
            organization_id: self.organization_id.clone(),
            program_id: self.program_id.clone(),
            role: self.role.clone(),
        }
    }
}

fn mutation_response(result: Result<bool, crate::authz::AuthorizationError>) -> Response {
    match result {
        Ok(changed) => (StatusCode::OK, Json(MutationResult { changed })).into_response(),
        Err(err) => {
            log::error!("Policy mutation failed: {}", err);
            ApiError::from(err).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/authz/policies",
    tag = POLICY_TAG,
    request_body = PolicyMutation,
    responses(
        (status = 200, description = "Policy added", body = MutationResult),
        (status = 422, description = "Invalid request payload"),
        (status = 500, description = "Internal server error")
    )
)]
pub(super) async fn add_policy_handler(
    State(state): State<AppState>,
    Json(mutation): Json<PolicyMutation>,
) -> Response {
    mutation_response(
        state
            .authorization
            .add_policy(&mutation.subject, &mutation.input())
            .await,
    )
}

#[utoipa::path(
    delete,
    path = "/authz/policies",
    tag = POLICY_TAG,
    request_body = PolicyMutation,
    responses(
        (status = 200, description = "Policy removed", body = MutationResult),
        (status = 422, description = "Invalid request payload"),
        (status = 500, description = "Internal server error")
    )
)]
pub(super) async fn remove_policy_handler(
    State(state): State<AppState>,
    Json(mutation): Json<PolicyMutation>,
) -> Response {
    mutation_response(
        state
            .authorization
            .remove_policy(&mutation.subject, &mutation.input())
            .await,
    )
}

#[utoipa::path(
    post,
    path = "/authz/role-bindings",
    tag = POLICY_TAG,
    request_body = RoleBindingMutation,
    responses(
        (status = 200, description = "Role binding added", body = MutationResult),
        (status = 422, description = "Invalid request payload"),
        (status = 500, description = "Internal server error")
    )
)]
pub(super) async fn add_role_binding_handler(
    State(state): State<AppState>,
    Json(mutation): Json<RoleBindingMutation>,
) -> Response {
    mutation_response(
        state
            .authorization
            .add_grouping_policy(&mutation.subject, &mutation.binding())
            .await,
    )
}

#[utoipa::path(
    delete,
    path = "/authz/role-bindings",
    tag = POLICY_TAG,
    request_body = RoleBindingMutation,
    responses(
        (status = 200, description = "Role binding removed", body = MutationResult),
        (status = 422, description = "Invalid request payload"),
        (status = 500, description = "Internal server error")
    )
)]
pub(super) async fn remove_role_binding_handler(
    State(state): State<AppState>,
    Json(mutation): Json<RoleBindingMutation>,
) -> Response {
    mutation_response(
        state
            .authorization
            .remove_grouping_policy(&mutation.subject, &mutation.binding())
            .await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::authz::allowed::{AllowedQuery, AllowedResult};
    use crate::test_utils::TestFixture;

    fn policy(subject: &str) -> PolicyMutation {
        PolicyMutation {
            subject: subject.to_string(),
            organization_id: "org-1".to_string(),
            program_id: "prog-1".to_string(),
            object: "facility".to_string(),
            action: "facility.read".to_string(),
        }
    }

    fn allowed_query(subject: &str) -> AllowedQuery {
        AllowedQuery {
            subject: subject.to_string(),
            organization_id: "org-1".to_string(),
            program_id: "prog-1".to_string(),
            object: "facility".to_string(),
            action: "facility.read".to_string(),
        }
    }

    #[tokio::test]
    async fn policy_lifecycle_over_http() {
        let fixture = TestFixture::new().await;
        let mutation = policy("user-1");

        let resp = fixture.post("/authz/policies", &mutation).await;
        assert!(resp.assert_ok().json_as::<MutationResult>().changed);

        // Re-adding is a no-op.
        let resp = fixture.post("/authz/policies", &mutation).await;
        assert!(!resp.assert_ok().json_as::<MutationResult>().changed);

        let resp = fixture.post("/authz/allowed", &allowed_query("user-1")).await;
        assert!(resp.assert_ok().json_as::<AllowedResult>().allow);

        let resp = fixture.delete("/authz/policies", &mutation).await;
        assert!(resp.assert_ok().json_as::<MutationResult>().changed);

        let resp = fixture.post("/authz/allowed", &allowed_query("user-1")).await;
        assert!(!resp.assert_ok().json_as::<AllowedResult>().allow);
    }

    #[tokio::test]
    async fn role_bindings_grant_role_policies() {
        let fixture = TestFixture::new().await;

        fixture
            .post("/authz/policies", &policy("Default Admin"))
            .await
            .assert_ok();

        let binding = RoleBindingMutation {
            subject: "user-1".to_string(),
            organization_id: "org-1".to_string(),
            program_id: "prog-1".to_string(),
            role: "Default Admin".to_string(),
        };
        let resp = fixture.post("/authz/role-bindings", &binding).await;
        assert!(resp.assert_ok().json_as::<MutationResult>().changed);

        let resp = fixture.post("/authz/allowed", &allowed_query("user-1")).await;
        assert!(resp.assert_ok().json_as::<AllowedResult>().allow);

        let resp = fixture.delete("/authz/role-bindings", &binding).await;
        assert!(resp.assert_ok().json_as::<MutationResult>().changed);

        let resp = fixture.post("/authz/allowed", &allowed_query("user-1")).await;
        assert!(!resp.assert_ok().json_as::<AllowedResult>().allow);
    }
}
