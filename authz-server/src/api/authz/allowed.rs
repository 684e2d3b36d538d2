use crate::authz::{PermissionInput, RequestContext};
use crate::errors::ApiError;
use crate::openapi::AUTHZ_TAG;
use crate::state::AppState;
use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Permission check for an explicitly named subject
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct AllowedQuery {
    /// Subject being checked: a user id or a role name
    pub subject: String,
    /// Organization the check is scoped to
    pub organization_id: String,
    /// Program the check is scoped to
    pub program_id: String,
    /// The resource being accessed
    pub object: String,
    /// The scoped action, e.g. "facility.read"
    pub action: String,
}

/// Response type for permission checks
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct AllowedResult {
    /// Whether the action is allowed
    pub allow: bool,
}

impl From<&AllowedQuery> for PermissionInput {
    fn from(query: &AllowedQuery) -> Self {
        PermissionInput {
            organization_id: query.organization_id.clone(),
            program_id: query.program_id.clone(),
            object: query.object.clone(),
            action: query.action.clone(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/authz/allowed",
    tag = AUTHZ_TAG,
    request_body = AllowedQuery,
    responses(
        (status = 200, description = "Permission check completed successfully", body = AllowedResult),
        (status = 422, description = "Invalid request payload"),
        (status = 500, description = "Internal server error")
    )
)]
pub(super) async fn allowed_handler(
    State(state): State<AppState>,
    Json(query): Json<AllowedQuery>,
) -> Response {
    match state
        .authorization
        .check_permissions(&query.subject, &PermissionInput::from(&query))
        .await
    {
        Ok(allow) => (StatusCode::OK, Json(AllowedResult { allow })).into_response(),
        Err(err) => {
            log::error!("Permission check failed: {}", err);
            ApiError::from(err).into_response()
        }
    }
}

/// Permission check for the logged-in user; scope comes from the user's
/// profile rather than the request body.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct IsAuthorizedQuery {
    /// The resource being accessed
    pub object: String,
    /// The scoped action, e.g. "facility.read"
    pub action: String,
}

#[utoipa::path(
    post,
    path = "/authz/is-authorized",
    tag = AUTHZ_TAG,
    request_body = IsAuthorizedQuery,
    params(
        ("x-user-id" = String, Header, description = "Id of the logged-in user"),
    ),
    responses(
        (status = 200, description = "Permission check completed successfully", body = AllowedResult),
        (status = 401, description = "No logged-in user"),
        (status = 404, description = "User profile not found"),
        (status = 422, description = "Invalid request payload"),
        (status = 500, description = "Internal server error")
    )
)]
pub(super) async fn is_authorized_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(query): Json<IsAuthorizedQuery>,
) -> Response {
    let ctx = request_context(&headers);
    let input = PermissionInput {
        organization_id: String::new(),
        program_id: String::new(),
        object: query.object,
        action: query.action,
    };

    match state.authorization.check_authorization(&ctx, &input).await {
        Ok(allow) => (StatusCode::OK, Json(AllowedResult { allow })).into_response(),
        Err(err) => {
            log::error!("Authorization check failed: {}", err);
            ApiError::from(err).into_response()
        }
    }
}

/// Builds the per-request identity from transport headers.
fn request_context(headers: &HeaderMap) -> RequestContext {
    RequestContext {
        user_id: headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::UserProfile;
    use crate::test_utils::TestFixture;

    fn query(subject: &str) -> AllowedQuery {
        AllowedQuery {
            subject: subject.to_string(),
            organization_id: "org-1".to_string(),
            program_id: "prog-1".to_string(),
            object: "facility".to_string(),
            action: "facility.read".to_string(),
        }
    }

    #[tokio::test]
    async fn allowed_is_false_without_policies() {
        let fixture = TestFixture::new().await;
        let resp = fixture.post("/authz/allowed", &query("user-1")).await;
        let result = resp.assert_ok().json_as::<AllowedResult>();
        assert!(!result.allow);
    }

    #[tokio::test]
    async fn allowed_reflects_granted_policies() {
        let fixture = TestFixture::new().await;
        let q = query("user-1");

        fixture
            .state
            .authorization
            .add_policy("user-1", &PermissionInput::from(&q))
            .await
            .unwrap();

        let resp = fixture.post("/authz/allowed", &q).await;
        let result = resp.assert_ok().json_as::<AllowedResult>();
        assert!(result.allow);
    }

    #[tokio::test]
    async fn is_authorized_without_identity_is_unauthorized() {
        let fixture = TestFixture::new().await;
        let q = IsAuthorizedQuery {
            object: "facility".to_string(),
            action: "facility.read".to_string(),
        };
        // Missing identity is an error, never a clean denial.
        let resp = fixture.post("/authz/is-authorized", &q).await;
        resp.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn is_authorized_with_unknown_user_is_not_found() {
        let fixture = TestFixture::new().await;
        let q = IsAuthorizedQuery {
            object: "facility".to_string(),
            action: "facility.read".to_string(),
        };
        let resp = fixture
            .post_with_headers("/authz/is-authorized", &q, &[("x-user-id", "ghost")])
            .await;
        resp.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn is_authorized_uses_the_profile_scope() {
        let fixture = TestFixture::new().await;
        fixture
            .store
            .add_user(UserProfile {
                id: "user-1".to_string(),
                organization_id: "org-1".to_string(),
                active_program_id: "prog-1".to_string(),
            })
            .await;
        fixture
            .state
            .authorization
            .add_policy("user-1", &PermissionInput::from(&query("user-1")))
            .await
            .unwrap();

        let q = IsAuthorizedQuery {
            object: "facility".to_string(),
            action: "facility.read".to_string(),
        };
        let resp = fixture
            .post_with_headers("/authz/is-authorized", &q, &[("x-user-id", "user-1")])
            .await;
        let result = resp.assert_ok().json_as::<AllowedResult>();
        assert!(result.allow);
    }
}
