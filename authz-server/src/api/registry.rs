use crate::openapi::AUTHZ_TAG;
use crate::registry::default_roles;
use crate::state::AppState;
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

/// Lists every permission the system defines
#[utoipa::path(
    get,
    path = "/authz/permissions",
    tag = AUTHZ_TAG,
    responses(
        (status = 200, description = "The full permission catalog")
    )
)]
async fn list_permissions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.all().to_vec())
}

/// Lists the default roles and the permissions they carry
#[utoipa::path(
    get,
    path = "/authz/roles",
    tag = AUTHZ_TAG,
    responses(
        (status = 200, description = "The built-in roles")
    )
)]
async fn list_roles(State(state): State<AppState>) -> impl IntoResponse {
    Json(default_roles(&state.registry))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/authz/permissions", get(list_permissions))
        .route("/authz/roles", get(list_roles))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestFixture;

    #[tokio::test]
    async fn permissions_catalog_is_served() {
        let fixture = TestFixture::new().await;
        let resp = fixture.get("/authz/permissions").await;
        resp.assert_ok();

        let permissions = resp.json.as_array().unwrap();
        assert_eq!(permissions.len(), fixture.state.registry.all().len());
        assert!(permissions
            .iter()
            .any(|p| p["scope"] == "facility.read"));
    }

    #[tokio::test]
    async fn default_roles_are_served() {
        let fixture = TestFixture::new().await;
        let resp = fixture.get("/authz/roles").await;
        resp.assert_ok();

        let roles = resp.json.as_array().unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["Default Admin", "Default Client", "Default Caregiver"]);
    }
}
