pub mod allowed;
pub mod policies;

use crate::state::AppState;
use axum::routing::post;
use axum::Router;

/// Combines all authorization-related routes into a single router
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/authz/allowed", post(allowed::allowed_handler))
        .route(
            "/authz/is-authorized",
            post(allowed::is_authorized_handler),
        )
        .route(
            "/authz/policies",
            post(policies::add_policy_handler).delete(policies::remove_policy_handler),
        )
        .route(
            "/authz/role-bindings",
            post(policies::add_role_binding_handler)
                .delete(policies::remove_role_binding_handler),
        )
}
