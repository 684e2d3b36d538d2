use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const AUTHZ_TAG: &str = "Authorization API";
pub(crate) const POLICY_TAG: &str = "Policy API";

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = AUTHZ_TAG, description = "Authorization decision endpoints"),
        (name = POLICY_TAG, description = "Policy management endpoints"),
    ),
    info(
        title = "Authorization Service API",
        description = "Permission checks, policy management and OAuth token storage",
        version = "1.0.0"
    )
)]
pub(crate) struct ApiDoc;
