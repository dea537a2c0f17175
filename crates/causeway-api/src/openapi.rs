//! `OpenAPI` (3.1) specification generation for `causeway-api`.
//!
//! The generated spec is used to build external clients and to detect
//! breaking API changes in CI.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the Causeway REST API (`/api/v1/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Causeway API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Asynchronous operation relay with polling-based status retrieval"
    ),
    paths(
        crate::routes::operations::submit_operation,
        crate::routes::operations::get_operation_status,
        crate::routes::callbacks::complete_operation,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::operations::SubmitOperationRequest,
            crate::routes::operations::SubmitOperationResponse,
            crate::routes::operations::PollingHint,
            crate::routes::operations::OperationStatusResponse,
            crate::routes::callbacks::CompleteOperationRequest,
            crate::routes::callbacks::CompleteOperationResponse,
        )
    ),
    tags(
        (name = "operations", description = "Operation submission and status polling"),
        (name = "callbacks", description = "Worker completion callbacks"),
    ),
)]
pub struct ApiDoc;

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Returns the generated `OpenAPI` spec serialized as pretty JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen).
pub fn openapi_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_includes_all_operation_paths() {
        let spec = openapi_json().unwrap();
        assert!(spec.contains("/api/v1/operations"));
        assert!(spec.contains("/api/v1/operations/{correlationId}"));
        assert!(spec.contains("/api/v1/operations/{correlationId}/complete"));
    }
}
