//! Worker completion callback route.
//!
//! ## Routes
//!
//! - `POST /operations/{correlationId}/complete` - Record a terminal outcome
//!
//! The worker posts here once per operation, out of band with respect to
//! client polling. Exactly one of `result` and `errorMessage` must be set.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use causeway_core::CorrelationId;
use causeway_relay::CompletionUpdate;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Terminal outcome reported by the worker.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOperationRequest {
    /// Result payload; mutually exclusive with `errorMessage`.
    #[serde(default)]
    pub result: Option<Value>,
    /// Failure message; mutually exclusive with `result`.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Acknowledgement of a recorded completion.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOperationResponse {
    /// Always true; failures are reported through error responses.
    pub success: bool,
    /// Correlation id of the completed operation.
    pub correlation_id: String,
    /// The stored terminal status (`completed` or `error`).
    pub status: String,
}

/// Creates callback routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/operations/:correlation_id/complete",
        post(complete_operation),
    )
}

fn completion_update(req: CompleteOperationRequest) -> Result<CompletionUpdate, ApiError> {
    match (req.result, req.error_message) {
        (Some(result), None) => Ok(CompletionUpdate::Success { result }),
        (None, Some(message)) => {
            let message = message.trim().to_string();
            if message.is_empty() {
                return Err(ApiError::validation("errorMessage must not be empty"));
            }
            Ok(CompletionUpdate::Failure { message })
        }
        (Some(_), Some(_)) => Err(ApiError::validation(
            "result and errorMessage are mutually exclusive",
        )),
        (None, None) => Err(ApiError::validation(
            "exactly one of result or errorMessage is required",
        )),
    }
}

/// Record an operation's terminal outcome.
///
/// POST /api/v1/operations/{correlationId}/complete
#[utoipa::path(
    post,
    path = "/api/v1/operations/{correlationId}/complete",
    tag = "callbacks",
    params(
        ("correlationId" = String, Path, description = "Correlation id of the operation"),
    ),
    request_body = CompleteOperationRequest,
    responses(
        (status = 200, description = "Completion recorded", body = CompleteOperationResponse),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 404, description = "Unknown operation", body = ApiErrorBody),
        (status = 410, description = "Operation expired", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    ),
)]
pub(crate) async fn complete_operation(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(correlation_id): Path<String>,
    Json(req): Json<CompleteOperationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = correlation_id
        .parse::<CorrelationId>()
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    let update = completion_update(req).map_err(|e| e.with_request_id(ctx.request_id.clone()))?;

    tracing::info!(
        correlation_id = %id,
        request_id = %ctx.request_id,
        status = %update.status(),
        "Recording worker completion"
    );

    let operation = state
        .relay()
        .complete(&id, update)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    Ok(Json(CompleteOperationResponse {
        success: true,
        correlation_id: operation.correlation_id.to_string(),
        status: operation.status.to_string(),
    }))
}
