//! Operation submission and status routes.
//!
//! ## Routes
//!
//! - `POST /operations` - Submit an operation for asynchronous processing
//! - `GET  /operations/{correlationId}` - Poll an operation's status
//!
//! Submission always returns 202 with a polling hint; the outcome is only
//! ever observable through the status route.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use causeway_core::CorrelationId;
use causeway_relay::StatusReport;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Request to submit an operation.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOperationRequest {
    /// The message to process.
    pub message: String,
    /// Correlation id to track the operation under. Minted when absent.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Polling guidance returned with a submission receipt.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollingHint {
    /// URL to poll for the outcome.
    pub status_url: String,
    /// Suggested initial poll interval in milliseconds.
    pub interval_ms: u64,
}

/// Submission receipt.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOperationResponse {
    /// Correlation id the operation is tracked under.
    pub correlation_id: String,
    /// Always `processing`; the outcome arrives via polling.
    pub status: String,
    /// Where and how often to poll.
    pub polling_hint: PollingHint,
}

/// Status of an operation, tagged by lifecycle state.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationStatusResponse {
    /// Still in flight.
    #[serde(rename_all = "camelCase")]
    Pending {
        /// Correlation id.
        correlation_id: String,
        /// Milliseconds since submission.
        elapsed_ms: u64,
    },
    /// The worker produced a result.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Correlation id.
        correlation_id: String,
        /// The result payload.
        result: Value,
    },
    /// The operation failed terminally.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Correlation id.
        correlation_id: String,
        /// The stored failure message.
        error: String,
    },
    /// No operation under this id.
    #[serde(rename_all = "camelCase")]
    NotFound {
        /// Correlation id.
        correlation_id: String,
    },
    /// The operation aged out and was deleted.
    #[serde(rename_all = "camelCase")]
    Expired {
        /// Correlation id.
        correlation_id: String,
    },
}

/// Creates operation routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/operations", post(submit_operation))
        .route("/operations/:correlation_id", get(get_operation_status))
}

/// Submit an operation.
///
/// POST /api/v1/operations
#[utoipa::path(
    post,
    path = "/api/v1/operations",
    tag = "operations",
    request_body = SubmitOperationRequest,
    responses(
        (status = 202, description = "Operation accepted", body = SubmitOperationResponse),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    ),
)]
pub(crate) async fn submit_operation(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitOperationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let correlation_id = match req.correlation_id.as_deref() {
        Some(raw) => raw
            .parse::<CorrelationId>()
            .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?,
        None => CorrelationId::generate(),
    };

    tracing::info!(
        correlation_id = %correlation_id,
        request_id = %ctx.request_id,
        "Submitting operation"
    );

    let receipt = state
        .relay()
        .submit(correlation_id, &req.message)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    let response = SubmitOperationResponse {
        correlation_id: receipt.correlation_id.to_string(),
        status: "processing".to_string(),
        polling_hint: PollingHint {
            status_url: receipt.status_url,
            interval_ms: receipt.poll_interval_ms,
        },
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Poll an operation's status.
///
/// GET /api/v1/operations/{correlationId}
#[utoipa::path(
    get,
    path = "/api/v1/operations/{correlationId}",
    tag = "operations",
    params(
        ("correlationId" = String, Path, description = "Correlation id of the operation"),
    ),
    responses(
        (status = 200, description = "Operation pending or completed", body = OperationStatusResponse),
        (status = 404, description = "Unknown operation", body = OperationStatusResponse),
        (status = 410, description = "Operation expired", body = OperationStatusResponse),
        (status = 500, description = "Operation failed", body = OperationStatusResponse),
    ),
)]
pub(crate) async fn get_operation_status(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(correlation_id): Path<String>,
) -> Result<Response, ApiError> {
    // A malformed id can never name a stored operation, so it reads as absent
    // rather than a validation failure.
    let Ok(id) = correlation_id.parse::<CorrelationId>() else {
        return Ok(status_response(
            StatusCode::NOT_FOUND,
            OperationStatusResponse::NotFound { correlation_id },
        ));
    };

    let report = state
        .relay()
        .status(&id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    let correlation_id = id.to_string();
    let response = match report {
        StatusReport::Pending { elapsed_ms } => status_response(
            StatusCode::OK,
            OperationStatusResponse::Pending {
                correlation_id,
                elapsed_ms,
            },
        ),
        StatusReport::Completed { result } => status_response(
            StatusCode::OK,
            OperationStatusResponse::Completed {
                correlation_id,
                result,
            },
        ),
        StatusReport::Failed { error } => status_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            OperationStatusResponse::Error {
                correlation_id,
                error,
            },
        ),
        StatusReport::NotFound => status_response(
            StatusCode::NOT_FOUND,
            OperationStatusResponse::NotFound { correlation_id },
        ),
        StatusReport::Expired => status_response(
            StatusCode::GONE,
            OperationStatusResponse::Expired { correlation_id },
        ),
    };
    Ok(response)
}

fn status_response(status: StatusCode, body: OperationStatusResponse) -> Response {
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_body_is_tagged_snake_case() {
        let body = OperationStatusResponse::Pending {
            correlation_id: "conv-1".to_string(),
            elapsed_ms: 1500,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["correlationId"], "conv-1");
        assert_eq!(value["elapsedMs"], 1500);
    }

    #[test]
    fn completed_body_carries_result() {
        let body = OperationStatusResponse::Completed {
            correlation_id: "conv-1".to_string(),
            result: json!("Hello"),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["result"], "Hello");
    }

    #[test]
    fn error_body_serves_message_under_error_key() {
        let body = OperationStatusResponse::Error {
            correlation_id: "conv-1".to_string(),
            error: "worker gave up".to_string(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "worker gave up");
        assert!(value.get("errorMessage").is_none());
    }
}
