//! HTTP dispatcher for the external worker.
//!
//! The worker contract comes in two shapes:
//!
//! - **Accept mode**: the worker returns 2xx immediately and later posts the
//!   outcome to the callback URL. The per-call timeout is short since the
//!   worker does no real work before responding.
//! - **Inline mode**: the worker performs the work during the call and returns
//!   the outcome in the response body. The per-call timeout is long enough to
//!   cover the work itself; no callback ever arrives.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{DispatchOutcome, WorkerDispatchRequest, WorkerDispatcher};
use crate::error::{Error, Result};
use crate::op::CompletionUpdate;

const ACCEPT_MODE_TIMEOUT: Duration = Duration::from_secs(10);
const INLINE_MODE_TIMEOUT: Duration = Duration::from_secs(55);

/// How the worker resolves dispatched operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Worker acknowledges and calls back out of band.
    Accept,
    /// Worker resolves the operation in the dispatch response.
    Inline,
}

impl DispatchMode {
    /// The default per-call timeout for this mode.
    #[must_use]
    pub const fn default_timeout(self) -> Duration {
        match self {
            Self::Accept => ACCEPT_MODE_TIMEOUT,
            Self::Inline => INLINE_MODE_TIMEOUT,
        }
    }
}

/// Outcome body returned by an inline-mode worker.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineWorkerResponse {
    result: Option<Value>,
    error_message: Option<String>,
}

/// Dispatches operations to the worker over HTTP.
pub struct HttpDispatcher {
    client: reqwest::Client,
    worker_url: String,
    mode: DispatchMode,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("worker_url", &self.worker_url)
            .field("mode", &self.mode)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpDispatcher {
    /// Creates a dispatcher with the default timeout for `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(worker_url: impl Into<String>, mode: DispatchMode) -> Result<Self> {
        Self::with_timeout(worker_url, mode, mode.default_timeout())
    }

    /// Creates a dispatcher with an explicit per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker URL does not parse or the HTTP client
    /// cannot be built.
    pub fn with_timeout(
        worker_url: impl Into<String>,
        mode: DispatchMode,
        timeout: Duration,
    ) -> Result<Self> {
        let worker_url = worker_url.into();
        reqwest::Url::parse(&worker_url)
            .map_err(|e| Error::dispatch(format!("invalid worker URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::dispatch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            worker_url,
            mode,
            api_key: None,
        })
    }

    /// Attaches an API key sent as `x-api-key` on every dispatch.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn inline_outcome(body: &[u8]) -> DispatchOutcome {
        let parsed: InlineWorkerResponse = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return DispatchOutcome::Failed {
                    message: format!("worker returned an unparseable inline response: {e}"),
                    retryable: false,
                }
            }
        };

        match (parsed.result, parsed.error_message) {
            (Some(result), None) => DispatchOutcome::Resolved(CompletionUpdate::Success { result }),
            (None, Some(message)) => {
                DispatchOutcome::Resolved(CompletionUpdate::Failure { message })
            }
            (Some(result), Some(_)) => {
                // Result wins when the worker sends both.
                DispatchOutcome::Resolved(CompletionUpdate::Success { result })
            }
            (None, None) => DispatchOutcome::Failed {
                message: "worker inline response carried neither result nor errorMessage"
                    .to_string(),
                retryable: false,
            },
        }
    }
}

#[async_trait]
impl WorkerDispatcher for HttpDispatcher {
    async fn dispatch(&self, request: &WorkerDispatchRequest) -> DispatchOutcome {
        let mut http_request = self.client.post(&self.worker_url).json(request);
        if let Some(api_key) = self.api_key.as_deref() {
            http_request = http_request.header("x-api-key", api_key);
        }

        let response = match http_request.send().await {
            Ok(response) => response,
            Err(err) => {
                // Timeouts fail fast: the TTL covers slow workers, a second
                // equally long attempt only delays the stored error.
                if err.is_timeout() {
                    return DispatchOutcome::Failed {
                        message: format!("worker request timed out: {err}"),
                        retryable: false,
                    };
                }
                return DispatchOutcome::Failed {
                    message: format!("worker request failed: {err}"),
                    retryable: err.is_connect() || err.is_request(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let retryable = status.as_u16() == 429 || status.is_server_error();
            return DispatchOutcome::Failed {
                message: format!("worker rejected dispatch (status={status}): {body}"),
                retryable,
            };
        }

        match self.mode {
            DispatchMode::Accept => {
                debug!(
                    correlation_id = %request.correlation_id,
                    "worker accepted dispatch"
                );
                DispatchOutcome::Accepted
            }
            DispatchMode::Inline => {
                let body = match response.bytes().await {
                    Ok(body) => body,
                    Err(e) => {
                        return DispatchOutcome::Failed {
                            message: format!("failed to read worker inline response: {e}"),
                            retryable: false,
                        }
                    }
                };
                Self::inline_outcome(&body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_invalid_worker_url() {
        let result = HttpDispatcher::new("not a url", DispatchMode::Accept);
        assert!(result.is_err());
    }

    #[test]
    fn mode_timeouts_differ() {
        assert_eq!(DispatchMode::Accept.default_timeout(), ACCEPT_MODE_TIMEOUT);
        assert_eq!(DispatchMode::Inline.default_timeout(), INLINE_MODE_TIMEOUT);
        assert!(INLINE_MODE_TIMEOUT > ACCEPT_MODE_TIMEOUT);
    }

    #[test]
    fn debug_redacts_api_key() {
        let dispatcher = HttpDispatcher::new("http://localhost:9000/work", DispatchMode::Accept)
            .unwrap()
            .with_api_key("secret-key");
        let debug = format!("{dispatcher:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn inline_outcome_success() {
        let body = serde_json::to_vec(&json!({"result": "Hello"})).unwrap();
        let outcome = HttpDispatcher::inline_outcome(&body);
        assert_eq!(
            outcome,
            DispatchOutcome::Resolved(CompletionUpdate::Success {
                result: json!("Hello"),
            })
        );
    }

    #[test]
    fn inline_outcome_failure() {
        let body = serde_json::to_vec(&json!({"errorMessage": "model unavailable"})).unwrap();
        let outcome = HttpDispatcher::inline_outcome(&body);
        assert_eq!(
            outcome,
            DispatchOutcome::Resolved(CompletionUpdate::Failure {
                message: "model unavailable".to_string(),
            })
        );
    }

    #[test]
    fn inline_outcome_empty_body_is_non_retryable_failure() {
        let body = serde_json::to_vec(&json!({})).unwrap();
        let outcome = HttpDispatcher::inline_outcome(&body);
        assert!(matches!(
            outcome,
            DispatchOutcome::Failed {
                retryable: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_retryable() {
        let dispatcher = HttpDispatcher::new("http://127.0.0.1:1/work", DispatchMode::Accept)
            .unwrap();
        let request = WorkerDispatchRequest {
            correlation_id: "conv-1".to_string(),
            message: "hello".to_string(),
            callback_url: "http://localhost:8080/api/v1/operations/conv-1/complete".to_string(),
            submitted_at: chrono::Utc::now(),
        };

        let outcome = dispatcher.dispatch(&request).await;
        assert!(outcome.is_retryable(), "got {outcome:?}");
    }
}
