//! The relay client: submission with retry and adaptive polling.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use causeway_core::CorrelationId;

use crate::error::{ClientError, Result};
use crate::schedule::PollSchedule;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SUBMIT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_SUBMIT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(180);
const DEFAULT_POLL_RETRY_LIMIT: u32 = 3;
const DEFAULT_POLL_RETRY_PAUSE: Duration = Duration::from_millis(250);

/// Receipt returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTicket {
    /// Correlation id to poll under.
    pub correlation_id: String,
    /// URL the relay suggests polling.
    pub status_url: String,
    /// Suggested initial poll interval in milliseconds.
    pub interval_ms: u64,
}

/// One observed status of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Still in flight.
    Pending {
        /// Milliseconds since submission, as reported by the relay.
        elapsed_ms: u64,
    },
    /// Settled with a result.
    Completed {
        /// The result payload.
        result: Value,
    },
    /// Settled with a failure.
    Failed {
        /// The stored failure message.
        message: String,
    },
    /// The relay does not know this operation.
    NotFound,
    /// The operation aged out.
    Expired,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequestBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponseBody {
    correlation_id: String,
    polling_hint: PollingHintBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollingHintBody {
    status_url: String,
    interval_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum StatusBody {
    #[serde(rename_all = "camelCase")]
    Pending { elapsed_ms: u64 },
    Completed { result: Value },
    Error { error: String },
    NotFound {},
    Expired {},
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Exponential backoff delay before submit attempt `attempt` (one-based;
/// the first retry waits the base delay).
fn submit_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Client for the Causeway relay API.
///
/// Submission retries transient failures with exponential backoff; polling
/// follows a [`PollSchedule`] under an overall deadline, riding out a bounded
/// number of transient transport failures without consuming schedule slots.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
    submit_max_attempts: u32,
    submit_backoff_base: Duration,
    schedule: PollSchedule,
    poll_deadline: Duration,
    poll_retry_limit: u32,
    poll_retry_pause: Duration,
}

/// Builder for [`RelayClient`].
#[derive(Debug)]
pub struct RelayClientBuilder {
    base_url: String,
    request_timeout: Duration,
    submit_max_attempts: u32,
    submit_backoff_base: Duration,
    schedule: PollSchedule,
    poll_deadline: Duration,
    poll_retry_limit: u32,
    poll_retry_pause: Duration,
}

impl RelayClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            submit_max_attempts: DEFAULT_SUBMIT_MAX_ATTEMPTS,
            submit_backoff_base: DEFAULT_SUBMIT_BACKOFF_BASE,
            schedule: PollSchedule::default(),
            poll_deadline: DEFAULT_POLL_DEADLINE,
            poll_retry_limit: DEFAULT_POLL_RETRY_LIMIT,
            poll_retry_pause: DEFAULT_POLL_RETRY_PAUSE,
        }
    }

    /// Sets the per-request HTTP timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum submission attempts, including the first.
    #[must_use]
    pub fn submit_max_attempts(mut self, attempts: u32) -> Self {
        self.submit_max_attempts = attempts.max(1);
        self
    }

    /// Sets the base delay for exponential submission backoff.
    #[must_use]
    pub fn submit_backoff_base(mut self, base: Duration) -> Self {
        self.submit_backoff_base = base;
        self
    }

    /// Sets the polling schedule.
    #[must_use]
    pub fn schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Sets the overall poll deadline per operation.
    #[must_use]
    pub fn poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll_deadline = deadline;
        self
    }

    /// Sets how many consecutive transport failures a poll session tolerates.
    #[must_use]
    pub fn poll_retry_limit(mut self, limit: u32) -> Self {
        self.poll_retry_limit = limit;
        self
    }

    /// Sets the pause between transient poll retries.
    #[must_use]
    pub fn poll_retry_pause(mut self, pause: Duration) -> Self {
        self.poll_retry_pause = pause;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<RelayClient> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| ClientError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(RelayClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            submit_max_attempts: self.submit_max_attempts,
            submit_backoff_base: self.submit_backoff_base,
            schedule: self.schedule,
            poll_deadline: self.poll_deadline,
            poll_retry_limit: self.poll_retry_limit,
            poll_retry_pause: self.poll_retry_pause,
        })
    }
}

impl RelayClient {
    /// Creates a builder targeting the given relay base URL.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> RelayClientBuilder {
        RelayClientBuilder::new(base_url)
    }

    /// Creates a client with defaults for the given relay base URL.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    fn submit_url(&self) -> String {
        format!("{}/api/v1/operations", self.base_url)
    }

    fn status_url(&self, correlation_id: &str) -> String {
        format!("{}/api/v1/operations/{correlation_id}", self.base_url)
    }

    /// Submits an operation, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidRequest`] when the relay rejects the payload
    /// - [`ClientError::SubmissionFailed`] after exhausting retries
    pub async fn submit(
        &self,
        message: &str,
        correlation_id: Option<&CorrelationId>,
    ) -> Result<SubmissionTicket> {
        let body = SubmitRequestBody {
            message,
            correlation_id: correlation_id.map(CorrelationId::as_str),
        };

        let mut attempt: u32 = 0;
        let failure = loop {
            attempt += 1;

            let transient = match self.client.post(self.submit_url()).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::ACCEPTED {
                        let receipt: SubmitResponseBody =
                            response.json().await.map_err(|e| {
                                ClientError::transport(format!(
                                    "failed to parse submission receipt: {e}"
                                ))
                            })?;
                        return Ok(SubmissionTicket {
                            correlation_id: receipt.correlation_id,
                            status_url: receipt.polling_hint.status_url,
                            interval_ms: receipt.polling_hint.interval_ms,
                        });
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        // The relay will reject identical retries the same way.
                        let message = serde_json::from_str::<ApiErrorBody>(&body_text)
                            .map_or(body_text, |parsed| parsed.message);
                        return Err(ClientError::InvalidRequest { message });
                    }
                    format!("relay returned {status}: {body_text}")
                }
                Err(err) => format!("request failed: {err}"),
            };

            if attempt >= self.submit_max_attempts {
                break transient;
            }
            let backoff = submit_backoff(self.submit_backoff_base, attempt);
            warn!(
                attempt,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                failure = %transient,
                "submission attempt failed, retrying"
            );
            tokio::time::sleep(backoff).await;
        };

        Err(ClientError::SubmissionFailed {
            attempts: attempt,
            message: failure,
        })
    }

    /// Fetches the current status of an operation once.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the relay cannot be reached or returns
    /// an unexpected response shape.
    pub async fn fetch_status(&self, correlation_id: &str) -> Result<PollStatus> {
        let response = self
            .client
            .get(self.status_url(correlation_id))
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("status request failed: {e}")))?;

        let status = response.status();
        if !matches!(
            status,
            StatusCode::OK
                | StatusCode::NOT_FOUND
                | StatusCode::GONE
                | StatusCode::INTERNAL_SERVER_ERROR
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::transport(format!(
                "unexpected status response ({status}): {body}"
            )));
        }

        let body: StatusBody = response
            .json()
            .await
            .map_err(|e| ClientError::transport(format!("failed to parse status body: {e}")))?;

        Ok(match body {
            StatusBody::Pending { elapsed_ms } => PollStatus::Pending { elapsed_ms },
            StatusBody::Completed { result } => PollStatus::Completed { result },
            StatusBody::Error { error } => PollStatus::Failed { message: error },
            StatusBody::NotFound {} => PollStatus::NotFound,
            StatusBody::Expired {} => PollStatus::Expired,
        })
    }

    /// Polls until the operation settles or the deadline elapses.
    ///
    /// Transient transport failures pause briefly and retry without
    /// consuming a schedule slot, up to the configured limit.
    ///
    /// # Errors
    ///
    /// - [`ClientError::OperationFailed`] when the operation settled in error
    /// - [`ClientError::NotFound`] / [`ClientError::Expired`] when the record
    ///   vanished out from under the poller
    /// - [`ClientError::DeadlineExceeded`] when the deadline elapses
    /// - [`ClientError::Transport`] after too many consecutive failures
    pub async fn poll_until_settled(&self, correlation_id: &str) -> Result<Value> {
        let started = Instant::now();
        let mut poll_index: u32 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.poll_deadline {
                return Err(ClientError::DeadlineExceeded {
                    waited_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
            }

            let delay = self.schedule.delay_for(poll_index);
            poll_index += 1;
            let remaining = self.poll_deadline.saturating_sub(elapsed);
            tokio::time::sleep(delay.min(remaining)).await;

            // One scheduled poll; transient failures pause and retry in place
            // rather than consuming another schedule slot.
            let status = loop {
                match self.fetch_status(correlation_id).await {
                    Ok(status) => {
                        consecutive_failures = 0;
                        break status;
                    }
                    Err(err) => {
                        consecutive_failures += 1;
                        if consecutive_failures > self.poll_retry_limit {
                            return Err(err);
                        }
                        let elapsed = started.elapsed();
                        if elapsed >= self.poll_deadline {
                            return Err(ClientError::DeadlineExceeded {
                                waited_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                            });
                        }
                        warn!(
                            correlation_id,
                            consecutive_failures,
                            error = %err,
                            "poll attempt failed, pausing before retry"
                        );
                        tokio::time::sleep(self.poll_retry_pause).await;
                    }
                }
            };

            match status {
                PollStatus::Completed { result } => return Ok(result),
                PollStatus::Failed { message } => {
                    return Err(ClientError::OperationFailed { message });
                }
                PollStatus::NotFound => {
                    return Err(ClientError::NotFound {
                        correlation_id: correlation_id.to_string(),
                    });
                }
                PollStatus::Expired => {
                    return Err(ClientError::Expired {
                        correlation_id: correlation_id.to_string(),
                    });
                }
                PollStatus::Pending { elapsed_ms } => {
                    debug!(correlation_id, elapsed_ms, poll_index, "operation pending");
                }
            }
        }
    }

    /// Submits an operation and polls until it settles.
    ///
    /// # Errors
    ///
    /// Propagates submission and polling errors unchanged.
    pub async fn submit_and_wait(
        &self,
        message: &str,
        correlation_id: Option<&CorrelationId>,
    ) -> Result<Value> {
        let ticket = self.submit(message, correlation_id).await?;
        self.poll_until_settled(&ticket.correlation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submit_backoff_doubles_per_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(submit_backoff(base, 1), Duration::from_secs(1));
        assert_eq!(submit_backoff(base, 2), Duration::from_secs(2));
        assert_eq!(submit_backoff(base, 3), Duration::from_secs(4));
    }

    #[test]
    fn status_body_parses_tagged_variants() {
        let pending: StatusBody =
            serde_json::from_value(json!({"status": "pending", "correlationId": "c", "elapsedMs": 42}))
                .unwrap();
        assert!(matches!(pending, StatusBody::Pending { elapsed_ms: 42 }));

        let completed: StatusBody =
            serde_json::from_value(json!({"status": "completed", "result": "Hello"})).unwrap();
        assert!(matches!(completed, StatusBody::Completed { .. }));

        let error: StatusBody =
            serde_json::from_value(json!({"status": "error", "error": "worker gave up"})).unwrap();
        assert!(matches!(error, StatusBody::Error { .. }));

        let missing: StatusBody =
            serde_json::from_value(json!({"status": "not_found", "correlationId": "c"})).unwrap();
        assert!(matches!(missing, StatusBody::NotFound {}));
    }

    #[test]
    fn submit_request_omits_absent_correlation_id() {
        let body = SubmitRequestBody {
            message: "Hello",
            correlation_id: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("correlationId").is_none());
    }

    #[tokio::test]
    async fn zero_deadline_exceeds_before_first_poll() {
        let client = RelayClient::builder("http://127.0.0.1:1")
            .poll_deadline(Duration::ZERO)
            .build()
            .unwrap();

        let err = client.poll_until_settled("conv-1").await.unwrap_err();
        assert!(matches!(err, ClientError::DeadlineExceeded { .. }));
    }

    #[tokio::test]
    async fn unreachable_relay_surfaces_transport_after_retries() {
        // Port 1 is never listening; every poll fails at the transport layer.
        let client = RelayClient::builder("http://127.0.0.1:1")
            .poll_retry_limit(1)
            .poll_retry_pause(Duration::from_millis(1))
            .poll_deadline(Duration::from_secs(5))
            .build()
            .unwrap();

        let err = client.poll_until_settled("conv-1").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_relay_fails_submission_after_attempts() {
        let client = RelayClient::builder("http://127.0.0.1:1")
            .submit_max_attempts(2)
            .submit_backoff_base(Duration::from_millis(1))
            .build()
            .unwrap();

        let err = client.submit("Hello", None).await.unwrap_err();
        let ClientError::SubmissionFailed { attempts, .. } = err else {
            panic!("expected SubmissionFailed, got {err:?}");
        };
        assert_eq!(attempts, 2);
    }
}
