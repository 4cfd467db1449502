//! Target endpoint client
//!
//! The engine talks to exactly one endpoint shape: `POST` with the JSON
//! payload body, plus preliminary bootstrap posts that establish a session.
//! Only the response status code is interpreted; the body is ignored except
//! for the optional seed-length hint in a bootstrap response.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::headers;
use crate::payload::Payload;
use crate::session::SessionHandle;

/// Interpretation of a submission response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 200: the target recorded the submission
    Accepted,
    /// The configured blocked status: anti-abuse rejection, worth a retry
    Blocked,
    /// Any other status: terminal failure for this attempt
    Rejected(u16),
}

/// Transport-level errors from the target
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// Connection or protocol failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Bootstrap returned a status that did not establish a session
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
}

impl TargetError {
    /// Whether the retry loop should treat this like a blocked response
    pub fn is_retryable(&self) -> bool {
        matches!(self, TargetError::Http(_) | TargetError::Timeout(_))
    }
}

/// Client for the single target endpoint
///
/// The worker only sees this trait; production wiring uses [`HttpTarget`]
/// and tests substitute a scripted mock.
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// Send one payload through a session, returning the interpreted status
    async fn submit(
        &self,
        payload: &Payload,
        session: &SessionHandle,
    ) -> Result<SubmitOutcome, TargetError>;

    /// Run the preliminary request(s) that establish a session server-side
    ///
    /// May return a seed length the server prefers for this session.
    async fn bootstrap(&self, session: &SessionHandle) -> Result<Option<usize>, TargetError>;
}

/// Optional hint in a bootstrap response body
#[derive(Debug, Deserialize)]
struct BootstrapReply {
    #[serde(default)]
    seed_length: Option<usize>,
}

/// reqwest-backed [`TargetClient`]
pub struct HttpTarget {
    client: reqwest::Client,
    endpoint: String,
    origin: String,
    blocked_status: u16,
    bootstrap_code: u32,
    timeout: Duration,
}

impl HttpTarget {
    /// Create a target client
    ///
    /// `origin` is used for the Origin/Referer headers so submissions look
    /// like they came from the target's own page.
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        origin: impl Into<String>,
        blocked_status: u16,
        bootstrap_code: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            origin: origin.into(),
            blocked_status,
            bootstrap_code,
            timeout,
        }
    }

    fn interpret(&self, status: u16) -> SubmitOutcome {
        if status == 200 {
            SubmitOutcome::Accepted
        } else if status == self.blocked_status {
            SubmitOutcome::Blocked
        } else {
            SubmitOutcome::Rejected(status)
        }
    }

    async fn post(
        &self,
        payload: &Payload,
        session: &SessionHandle,
    ) -> Result<reqwest::Response, TargetError> {
        let mut headers = headers::session_headers(session, &self.origin);
        headers.insert(
            "Content-Type",
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        self.client
            .post(&self.endpoint)
            .headers(headers)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TargetError::Timeout(self.timeout)
                } else {
                    TargetError::Http(e)
                }
            })
    }
}

#[async_trait]
impl TargetClient for HttpTarget {
    async fn submit(
        &self,
        payload: &Payload,
        session: &SessionHandle,
    ) -> Result<SubmitOutcome, TargetError> {
        let response = self.post(payload, session).await?;
        Ok(self.interpret(response.status().as_u16()))
    }

    async fn bootstrap(&self, session: &SessionHandle) -> Result<Option<usize>, TargetError> {
        let payload = Payload::bootstrap(self.bootstrap_code);
        let response = self.post(&payload, session).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TargetError::UnexpectedStatus(status.as_u16()));
        }

        // The hint is optional and most deployments omit it
        let reply: Option<BootstrapReply> = response.json().await.ok();
        Ok(reply.and_then(|r| r.seed_length))
    }
}

impl std::fmt::Debug for HttpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTarget")
            .field("endpoint", &self.endpoint)
            .field("blocked_status", &self.blocked_status)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(blocked: u16) -> HttpTarget {
        HttpTarget::new(
            reqwest::Client::new(),
            "https://example.test/api",
            "https://example.test",
            blocked,
            1,
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_interpret_canonical_rule() {
        let t = target(403);
        assert_eq!(t.interpret(200), SubmitOutcome::Accepted);
        assert_eq!(t.interpret(403), SubmitOutcome::Blocked);
        assert_eq!(t.interpret(500), SubmitOutcome::Rejected(500));
        assert_eq!(t.interpret(201), SubmitOutcome::Rejected(201));
    }

    #[test]
    fn test_interpret_custom_blocked_status() {
        let t = target(429);
        assert_eq!(t.interpret(429), SubmitOutcome::Blocked);
        assert_eq!(t.interpret(403), SubmitOutcome::Rejected(403));
    }

    #[test]
    fn test_timeout_is_retryable_unexpected_status_is_not() {
        assert!(TargetError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!TargetError::UnexpectedStatus(500).is_retryable());
    }
}
