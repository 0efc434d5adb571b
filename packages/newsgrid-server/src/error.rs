//! Top-level error types for the server crate.

use newsgrid_core::FailureReason;

/// Errors surfaced by the HTTP trigger API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("run {0} not found")]
    RunNotFound(String),

    #[error("a run is already active for this target date")]
    RunAlreadyActive,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        use axum::Json;

        let status = match &self {
            ApiError::RunNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RunAlreadyActive => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Errors raised while fetching a single feed entry's source page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("domain circuit breaker is open for {domain}")]
    CircuitOpen { domain: String },

    #[error("refused to fetch blocked address: {0}")]
    Ssrf(String),

    #[error("http error {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors raised by a single job's processing pipeline, carrying the
/// [`FailureReason`] used for job bookkeeping.
#[derive(Debug, thiserror::Error)]
#[error("job failed: {reason:?}: {message}")]
pub struct JobError {
    pub reason: FailureReason,
    pub message: String,
}

impl JobError {
    #[must_use]
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl From<FetchError> for JobError {
    fn from(err: FetchError) -> Self {
        let reason = match &err {
            FetchError::Timeout { .. } => FailureReason::FetchTimeout,
            FetchError::CircuitOpen { .. } | FetchError::Ssrf(_) => FailureReason::FetchBlocked,
            FetchError::HttpStatus { .. } | FetchError::Transport { .. } => {
                FailureReason::FetchError
            }
        };
        JobError::new(reason, err.to_string())
    }
}
