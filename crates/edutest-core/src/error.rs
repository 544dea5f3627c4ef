//! Gateway error types.
//!
//! These represent failures when fetching test definitions. Defined in
//! `edutest-core` so the session controller and the CLI can downcast and
//! classify errors without string matching.

use thiserror::Error;

use crate::model::TestId;

/// Errors that can occur when talking to a test gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No test with this id exists.
    #[error("test {0} not found")]
    NotFound(TestId),

    /// Credentials were rejected and could not be refreshed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Returns `true` if retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            GatewayError::NotFound(_)
                | GatewayError::AuthenticationFailed(_)
                | GatewayError::InvalidResponse(_)
        )
    }

    /// Classify an `anyhow` error returned through the gateway trait.
    pub fn classify(err: &anyhow::Error) -> Option<&GatewayError> {
        err.downcast_ref::<GatewayError>()
    }
}
