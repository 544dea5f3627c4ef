//! The gateway seam through which test definitions are loaded.
//!
//! Implemented by the `edutest-gateway` crate (HTTP, local directory, mock).

use async_trait::async_trait;

use crate::model::{AnswerKey, Test, TestId};

/// Source of test definitions.
///
/// Failures are returned as [`GatewayError`](crate::error::GatewayError)
/// wrapped in `anyhow`, so callers can downcast for classification.
#[async_trait]
pub trait TestGateway: Send + Sync {
    /// Human-readable gateway name (e.g. "http").
    fn name(&self) -> &str;

    /// Fetch a fully populated test, including questions and options.
    async fn fetch_test(&self, id: TestId) -> anyhow::Result<Test>;

    /// Fetch the answer key from a trusted source, if one is published
    /// separately from the test payload.
    async fn fetch_answer_key(&self, id: TestId) -> anyhow::Result<Option<AnswerKey>> {
        let _ = id;
        Ok(None)
    }
}
