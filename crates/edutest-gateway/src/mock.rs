//! Mock gateway for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use edutest_core::error::GatewayError;
use edutest_core::model::{AnswerKey, Test, TestId};
use edutest_core::traits::TestGateway;

/// An in-memory gateway for exercising sessions without a server.
///
/// Tests can be given an artificial delay or a failure.
#[derive(Default)]
pub struct MockGateway {
    tests: HashMap<TestId, Test>,
    keys: HashMap<TestId, AnswerKey>,
    delays: HashMap<TestId, Duration>,
    failures: HashMap<TestId, String>,
    /// Number of `fetch_test` calls made.
    call_count: AtomicU32,
    /// Id of the last test requested.
    last_requested: Mutex<Option<TestId>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that serves exactly one test.
    pub fn with_test(test: Test) -> Self {
        Self::new().add_test(test)
    }

    pub fn add_test(mut self, test: Test) -> Self {
        self.tests.insert(test.id, test);
        self
    }

    pub fn add_answer_key(mut self, id: TestId, key: AnswerKey) -> Self {
        self.keys.insert(id, key);
        self
    }

    /// Delay responses for `id` by `delay`.
    pub fn add_delay(mut self, id: TestId, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    /// Fail requests for `id` with a network error carrying `message`.
    pub fn add_failure(mut self, id: TestId, message: &str) -> Self {
        self.failures.insert(id, message.to_string());
        self
    }

    /// Get the number of fetches made to this gateway.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the id of the last test requested.
    pub fn last_requested(&self) -> Option<TestId> {
        *self
            .last_requested
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl TestGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_test(&self, id: TestId) -> anyhow::Result<Test> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_requested
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(id);

        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(&id) {
            return Err(GatewayError::NetworkError(message.clone()).into());
        }

        self.tests
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id).into())
    }

    async fn fetch_answer_key(&self, id: TestId) -> anyhow::Result<Option<AnswerKey>> {
        Ok(self.keys.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use edutest_core::model::{Question, QuestionOption};

    fn make_test(id: TestId) -> Test {
        Test {
            id,
            author_id: 1,
            author_name: "mock".into(),
            subject_id: 1,
            group_ids: vec![],
            title: format!("test {id}"),
            start_time: Utc::now(),
            end_time: Utc::now(),
            created_at: Utc::now(),
            questions: vec![Question {
                id: 1,
                text: "q".into(),
                options: vec![
                    QuestionOption {
                        id: 10,
                        text: "a".into(),
                        is_correct: true,
                    },
                    QuestionOption {
                        id: 11,
                        text: "b".into(),
                        is_correct: false,
                    },
                ],
            }],
        }
    }

    #[tokio::test]
    async fn serves_known_tests() {
        let gateway = MockGateway::with_test(make_test(4));
        let test = gateway.fetch_test(4).await.unwrap();
        assert_eq!(test.title, "test 4");
        assert_eq!(gateway.call_count(), 1);
        assert_eq!(gateway.last_requested(), Some(4));
    }

    #[tokio::test]
    async fn unknown_test_is_not_found() {
        let gateway = MockGateway::new();
        let err = gateway.fetch_test(8).await.unwrap_err();
        assert_eq!(err.to_string(), "test 8 not found");
    }

    #[tokio::test]
    async fn injected_failure() {
        let gateway = MockGateway::with_test(make_test(4)).add_failure(4, "connection reset");
        let err = gateway.fetch_test(4).await.unwrap_err();
        assert_eq!(err.to_string(), "network error: connection reset");
    }

    #[tokio::test(start_paused = true)]
    async fn injected_delay() {
        let gateway = MockGateway::with_test(make_test(4)).add_delay(4, Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        gateway.fetch_test(4).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
