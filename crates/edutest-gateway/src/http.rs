//! Portal REST API gateway.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;

use edutest_core::error::GatewayError;
use edutest_core::model::{AnswerKey, OptionId, QuestionId, Test, TestId};
use edutest_core::traits::TestGateway;

use crate::credentials::{Credentials, RefreshResponse};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway backed by the portal's REST API.
///
/// - `GET {base}/tests/{id}` returns the test.
/// - `GET {base}/tests/{id}/answer-key` returns the separately published key,
///   404 meaning there is none.
/// - `POST {base}/auth/refresh` renews an expired or rejected access token.
pub struct HttpGateway {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
    credentials: RwLock<Option<Credentials>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerKeyEntry {
    question_id: QuestionId,
    correct_option_id: OptionId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout_secs: Option<u64>) -> anyhow::Result<Self> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
            credentials: RwLock::new(None),
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = RwLock::new(Some(credentials));
        self
    }

    /// The credentials currently in use (after any refresh).
    pub async fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().await.clone()
    }

    /// GET `path`, renewing the access token first if it has lapsed and once
    /// more if the server rejects it.
    async fn get(&self, path: &str) -> Result<reqwest::Response, GatewayError> {
        let lapsed = self
            .credentials
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.can_refresh() && c.is_expired_at(Utc::now()));
        if lapsed {
            tracing::debug!("access token expired, refreshing");
            self.refresh().await?;
        }

        let response = self.send_get(path).await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let can_refresh = self
            .credentials
            .read()
            .await
            .as_ref()
            .is_some_and(Credentials::can_refresh);
        if !can_refresh {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::AuthenticationFailed(body));
        }

        tracing::debug!("access token rejected, refreshing");
        self.refresh().await?;
        self.send_get(path).await
    }

    async fn send_get(&self, path: &str) -> Result<reqwest::Response, GatewayError> {
        let mut req = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(creds) = self.credentials.read().await.as_ref() {
            req = req.bearer_auth(&creds.access_token);
        }
        req.send().await.map_err(|e| self.transport_error(e))
    }

    async fn refresh(&self) -> Result<(), GatewayError> {
        let mut guard = self.credentials.write().await;
        let Some(creds) = guard.as_mut() else {
            return Err(GatewayError::AuthenticationFailed(
                "no credentials to refresh".into(),
            ));
        };
        let Some(refresh_token) = creds.refresh_token.clone() else {
            return Err(GatewayError::AuthenticationFailed(
                "no refresh token available".into(),
            ));
        };

        let response = self
            .client
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::AuthenticationFailed(format!(
                "token refresh rejected (HTTP {})",
                status.as_u16()
            )));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("refresh response: {e}")))?;
        creds.apply_refresh(body, Utc::now());
        tracing::debug!("access token refreshed");
        Ok(())
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            GatewayError::NetworkError(e.to_string())
        }
    }
}

/// Map an error status to a `GatewayError`; pass successful responses through.
async fn check_status(
    response: reqwest::Response,
    id: TestId,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status().as_u16();
    match status {
        404 => Err(GatewayError::NotFound(id)),
        401 | 403 => {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::AuthenticationFailed(body))
        }
        s if s >= 400 => {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::ApiError {
                status,
                message: body,
            })
        }
        _ => Ok(response),
    }
}

#[async_trait]
impl TestGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn fetch_test(&self, id: TestId) -> anyhow::Result<Test> {
        let response = self.get(&format!("/tests/{id}")).await?;
        let response = check_status(response, id).await?;

        let test: Test = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("failed to parse test: {e}")))?;
        tracing::debug!(questions = test.questions.len(), "test fetched");
        Ok(test)
    }

    #[instrument(skip(self))]
    async fn fetch_answer_key(&self, id: TestId) -> anyhow::Result<Option<AnswerKey>> {
        let response = self.get(&format!("/tests/{id}/answer-key")).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, id).await?;

        let entries: Vec<AnswerKeyEntry> = response.json().await.map_err(|e| {
            GatewayError::InvalidResponse(format!("failed to parse answer key: {e}"))
        })?;
        Ok(Some(
            entries
                .into_iter()
                .map(|e| (e.question_id, e.correct_option_id))
                .collect(),
        ))
    }
}
