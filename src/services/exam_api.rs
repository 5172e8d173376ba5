use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use validator::Validate;

use crate::core::config::Settings;
use crate::core::security::Credentials;
use crate::schemas::exam::{AnswerSubmission, ExamRecord};
use crate::session::{AnswerSink, ExamProvider};

const RETRY_JITTER_MILLIS: u64 = 250;

enum AttemptFailure {
    /// Network errors, 5xx and 429.
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

/// HTTP client for the student exam endpoints.
#[derive(Debug, Clone)]
pub(crate) struct ExamApiClient {
    client: Client,
    exam_url: String,
    answer_url: String,
    max_retries: u32,
    retry_base: Duration,
}

impl ExamApiClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let api = settings.api();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_seconds))
            .timeout(Duration::from_secs(api.request_timeout_seconds))
            .build()
            .context("Failed to build exam API HTTP client")?;

        Ok(Self {
            client,
            exam_url: settings.exam_url(),
            answer_url: settings.answer_url(),
            max_retries: api.answer_max_retries,
            retry_base: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    async fn post_answer_once(
        &self,
        credentials: &Credentials,
        body: &AnswerSubmission,
    ) -> Result<(), AttemptFailure> {
        let response = self
            .client
            .post(&self.answer_url)
            .bearer_auth(credentials.bearer_token())
            .json(body)
            .send()
            .await
            .map_err(|err| {
                AttemptFailure::Retryable(
                    anyhow::anyhow!(err).context("Failed to call answer endpoint"),
                )
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let raw_body = response.text().await.unwrap_or_default();
        let error = anyhow::anyhow!(
            "Answer save failed (status {}): {}",
            status,
            error_message_from_body(&raw_body)
        );
        if is_retryable(status) {
            Err(AttemptFailure::Retryable(error))
        } else {
            Err(AttemptFailure::Fatal(error))
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=RETRY_JITTER_MILLIS);
        self.retry_base.saturating_mul(2_u32.saturating_pow(attempt))
            + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl ExamProvider for ExamApiClient {
    async fn fetch_exams(&self, credentials: &Credentials) -> Result<Vec<ExamRecord>> {
        let response = self
            .client
            .get(&self.exam_url)
            .bearer_auth(credentials.bearer_token())
            .send()
            .await
            .context("Failed to call exam endpoint")?;

        let status = response.status();
        let raw_body = response.text().await.context("Failed to read exam response")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Exam request failed (status {}): {}",
                status,
                error_message_from_body(&raw_body)
            ));
        }

        let parsed: Value = serde_json::from_str(&raw_body).map_err(|err| {
            anyhow::anyhow!("Exam endpoint returned non-JSON body (status {}): {}", status, err)
        })?;

        parse_exam_list(parsed)
    }
}

#[async_trait]
impl AnswerSink for ExamApiClient {
    async fn save_answer(
        &self,
        credentials: &Credentials,
        question_id: &str,
        option_key: &str,
    ) -> Result<()> {
        let body = AnswerSubmission {
            student_id: credentials.student_id().to_string(),
            question_id: question_id.to_string(),
            selected_option: option_key.to_string(),
        };
        body.validate().context("Invalid answer payload")?;

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.post_answer_once(credentials, &body).await {
                Ok(()) => return Ok(()),
                Err(AttemptFailure::Fatal(err)) => return Err(err),
                Err(AttemptFailure::Retryable(err)) => {
                    tracing::debug!(question_id, attempt, error = %err, "Answer save attempt failed");
                    last_error = Some(err);
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown answer save error")))
    }
}

/// Accepts a bare list, a `{ "data": [...] }` / `{ "exams": [...] }` envelope, or a single exam object.
pub(crate) fn parse_exam_list(payload: Value) -> Result<Vec<ExamRecord>> {
    let list = match payload {
        Value::Array(_) => payload,
        Value::Object(mut object) => {
            match object.remove("data").or_else(|| object.remove("exams")) {
                Some(Value::Array(items)) => Value::Array(items),
                Some(Value::Object(single)) => Value::Array(vec![Value::Object(single)]),
                Some(Value::Null) => Value::Array(Vec::new()),
                Some(other) => {
                    return Err(anyhow::anyhow!("Unexpected exam envelope payload: {other}"));
                }
                None if object.contains_key("title") => Value::Array(vec![Value::Object(object)]),
                None => {
                    return Err(anyhow::anyhow!(
                        "Exam response is neither a list nor a known envelope"
                    ));
                }
            }
        }
        Value::Null => Value::Array(Vec::new()),
        other => return Err(anyhow::anyhow!("Unexpected exam payload: {other}")),
    };

    serde_json::from_value(list).context("Failed to decode exam list")
}

fn error_message_from_body(raw_body: &str) -> String {
    match serde_json::from_str::<Value>(raw_body) {
        Ok(parsed) => extract_error_message(&parsed),
        Err(_) if raw_body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => raw_body.trim().chars().take(200).collect(),
    }
}

fn extract_error_message(payload: &Value) -> String {
    if let Some(detail) = payload.get("detail") {
        if let Some(text) = detail.as_str() {
            return text.to_string();
        }
        if let Some(items) = detail.as_array() {
            let joined = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .or_else(|| item.get("message").and_then(Value::as_str))
                })
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return joined;
            }
        }
    }

    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
