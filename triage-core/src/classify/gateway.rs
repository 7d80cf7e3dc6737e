//! Retry-protected gateway in front of the classification model.
//!
//! The gateway owns the call discipline around the raw model client:
//! prompt construction, transient-failure retries with backoff, token and
//! call-status counters, and the safe parse fallback. Callers get either a
//! [`ClassificationResult`] or [`ClassifyError::Unavailable`] once every
//! attempt is spent; a malformed-but-delivered reply is never an error.

use async_trait::async_trait;
use metrics::counter;

use super::retry::RetryPolicy;
use super::{
    ClassificationResult, ParseStatus, build_prompt, estimate_tokens, parse_classification,
};

/// Failures while talking to the classification model.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Every attempt failed; the last transient error is attached.
    #[error("classifier unavailable after {attempts} attempts")]
    Unavailable {
        attempts: u32,
        #[source]
        source: Box<ClassifyError>,
    },

    /// A failure worth retrying: timeout, connection reset, 5xx, 429.
    #[error("transient classifier failure: {message}")]
    Transient { message: String },

    /// A failure retrying cannot fix: bad credentials, bad request shape.
    #[error("classifier configuration error: {message}")]
    Config { message: String },
}

impl ClassifyError {
    pub fn transient(message: impl Into<String>) -> Self {
        ClassifyError::Transient {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ClassifyError::Config {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ClassifyError::Transient { .. })
    }
}

/// Raw completion client for a classification model.
///
/// Implementations only move text: they take a finished prompt and return
/// the model's reply verbatim. Everything else (retries, parsing, fallback)
/// lives in [`ClassifierGateway`].
#[async_trait]
pub trait ClassificationClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifyError>;

    /// Model identifier recorded on classifications and token counters.
    fn model_id(&self) -> &str;
}

/// Classification entry point used by the pipeline.
#[derive(Debug)]
pub struct ClassifierGateway<C> {
    client: C,
    policy: RetryPolicy,
}

impl<C: ClassificationClient> ClassifierGateway<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    /// Classify `ticket_text`, retrying transient failures per the policy.
    ///
    /// A reply that arrives but does not parse as a classification yields
    /// the OTHER/P2 fallback, not an error, and is not retried.
    pub async fn classify(&self, ticket_text: &str) -> Result<ClassificationResult, ClassifyError> {
        let prompt = build_prompt(ticket_text);
        let model = self.client.model_id().to_string();

        counter!(
            "triage_llm_est_tokens_total",
            "model" => model.clone(),
            "kind" => "input"
        )
        .increment(estimate_tokens(&prompt));

        let raw = self.complete_with_retries(&prompt).await?;

        counter!(
            "triage_llm_est_tokens_total",
            "model" => model.clone(),
            "kind" => "output"
        )
        .increment(estimate_tokens(&raw));

        let (result, status) = parse_classification(&raw, &model);
        match status {
            ParseStatus::Ok => {
                counter!("triage_classifier_calls_total", "status" => "ok").increment(1);
            }
            ParseStatus::ParseError => {
                let preview: String = raw.chars().take(120).collect();
                tracing::warn!(
                    model = %model,
                    payload = %preview,
                    "Classifier reply was not valid JSON, using fallback classification"
                );
                counter!("triage_classifier_calls_total", "status" => "parse_error").increment(1);
            }
        }
        Ok(result)
    }

    async fn complete_with_retries(&self, prompt: &str) -> Result<String, ClassifyError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.client.complete(prompt).await {
                Ok(raw) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Classifier call succeeded after retries");
                    }
                    return Ok(raw);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    counter!("triage_classifier_retries_total").increment(1);
                    let delay = self.policy.delay_for_attempt(attempt - 1);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient classifier failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    counter!("triage_classifier_calls_total", "status" => "error").increment(1);
                    tracing::error!(
                        attempts = attempt,
                        error = %err,
                        "Classifier unavailable, all attempts failed"
                    );
                    return Err(ClassifyError::Unavailable {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    counter!("triage_classifier_calls_total", "status" => "error").increment(1);
                    tracing::error!(error = %err, "Classifier call failed without retry");
                    return Err(err);
                }
            }
        }
    }
}
