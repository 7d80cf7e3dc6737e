//! HTTP client for the Gemini `generateContent` API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::gateway::{ClassificationClient, ClassifyError};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gemini completion client.
///
/// Classification-friendly generation settings are fixed: temperature 0 and
/// a JSON response MIME type, matching how the prompt asks for output.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ClassifyError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClassifyError::config("GEMINI_API_KEY not set"));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClassifyError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Build a client from `GEMINI_API_KEY` and `GEMINI_MODEL`.
    pub fn from_env() -> Result<Self, ClassifyError> {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(api_key, model)
    }

    /// Point the client at a different API base URL. Used by tests against
    /// a local stub server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ClassificationClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifyError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json"
            }
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClassifyError::transient(format!("http {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let preview: String = detail.chars().take(200).collect();
            return Err(ClassifyError::config(format!("http {status}: {preview}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ClassifyError::transient(format!("failed to read response: {e}")))?;

        // A reply that is not the expected envelope is handed back verbatim;
        // the gateway's parse fallback decides what to do with it.
        match serde_json::from_str::<GenerateResponse>(&text) {
            Ok(envelope) => {
                let candidate_text = envelope
                    .candidates
                    .into_iter()
                    .next()
                    .map(|c| {
                        c.content
                            .parts
                            .into_iter()
                            .map(|p| p.text)
                            .collect::<String>()
                    })
                    .unwrap_or_default();
                if candidate_text.is_empty() {
                    Ok(text)
                } else {
                    Ok(candidate_text)
                }
            }
            Err(_) => Ok(text),
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_a_config_error() {
        let err = GeminiClient::new("", "gemini-1.5-flash").unwrap_err();
        assert!(matches!(err, ClassifyError::Config { .. }));
        let err = GeminiClient::new("   ", "gemini-1.5-flash").unwrap_err();
        assert!(matches!(err, ClassifyError::Config { .. }));
    }

    #[test]
    fn model_id_reports_configured_model() {
        let client = GeminiClient::new("test-key", "gemini-1.5-flash").unwrap();
        assert_eq!(client.model_id(), "gemini-1.5-flash");
    }

    #[test]
    fn envelope_parses_candidate_text() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "{\"product_area\": \"SWG\"}" }] }
            }]
        }"#;
        let envelope: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            envelope.candidates[0].content.parts[0].text,
            r#"{"product_area": "SWG"}"#
        );
    }
}
