//! Gemini `generateContent` backend implemented with `ureq`.

use std::time::Duration;

use log::debug;
use serde_json::{json, Value};

use crate::enrichment::response::GenerateContentResponse;
use crate::enrichment::{GenerationError, GenerationErrorKind, TextGenerator};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Connection settings for one Gemini model.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    /// `None` keeps the transport defaults.
    pub request_timeout: Option<Duration>,
}

/// Long-lived Gemini client holding the credential and HTTP agent.
pub struct GeminiGenerator {
    http_client: ureq::Agent,
    settings: GeminiSettings,
}

impl GeminiGenerator {
    pub fn new(settings: GeminiSettings) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            http_client: builder.build(),
            settings,
        }
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.api_base_url.trim().trim_end_matches('/'),
            self.settings.model.trim()
        )
    }

    fn request_body(system_prompt: &str, user_text: &str) -> Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": system_prompt }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_text }]
            }]
        })
    }

    fn kind_for_status(code: u16) -> GenerationErrorKind {
        match code {
            429 => GenerationErrorKind::RateLimited,
            _ => GenerationErrorKind::Service,
        }
    }

    fn classify_ureq_failure(error: ureq::Error) -> GenerationError {
        match error {
            ureq::Error::Status(code, response) => {
                let body: String = response
                    .into_string()
                    .unwrap_or_default()
                    .chars()
                    .take(MAX_ERROR_BODY_CHARS)
                    .collect();
                GenerationError::new(
                    Self::kind_for_status(code),
                    format!("HTTP {code}: {}", body.trim()),
                )
            }
            ureq::Error::Transport(transport) => GenerationError::new(
                GenerationErrorKind::Transport,
                format!("Request failed: {transport}"),
            ),
        }
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = self.endpoint_url();
        debug!("Gemini: POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .set(API_KEY_HEADER, &self.settings.api_key)
            .set("Accept", "application/json")
            .send_json(Self::request_body(system_prompt, user_text))
            .map_err(Self::classify_ureq_failure)?;
        response
            .into_json::<GenerateContentResponse>()
            .map_err(|error| {
                GenerationError::new(
                    GenerationErrorKind::InvalidResponse,
                    format!("Invalid JSON response: {error}"),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{GeminiGenerator, GeminiSettings, DEFAULT_API_BASE_URL, DEFAULT_MODEL};
    use crate::enrichment::{GenerationErrorKind, TextGenerator};
    use std::time::Duration;

    fn settings(api_base_url: &str) -> GeminiSettings {
        GeminiSettings {
            api_key: "test-key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: api_base_url.to_string(),
            request_timeout: Some(Duration::from_secs(2)),
        }
    }

    #[test]
    fn test_endpoint_url_joins_base_and_model() {
        let generator = GeminiGenerator::new(settings(&format!("{DEFAULT_API_BASE_URL}/")));
        assert_eq!(
            generator.endpoint_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_body_carries_system_instruction_and_user_message() {
        let body = GeminiGenerator::request_body("be terse", r#"{"title":"T"}"#);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be terse");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], r#"{"title":"T"}"#);
        assert_eq!(body["contents"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_kind_for_status_separates_rate_limit() {
        assert_eq!(
            GeminiGenerator::kind_for_status(429),
            GenerationErrorKind::RateLimited
        );
        assert_eq!(
            GeminiGenerator::kind_for_status(500),
            GenerationErrorKind::Service
        );
        assert_eq!(
            GeminiGenerator::kind_for_status(403),
            GenerationErrorKind::Service
        );
    }

    #[test]
    fn test_classify_ureq_failure_maps_status_429() {
        let response = ureq::Response::new(429, "Too Many Requests", "quota exhausted")
            .expect("synthetic response should build");
        let error = GeminiGenerator::classify_ureq_failure(ureq::Error::Status(429, response));
        assert!(error.is_rate_limited());
        assert!(error.message.contains("quota exhausted"));
    }

    #[test]
    fn test_generate_reports_transport_failure() {
        let generator = GeminiGenerator::new(settings("http://127.0.0.1:9"));
        let error = generator
            .generate("prompt", "{}")
            .expect_err("closed port should fail");
        assert_eq!(error.kind, GenerationErrorKind::Transport);
    }
}
