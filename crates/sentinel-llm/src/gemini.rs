use std::time::Duration;

use async_trait::async_trait;
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::ChatRole;
use serde::{Deserialize, Serialize};

use crate::ports::{GenerationRequest, Generator};

pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` adapter
pub struct GeminiGenerator {
    /// Base URL for the Generative Language API
    base_url: String,

    /// API key sent in the `x-goog-api-key` header
    api_key: String,

    model: String,

    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            SentinelError::GeneratorUnavailable {
                reason: format!("Failed to build HTTP client: {}", e),
                remediation: "Check the TLS setup of the host".to_string(),
            }
        })?;

        Ok(Self {
            base_url: GEMINI_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Point the adapter at another endpoint, e.g. a proxy
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn body(request: &GenerationRequest) -> GeminiRequest<'_> {
        let mut contents: Vec<Content<'_>> = request
            .history
            .iter()
            .map(|turn| Content {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                },
                parts: vec![Part { text: &turn.text }],
            })
            .collect();
        contents.push(Content {
            role: "user",
            parts: vec![Part {
                text: &request.prompt,
            }],
        });

        GeminiRequest {
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(|text| SystemInstruction { parts: vec![Part { text }] }),
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(
            model = %self.model,
            history = request.history.len(),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| SentinelError::GeneratorUnavailable {
                reason: format!("Failed to connect to Gemini: {}", e),
                remediation: "Check network access to generativelanguage.googleapis.com"
                    .to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || error_text.contains("RESOURCE_EXHAUSTED")
            {
                return Err(SentinelError::RateLimited {
                    provider: "gemini".to_string(),
                });
            }
            tracing::error!(%status, "Gemini API error: {}", error_text);
            return Err(SentinelError::GeneratorUnavailable {
                reason: format!("Gemini API error ({}): {}", status, error_text),
                remediation: format!(
                    "Check GOOGLE_API_KEY and that the model '{}' is available to it",
                    self.model
                ),
            });
        }

        let reply: GeminiResponse = response.json().await.map_err(|e| {
            SentinelError::GeneratorUnavailable {
                reason: format!("Failed to parse Gemini response: {}", e),
                remediation: "Check Gemini API compatibility".to_string(),
            }
        })?;

        reply.text().ok_or_else(|| SentinelError::GeneratorUnavailable {
            reason: "Gemini returned no text".to_string(),
            remediation: "The prompt may have been blocked; rephrase and try again".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Request body for the generateContent API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Response from the generateContent API
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Text parts of the first candidate, concatenated
    fn text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::models::ChatTurn;
    use serde_json::json;

    #[test]
    fn test_body_layout() {
        let request = GenerationRequest::new("e a temperatura?")
            .with_system_instruction("Você é SACY")
            .with_history(&[ChatTurn::user("oi"), ChatTurn::model("Égua, olá!")]);
        let body = serde_json::to_value(GeminiGenerator::body(&request)).unwrap();

        assert_eq!(body["systemInstruction"], json!({"parts": [{"text": "Você é SACY"}]}));
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][2],
            json!({"role": "user", "parts": [{"text": "e a temperatura?"}]})
        );
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_body_without_system_instruction() {
        let request = GenerationRequest::new("oi");
        let body = serde_json::to_value(GeminiGenerator::body(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let reply: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "Égua, "}, {"text": "tá quente!"}], "role": "model"}}]
        }))
        .unwrap();
        assert_eq!(reply.text().as_deref(), Some("Égua, tá quente!"));
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let reply: GeminiResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert!(reply.text().is_none());

        let empty: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.text().is_none());
    }
}
