use std::time::Duration;

use async_trait::async_trait;
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::ChatRole;
use serde::{Deserialize, Serialize};

use crate::ports::{GenerationRequest, Generator};

pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completions adapter
pub struct OpenAiGenerator {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiGenerator {
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
            base_url: OPENAI_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages(request: &GenerationRequest) -> Vec<Message<'_>> {
        let system = request
            .system_instruction
            .as_deref()
            .map(|content| Message {
                role: "system",
                content,
            });
        let history = request.history.iter().map(|turn| Message {
            role: match turn.role {
                ChatRole::User => "user",
                ChatRole::Model => "assistant",
            },
            content: &turn.text,
        });

        system
            .into_iter()
            .chain(history)
            .chain(std::iter::once(Message {
                role: "user",
                content: &request.prompt,
            }))
            .collect()
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: Self::messages(request),
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SentinelError::GeneratorUnavailable {
                reason: format!("Failed to connect to OpenAI: {}", e),
                remediation: "Check network access to api.openai.com".to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SentinelError::RateLimited {
                provider: "openai".to_string(),
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, "OpenAI API error: {}", error_text);
            return Err(SentinelError::GeneratorUnavailable {
                reason: format!("OpenAI API error ({}): {}", status, error_text),
                remediation: "Check OPENAI_API_KEY and the configured model".to_string(),
            });
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            SentinelError::GeneratorUnavailable {
                reason: format!("Failed to parse OpenAI response: {}", e),
                remediation: "Check OpenAI API compatibility".to_string(),
            }
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SentinelError::GeneratorUnavailable {
                reason: "OpenAI returned no choices".to_string(),
                remediation: "Retry the request".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::models::ChatTurn;

    #[test]
    fn test_messages_order_and_roles() {
        let request = GenerationRequest::new("relatório")
            .with_system_instruction("Você é um analista geoespacial")
            .with_history(&[ChatTurn::user("oi"), ChatTurn::model("olá")]);
        let roles: Vec<&str> = OpenAiGenerator::messages(&request).iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn test_messages_without_system() {
        let request = GenerationRequest::new("oi");
        let messages = OpenAiGenerator::messages(&request);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "oi");
    }
}
