use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::AppError;

const OPENAI_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini"];

const MAX_TOKENS: u32 = 1500;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    error: Option<OpenAiError>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: Option<String>,
}

/// Chat-completions client in JSON mode, with model fallback on 404/429
/// and exponential backoff for transient failures.
pub struct OpenAiAgent {
    client: Client,
    api_key: String,
    api_base: String,
    model_index: usize,
    initial_backoff: Duration,
}

impl OpenAiAgent {
    pub fn new(client: Client, api_key: String, api_base: String) -> Self {
        Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model_index: 0,
            initial_backoff: Duration::from_secs(2),
        }
    }

    #[cfg(test)]
    fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn current_model(&self) -> &str {
        OPENAI_MODELS[self.model_index]
    }

    fn build_message(prompt: &str, image_url: Option<&str>) -> Message {
        let content = match image_url {
            Some(url) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: url.to_string(),
                    },
                },
            ]),
            None => MessageContent::Text(prompt.to_string()),
        };
        Message {
            role: "user",
            content,
        }
    }

    /// Sends one user message (optionally with an image) and returns the
    /// model's JSON text.
    pub async fn complete_json(
        &mut self,
        prompt: &str,
        image_url: Option<&str>,
    ) -> Result<String, AppError> {
        let max_retries = 3;
        let mut retry_count = 0;
        let mut backoff = self.initial_backoff;
        let endpoint = format!("{}/chat/completions", self.api_base);

        loop {
            let model = self.current_model().to_string();
            info!(
                "Calling model {} (prompt length: {} chars, image: {})",
                model,
                prompt.len(),
                image_url.is_some()
            );

            let body = ChatRequest {
                model: model.clone(),
                max_tokens: MAX_TOKENS,
                messages: vec![Self::build_message(prompt, image_url)],
                response_format: ResponseFormat {
                    format_type: "json_object",
                },
            };

            let sent = self
                .client
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            let response = match sent {
                Ok(r) => r,
                Err(e) => {
                    if retry_count >= max_retries {
                        return Err(AppError::Request(format!(
                            "AI service unreachable after {} attempts: {}",
                            max_retries, e
                        )));
                    }
                    warn!("Model request failed ({}), retrying in {:?}", e, backoff);
                    retry_count += 1;
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
            };

            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                let parsed: ChatResponse = serde_json::from_str(&text)
                    .map_err(|e| AppError::parse("model response", e))?;

                let content = parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content);
                if let Some(content) = content {
                    info!("Model {} responded ({} chars)", model, content.len());
                    return Ok(content);
                }
                return Err(AppError::parse("model response", "no message content"));
            }

            let error_message = serde_json::from_str::<OpenAiErrorBody>(&text)
                .ok()
                .and_then(|e| e.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| text.clone());

            if status.as_u16() == 429 || status.as_u16() == 404 {
                warn!("Model {} unavailable ({})", model, status);
                if self.model_index < OPENAI_MODELS.len() - 1 {
                    self.model_index += 1;
                    retry_count = 0;
                    continue;
                }
            }

            if !(status.is_server_error() || status.as_u16() == 429) || retry_count >= max_retries {
                return Err(AppError::Request(format!(
                    "AI service error ({}): {}",
                    status, error_message
                )));
            }

            retry_count += 1;
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}
