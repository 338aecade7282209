use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Client for the model gateway's OpenAI-compatible chat-completions API.
///
/// Every call is a single bounded request; there is no retry here. Callers
/// with a safe fallback (roasts, narratives) substitute it on error, callers
/// without one (receipt extraction) propagate.
pub struct LlmClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Chat request wire format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: MessageContent,
}

/// Plain text for most calls; a parts array when an image rides along.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// Chat response wire format.
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
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Gateway error: {0}")]
    GatewayError(String),
    #[error("Empty completion")]
    EmptyCompletion,
}

impl LlmClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Plain-text completion: roasts and narrative fields.
    pub async fn complete_text(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.complete(
            vec![
                Message {
                    role: "system",
                    content: MessageContent::Text(system.to_string()),
                },
                Message {
                    role: "user",
                    content: MessageContent::Text(user.to_string()),
                },
            ],
            false,
        )
        .await
    }

    /// JSON-mode completion: receipt extraction, advice, report narratives.
    pub async fn complete_json(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.complete(
            vec![
                Message {
                    role: "system",
                    content: MessageContent::Text(system.to_string()),
                },
                Message {
                    role: "user",
                    content: MessageContent::Text(user.to_string()),
                },
            ],
            true,
        )
        .await
    }

    /// Completion over an image (receipts, image statements). `image_url` is
    /// the client-supplied data URL, passed through opaquely.
    pub async fn complete_with_image(
        &self,
        system: &str,
        text: &str,
        image_url: &str,
        json_mode: bool,
    ) -> Result<String, LlmError> {
        self.complete(
            vec![
                Message {
                    role: "system",
                    content: MessageContent::Text(system.to_string()),
                },
                Message {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: text.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image_url.to_string(),
                            },
                        },
                    ]),
                },
            ],
            json_mode,
        )
        .await
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        json_mode: bool,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            response_format: json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!("Sending request to model gateway: {}", url);

        let mut builder = self.http_client.post(&url).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GatewayError(format!("{}: {}", status, body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_serializes_as_plain_string() {
        let message = Message {
            role: "user",
            content: MessageContent::Text("hello".to_string()),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn test_image_content_serializes_as_parts_array() {
        let message = Message {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "look".to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".to_string(),
                    },
                },
            ]),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_json_mode_sets_response_format() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            stream: false,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_text_mode_omits_response_format() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            stream: false,
            response_format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("response_format").is_none());
    }
}
