use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::types::MessageRole;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4-turbo";

/// One turn of a conversation, in the chat-completion wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct CompletionClient {
    api_key: String,
    client: reqwest::Client,
}

impl CompletionClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Issue one completion request with the full ordered history.
    ///
    /// Never retries. A failure leaves the caller's history untouched so it
    /// stays in sync with what the model has actually seen.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<ChatMessage> {
        debug!("Sending completion request with {} messages", messages.len());

        let request = CompletionRequest {
            model: MODEL,
            messages,
            temperature,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::CompletionApi {
                status,
                message: parse_error_message(&body),
            });
        }

        let api_response: CompletionResponse = response.json().await?;

        let message = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BotError::CompletionResponse("no choices in response".to_string()))?
            .message;

        debug!("Received completion response");
        Ok(message)
    }
}

/// Pull the API-reported message out of an error body, falling back to the
/// raw body when it is not the expected JSON shape.
fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map_or_else(|_| body.to_string(), |parsed| parsed.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_wire_format() -> Result<()> {
        let messages = vec![
            ChatMessage::system("You are an assistant."),
            ChatMessage::user("hello"),
        ];
        let request = CompletionRequest {
            model: MODEL,
            messages: &messages,
            temperature: 1.5,
        };

        let body = serde_json::to_value(&request)?;
        assert_eq!(body["model"], "gpt-4-turbo");
        assert_eq!(body["temperature"], 1.5);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are an assistant.");
        assert_eq!(body["messages"][1]["role"], "user");
        Ok(())
    }

    #[test]
    fn parses_first_completion_choice() -> Result<()> {
        let raw = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4-turbo",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "hi there"},
                    "logprobs": null,
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;

        let response: CompletionResponse = serde_json::from_str(raw)?;
        let message = response.choices.into_iter().next().map(|c| c.message);
        assert_eq!(message, Some(ChatMessage::assistant("hi there")));
        Ok(())
    }

    #[test]
    fn error_message_extracted_from_json_body() {
        let body = r#"{"error": {"message": "Incorrect API key provided"}}"#;
        assert_eq!(parse_error_message(body), "Incorrect API key provided");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(parse_error_message("<html>bad gateway</html>"), "<html>bad gateway</html>");
    }
}
