//! Proxy to an OpenAI-compatible chat completion endpoint.
//!
//! The browser never sees the provider key: it posts the conversation here,
//! the server forwards it and returns the assistant's reply text.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ChatConfig;
use crate::error::AppError;
use crate::models::ChatMessage;

pub const MAX_MESSAGES: usize = 50;
pub const MAX_MESSAGE_CHARS: usize = 8_000;
const ALLOWED_ROLES: [&str; 3] = ["system", "user", "assistant"];
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(ChatClient {
            http,
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Sends the conversation and returns the first choice's content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest { model: &self.model, messages })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("provider answered {}: {}", status, body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("unreadable completion: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Upstream("completion contained no choices".to_string()))
    }
}

/// Rejects conversations the provider should never see.
pub fn validate_messages(messages: &[ChatMessage]) -> Result<(), AppError> {
    if messages.is_empty() || messages.len() > MAX_MESSAGES {
        return Err(AppError::Validation(format!(
            "A conversation must contain between 1 and {} messages.",
            MAX_MESSAGES
        )));
    }
    for message in messages {
        if !ALLOWED_ROLES.contains(&message.role.as_str()) {
            return Err(AppError::Validation(format!("Unknown message role '{}'.", message.role)));
        }
        if message.content.trim().is_empty() {
            return Err(AppError::Validation("Messages cannot be empty.".to_string()));
        }
        if message.content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Messages cannot exceed {} characters.",
                MAX_MESSAGE_CHARS
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: &str, content: &str) -> ChatMessage {
        ChatMessage { role: role.to_string(), content: content.to_string() }
    }

    #[test]
    fn accepts_a_normal_conversation() {
        let conversation = [message("system", "Be brief."), message("user", "Summarise this abstract.")];
        assert!(validate_messages(&conversation).is_ok());
    }

    #[test]
    fn rejects_bad_conversations() {
        assert!(validate_messages(&[]).is_err());
        assert!(validate_messages(&[message("tool", "x")]).is_err());
        assert!(validate_messages(&[message("user", "   ")]).is_err());
        let too_many: Vec<_> = (0..=MAX_MESSAGES).map(|_| message("user", "hi")).collect();
        assert!(validate_messages(&too_many).is_err());
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let client = ChatClient::new(&ChatConfig {
            api_url: "https://api.example.com/v1/".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
        })
        .unwrap();
        assert_eq!(client.endpoint, "https://api.example.com/v1/chat/completions");
    }
}
