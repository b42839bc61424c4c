//! Completion client: blocking HTTP against an OpenAI-compatible
//! chat-completions endpoint.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;

/// Maximum completion tokens for query mode (a single SQL statement).
pub const QUERY_MAX_TOKENS: u32 = 200;
/// Maximum completion tokens for chart mode (script plus model chatter).
pub const CHART_MAX_TOKENS: u32 = 1500;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: String,
}

/// Wrapper around the remote text-generation call. One blocking request per
/// interaction; no retries, no streaming.
pub struct CompletionClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(120))
            .build();
        Self {
            agent,
            base_url,
            api_key,
            model,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| eyre!("No API key. Set ASKDATA_API_KEY or llm.api_key in the config file"))?;
        Ok(Self::new(
            config.resolved_base_url(),
            api_key,
            config.resolved_model(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a prompt and return the trimmed text of the first choice.
    pub fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            max_tokens,
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        debug!(url = %url, model = %self.model, prompt_chars = prompt.len(), "sending completion request");

        let response = match self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&request)
        {
            Ok(r) => r,
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                return Err(eyre!("completion service returned {}: {}", code, body));
            }
            Err(e) => return Err(eyre!("completion request failed: {}", e)),
        };

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| eyre!("could not parse completion response: {}", e))?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| eyre!("completion response contained no choices"))?
            .message
            .content;
        debug!(reply_chars = reply.len(), "received completion reply");
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            model: "test-model",
            max_tokens: QUERY_MAX_TOKENS,
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["max_tokens"], 200);
        assert_eq!(value["temperature"], 0.0);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "id": "cmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "SELECT 1"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "SELECT 1");
    }

    #[test]
    fn test_empty_choices_is_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
