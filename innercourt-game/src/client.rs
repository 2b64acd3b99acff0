//! Blocking chat-completions transport for the narrative collaborator.
//!
//! Available behind the `http-client` feature; the core engine only sees
//! the `NarrativeClient` trait.

use serde::{Deserialize, Serialize};

use crate::adjudicate::{NarrativeClient, NarrativeError, NarrativeRequest, NarrativeSettings};

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// OpenAI-compatible blocking HTTP client.
#[derive(Debug, Default)]
pub struct HttpNarrativeClient {
    client: reqwest::blocking::Client,
}

impl HttpNarrativeClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NarrativeClient for HttpNarrativeClient {
    fn complete(
        &self,
        settings: &NarrativeSettings,
        request: &NarrativeRequest,
    ) -> Result<String, NarrativeError> {
        if !settings.is_ready() {
            return Err(NarrativeError::Disabled);
        }
        let body = ChatCompletionRequest {
            model: settings.model.clone(),
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_prompt.clone(),
                },
            ],
        };

        let mut builder = self.client.post(&settings.api_url).json(&body);
        if !settings.api_key.is_empty() {
            builder = builder.bearer_auth(&settings.api_key);
        }

        let response = builder
            .send()
            .map_err(|err| NarrativeError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(NarrativeError::Transport(format!(
                "bad response status: {}",
                response.status()
            )));
        }
        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|err| NarrativeError::Transport(err.to_string()))?;
        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| NarrativeError::MalformedReply("empty model response".to_string()))?;
        Ok(content)
    }
}
