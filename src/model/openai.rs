//! OpenAI-compatible chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tap::Pipe;

use super::{check_status, http_client, ModelClient, Result, TransportError};
use crate::config::ModelConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatCompletionMessageRole {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: ChatCompletionMessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
    #[serde(other)]
    Other,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl ChatCompletionResponse {
    /// Content of the first choice.
    pub fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(TransportError::EmptyResponse)
    }
}

/// Client for `POST {base_url}/v1/chat/completions`.
pub struct ChatClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl ChatClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(&config)?,
            config,
        })
    }

    /// Request a chat completion for a single user message.
    pub async fn chat_completion(&self, prompt: &str) -> Result<ChatCompletionResponse> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&ChatCompletionRequest {
                model: &self.config.model,
                messages: vec![ChatCompletionMessage {
                    role: ChatCompletionMessageRole::User,
                    content: Some(prompt.to_owned()),
                }],
                temperature: self.config.temperature,
            })
            .send()
            .await?;
        check_status(response)
            .await?
            .json::<ChatCompletionResponse>()
            .await?
            .pipe(Ok)
    }
}

#[async_trait]
impl ModelClient for ChatClient {
    async fn send(&self, prompt: &str) -> Result<String> {
        let response = self.chat_completion(prompt).await?;
        let finish_reason = response
            .choices
            .first()
            .and_then(|choice| choice.finish_reason.as_ref());
        if finish_reason == Some(&FinishReason::Length) {
            tracing::warn!(model = %self.config.model, "completion stopped at the token limit");
        }
        response.into_text()
    }
}
