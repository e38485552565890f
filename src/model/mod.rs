//! Remote text-generation models.

pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::{ModelConfig, Provider};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("request to the model failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("prompt was blocked: {0}")]
    Blocked(String),
    #[error("generation stopped without text: {0}")]
    Stopped(String),
    #[error("model returned no text")]
    EmptyResponse,
}

pub type Result<T> = core::result::Result<T, TransportError>;

/// Something that turns a prompt into response text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String>;
}

/// Build the client for the configured provider.
pub fn build_client(config: ModelConfig) -> Result<Box<dyn ModelClient>> {
    let client: Box<dyn ModelClient> = match config.provider {
        Provider::Gemini => Box::new(gemini::GeminiClient::new(config)?),
        Provider::Openai => Box::new(openai::ChatClient::new(config)?),
    };
    Ok(client)
}

pub(crate) fn http_client(config: &ModelConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(TransportError::ClientBuild)
}

/// Turn a non-success status into an error carrying the response body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status { status, body })
}
