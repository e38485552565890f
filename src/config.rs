//! Run and model configuration.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not set; it must hold the API key for the {provider} provider")]
    MissingCredential {
        var: &'static str,
        provider: Provider,
    },
}

/// Hosted model API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    /// Google Gemini `generateContent`.
    Gemini,
    /// OpenAI-compatible chat completions.
    Openai,
}

impl Provider {
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Openai => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-pro",
            Provider::Openai => "gpt-4o",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::Openai => "https://api.openai.com",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Provider::Gemini => "gemini",
            Provider::Openai => "openai",
        })
    }
}

/// Everything a [`crate::model::ModelClient`] needs to reach its endpoint.
#[derive(Clone)]
pub struct ModelConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    /// No timeout when `None`.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_owned(),
            base_url: provider.default_base_url().to_owned(),
            temperature: None,
            timeout: None,
        }
    }

    /// Read the provider's API key from the environment.
    pub fn from_env(provider: Provider) -> Result<Self, ConfigError> {
        let var = provider.key_var();
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(provider, key)),
            _ => Err(ConfigError::MissingCredential { var, provider }),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Settings of a batch run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of dataset records to process.
    pub limit: usize,
    /// Pause between consecutive records.
    pub delay: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            delay: Duration::from_secs(1),
        }
    }
}
