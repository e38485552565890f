//! Google Gemini `generateContent`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tap::Pipe;

use super::{check_status, http_client, ModelClient, Result, TransportError};
use crate::config::ModelConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, its parts concatenated.
    pub fn into_text(self) -> Result<String> {
        let block_reason = self.prompt_feedback.and_then(|x| x.block_reason);
        let candidate = match self.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                return Err(match block_reason {
                    Some(reason) => TransportError::Blocked(reason),
                    None => TransportError::EmptyResponse,
                })
            }
        };
        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(match candidate.finish_reason {
                Some(reason) if reason != "STOP" => TransportError::Stopped(reason),
                _ => TransportError::EmptyResponse,
            });
        }
        Ok(text)
    }
}

/// Client for `POST {base_url}/v1beta/models/{model}:generateContent`.
pub struct GeminiClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl GeminiClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(&config)?,
            config,
        })
    }

    pub async fn generate_content(&self, prompt: &str) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_owned()),
                parts: vec![Part {
                    text: Some(prompt.to_owned()),
                }],
            }],
            generation_config: self
                .config
                .temperature
                .map(|temperature| GenerationConfig {
                    temperature: Some(temperature),
                }),
        };
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;
        check_status(response)
            .await?
            .json::<GenerateContentResponse>()
            .await?
            .pipe(Ok)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn send(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt).await?.into_text()
    }
}

#[cfg(test)]
mod test {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Provider;

    fn config(server: &MockServer) -> ModelConfig {
        ModelConfig::new(Provider::Gemini, "g-test").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn sends_prompt_and_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
            .and(header("x-goog-api-key", "g-test"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "```json\n{"}, {"text": "}\n```"}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server)).unwrap();
        assert_eq!(client.send("hello").await.unwrap(), "```json\n{}\n```");
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server)).unwrap();
        assert!(matches!(
            client.send("hello").await,
            Err(TransportError::Status { .. })
        ));
    }

    #[test]
    fn blocked_prompt_names_reason() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        match response.into_text() {
            Err(TransportError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn candidate_without_text_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            response.into_text(),
            Err(TransportError::Stopped(_))
        ));
    }
}
