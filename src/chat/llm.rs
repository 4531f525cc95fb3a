//! Chat-completion clients.
//!
//! [`ChatModel`] is the seam the orchestrator calls. [`OpenAiCompatClient`]
//! speaks the OpenAI `/chat/completions` wire format, which DeepSeek also
//! accepts, so both providers share it and differ only in base URL and key.
//! Requests are sent once: no retry and no client-side timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::{ProviderConfig, ProvidersConfig};
use crate::memory::types::Turn;

/// Upstream API family a model is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::DeepSeek];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::DeepSeek => "https://api.deepseek.com/v1",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode LLM response: {0}")]
    Decode(String),

    #[error("LLM response contained no reply")]
    EmptyReply,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `messages` to `model` and return the text of the first choice.
    async fn complete(&self, model: &str, messages: &[Turn]) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    kind: ProviderKind,
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(kind: ProviderKind, config: &ProviderConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().build()?;
        let base_url = match config.base_url.trim() {
            "" => kind.default_base_url(),
            url => url,
        };
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Ok(Self {
            kind,
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    async fn complete(&self, model: &str, messages: &[Turn]) -> Result<String, LlmError> {
        let body = CompletionRequest { model, messages };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(provider = %self.kind, model, status = %status, "completion response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

/// One [`ChatModel`] per provider kind.
#[derive(Clone, Default)]
pub struct Providers {
    clients: HashMap<ProviderKind, Arc<dyn ChatModel>>,
}

impl Providers {
    /// Build an [`OpenAiCompatClient`] for every configured provider.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, LlmError> {
        let mut providers = Self::default();
        for kind in ProviderKind::ALL {
            let client = OpenAiCompatClient::new(kind, config.get(kind))?;
            providers.insert(kind, Arc::new(client));
        }
        Ok(providers)
    }

    pub fn insert(&mut self, kind: ProviderKind, client: Arc<dyn ChatModel>) {
        self.clients.insert(kind, client);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ChatModel>> {
        self.clients.get(&kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, key: Option<&str>) -> OpenAiCompatClient {
        let config = ProviderConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: key.map(str::to_string),
        };
        OpenAiCompatClient::new(ProviderKind::OpenAi, &config).unwrap()
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        let reply = client
            .complete("gpt-4o", &[Turn::system("be brief"), Turn::user("hello")])
            .await
            .unwrap();
        assert_eq!(reply, "Hi!");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .complete("gpt-4o", &[Turn::user("hello")])
            .await
            .unwrap_err();
        match err {
            LlmError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_choices_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .complete("gpt-4o", &[Turn::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyReply));
    }

    #[tokio::test]
    async fn blank_content_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  \n "}}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .complete("gpt-4o", &[Turn::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyReply));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .complete("gpt-4o", &[Turn::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Decode(_)));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = ProviderConfig {
            base_url: "https://api.deepseek.com/v1".into(),
            api_key: None,
        };
        let client = OpenAiCompatClient::new(ProviderKind::DeepSeek, &config).unwrap();
        assert_eq!(client.endpoint(), "https://api.deepseek.com/v1/chat/completions");

        let blank = OpenAiCompatClient::new(ProviderKind::OpenAi, &ProviderConfig::default()).unwrap();
        assert_eq!(blank.endpoint(), "https://api.openai.com/v1/chat/completions");
    }
}
