//! OpenAI-compatible chat-completions client implementing `ModelGateway`
//!
//! The client carries no timeout of its own; the orchestrator bounds every
//! call with the admin-configured model timeout.
use crate::config::ModelClientConfig;
use async_trait::async_trait;
use draftgate_core::{GatewayError, ModelCall, ModelGateway, PipelineMode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("CONFIG/invalid model base url {url}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
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

pub struct HttpModelGateway {
    client: Client,
    endpoint: Url,
    config: ModelClientConfig,
}

impl HttpModelGateway {
    pub fn new(config: ModelClientConfig) -> Result<Self, ClientError> {
        let endpoint = completions_endpoint(&config.base_url)?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GatewayError::KeyMissing)
    }
}

/// `{base}/chat/completions`, tolerating a trailing slash on the base.
fn completions_endpoint(base_url: &str) -> Result<Url, ClientError> {
    let base = format!("{}/", base_url.trim().trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|u| u.join("chat/completions"))
        .map_err(|source| ClientError::BaseUrl {
            url: base_url.to_string(),
            source,
        })
}

fn wants_json(mode: PipelineMode) -> bool {
    matches!(
        mode,
        PipelineMode::Draft | PipelineMode::InteractiveLongform | PipelineMode::ParagraphRegeneration
    )
}

#[async_trait]
impl ModelGateway for HttpModelGateway {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn invoke(&self, call: &ModelCall) -> Result<String, GatewayError> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &call.system,
                },
                ChatMessage {
                    role: "user",
                    content: &call.prompt,
                },
            ],
            temperature: 0.4,
            response_format: wants_json(call.mode).then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), mode = %call.mode, "model upstream error");
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid response body: {}", e)))?;

        // An empty choice list surfaces as an empty reply; the gate maps it.
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> ModelCall {
        ModelCall {
            mode: PipelineMode::Draft,
            system: "system".into(),
            prompt: "prompt".into(),
            keyword: "반도체".into(),
            reference: None,
            citation_pool: vec![],
        }
    }

    #[test]
    fn test_endpoint_join() {
        let a = completions_endpoint("https://api.example.com/v1").unwrap();
        let b = completions_endpoint("https://api.example.com/v1/").unwrap();
        assert_eq!(a.as_str(), "https://api.example.com/v1/chat/completions");
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpModelGateway::new(ModelClientConfig {
            base_url: "not a url".into(),
            ..ModelClientConfig::default()
        })
        .is_err());
    }

    #[tokio::test]
    async fn test_missing_key_never_calls_out() {
        let gateway = HttpModelGateway::new(ModelClientConfig::default()).unwrap();
        assert_eq!(gateway.invoke(&call()).await, Err(GatewayError::KeyMissing));
    }

    #[test]
    fn test_response_parsing_tolerates_null_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.4,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        })
        .unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
