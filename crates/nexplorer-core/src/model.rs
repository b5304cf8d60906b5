use crate::error::CoreError;
use crate::events::{Event, EventBus};
use anyhow::Result;
use async_trait::async_trait;
use nexplorer_config::AiConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRequest {
    pub system: String,
    pub utterance: String,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<String, CoreError>;
}

pub fn build_system_prompt(current_path: &str, overview: &str) -> String {
    format!(
        r#"You are a file manager assistant.

CONTEXT:
Current Path: '{current_path}'
File System Overview:
{overview}

Interpret the user request. Use the Overview to infer paths.

Return ONLY a valid JSON object. Do not add markdown formatting.

Possible actions:
1. "search": finds a file. Params: "query".
2. "copy": copies a file. Params: "source", "destination", "direction" (to_host or to_client).
3. "navigate": changes directory. Params: "path".
4. "question": ask the user for clarification. Params: "text".

Example: {{"action": "search", "params": {{"query": "tax_report"}}}}
Example: {{"action": "question", "params": {{"text": "Did you mean the 2023 or 2024 report?"}}}}"#
    )
}

pub fn spawn_request(
    client: Arc<dyn ModelClient>,
    request_id: Uuid,
    request: ModelRequest,
    bus: EventBus,
) {
    tokio::spawn(async move {
        let result = client.complete(request).await;
        if let Err(ref err) = result {
            warn!(%request_id, error = %err, "model request failed");
        }
        bus.send(Event::ModelReply {
            request_id,
            result: result.map_err(|e| e.to_string()),
        })
        .await;
    });
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: Option<ChatMessage>,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    system: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct HttpModelClient {
    client: reqwest::Client,
    cfg: AiConfig,
    api_key: Option<Zeroizing<String>>,
}

impl HttpModelClient {
    pub fn new(cfg: AiConfig) -> Result<Self, CoreError> {
        let api_key = cfg
            .resolve_api_key()
            .map_err(|e| CoreError::Model(format!("api key: {e}")))?
            .map(Zeroizing::new);
        if api_key.is_none() && cfg.provider.trim().to_lowercase() != "ollama" {
            warn!(provider = %cfg.provider, "no api key configured");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| CoreError::Model(e.to_string()))?;
        Ok(Self {
            client,
            cfg,
            api_key,
        })
    }

    fn key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.as_str())
            .filter(|k| !k.trim().is_empty())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.endpoint.trim_end_matches('/'), path)
    }

    async fn request(&self, request: ModelRequest) -> Result<String> {
        let provider = self.cfg.provider.trim().to_lowercase();
        match provider.as_str() {
            "openai" | "openai-compatible" | "openrouter" => self.request_openai(request).await,
            "ollama" => self.request_ollama(request).await,
            "anthropic" => self.request_anthropic(request).await,
            _ => Err(anyhow::anyhow!("unknown ai provider: {}", self.cfg.provider)),
        }
    }

    async fn request_openai(&self, request: ModelRequest) -> Result<String> {
        let body = OpenAiRequest {
            model: self.cfg.model.clone(),
            messages: chat_messages(request),
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };
        let mut req = self.client.post(self.url("/v1/chat/completions")).json(&body);
        if let Some(key) = self.key() {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("ai error {status}: {text}"));
        }
        let data: OpenAiResponse = resp.json().await?;
        data.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("ai empty response"))
    }

    async fn request_ollama(&self, request: ModelRequest) -> Result<String> {
        let body = OllamaRequest {
            model: self.cfg.model.clone(),
            messages: chat_messages(request),
            stream: false,
            options: OllamaOptions {
                temperature: self.cfg.temperature,
                num_predict: self.cfg.max_tokens,
            },
        };
        let resp = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("ollama error {status}: {text}"));
        }
        let data: OllamaResponse = resp.json().await?;
        data.message
            .map(|m| m.content)
            .ok_or_else(|| anyhow::anyhow!("ollama empty response"))
    }

    async fn request_anthropic(&self, request: ModelRequest) -> Result<String> {
        let body = AnthropicRequest {
            model: self.cfg.model.clone(),
            max_tokens: self.cfg.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
            temperature: self.cfg.temperature,
            system: request.system,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.utterance,
            }],
        };
        let mut req = self
            .client
            .post(self.url("/v1/messages"))
            .json(&body)
            .header("anthropic-version", "2023-06-01");
        if let Some(key) = self.key() {
            req = req.header("x-api-key", key);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("ai error {status}: {text}"));
        }
        let data: AnthropicResponse = resp.json().await?;
        data.content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| anyhow::anyhow!("ai empty response"))
    }
}

fn chat_messages(request: ModelRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: request.system,
        },
        ChatMessage {
            role: "user".to_string(),
            content: request.utterance,
        },
    ]
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, request: ModelRequest) -> Result<String, CoreError> {
        info!(provider = %self.cfg.provider, model = %self.cfg.model, "model request");
        let reply = self
            .request(request)
            .await
            .map_err(|e| CoreError::Model(e.to_string()))?;
        debug!(chars = reply.len(), "model reply");
        Ok(reply)
    }
}
