//! The generative commentator: a chat-completions client behind the
//! [`CommentaryGenerator`] trait, and the [`Commentator`] handle that makes
//! "no generator configured" an explicit state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::prompt;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default model name.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Error, Debug)]
pub enum CommentaryError {
    #[error("Commentary API key not configured")]
    NotConfigured,
    #[error("Commentary request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Commentary API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Commentary API returned an empty response")]
    EmptyResponse,
    #[error("{0}")]
    Unavailable(String),
}

/// Commentary generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommentaryConfig {
    /// Bearer key for the chat-completions API. No key means no generator.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on simultaneous outbound calls.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-request timeout in seconds. `None` waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for CommentaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            max_concurrency: default_max_concurrency(),
            timeout_secs: None,
        }
    }
}

/// Prompt-in, text-out access to a language model.
#[async_trait]
pub trait CommentaryGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CommentaryError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`CommentaryGenerator`] for OpenAI-compatible chat-completions APIs.
pub struct ChatCompletionsClient {
    client: Client,
    permits: Semaphore,
    api_url: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsClient {
    /// Builds a client. Fails with [`CommentaryError::NotConfigured`] when
    /// no API key is set.
    pub fn new(config: &CommentaryConfig) -> Result<Self, CommentaryError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(CommentaryError::NotConfigured)?
            .to_string();

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            permits: Semaphore::new(config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS)),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl CommentaryGenerator for ChatCompletionsClient {
    async fn generate(&self, prompt: &str) -> Result<String, CommentaryError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CommentaryError::Unavailable("Commentary client closed".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommentaryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CommentaryError::EmptyResponse);
        }
        tracing::debug!(chars = text.len(), "Commentary received");
        Ok(text)
    }
}

/// The commentary generator as the rest of the system sees it.
#[derive(Clone)]
pub enum Commentator {
    Ready(Arc<dyn CommentaryGenerator>),
    Unavailable { reason: String },
}

impl Commentator {
    /// Builds a [`ChatCompletionsClient`] from config, or an `Unavailable`
    /// commentator explaining why it could not.
    pub fn from_config(config: &CommentaryConfig) -> Self {
        match ChatCompletionsClient::new(config) {
            Ok(client) => Commentator::Ready(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Commentary generator unavailable");
                Commentator::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn ready(generator: Arc<dyn CommentaryGenerator>) -> Self {
        Commentator::Ready(generator)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Commentator::Ready(_))
    }

    /// Comments on a position reached in the way `context` describes.
    pub async fn comment(&self, fen: &str, context: &str) -> Result<String, CommentaryError> {
        self.generate(&prompt::position_prompt(fen, context)).await
    }

    /// Answers a user question about a position.
    pub async fn answer(
        &self,
        fen: &str,
        question: &str,
        previous_moves: &str,
    ) -> Result<String, CommentaryError> {
        self.generate(&prompt::question_prompt(fen, question, previous_moves))
            .await
    }

    /// Sends a trivial prompt to check the generator end to end.
    pub async fn probe(&self) -> Result<String, CommentaryError> {
        self.generate(prompt::PROBE_PROMPT).await
    }

    async fn generate(&self, prompt: &str) -> Result<String, CommentaryError> {
        match self {
            Commentator::Ready(generator) => generator.generate(prompt).await,
            Commentator::Unavailable { reason } => {
                Err(CommentaryError::Unavailable(reason.clone()))
            }
        }
    }
}
