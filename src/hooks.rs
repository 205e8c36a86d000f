//! Hook generation on top of a chat completion provider

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{HookError, Result};

/// Number of hooks asked for per request
pub const HOOKS_PER_REQUEST: usize = 5;

const TEMPERATURE: f32 = 0.8;
const MAX_TOKENS: u32 = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One prompt sent to the language model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The language model behind `/generate-hook`.
///
/// Returns the text of the first reply. Transport and provider failures are
/// reported as [`HookError::Upstream`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Builds the user instruction for a key phrase.
pub fn user_prompt(key_phrase: &str) -> String {
    format!(
        "Write {HOOKS_PER_REQUEST} short, attention-grabbing hook ideas for a LinkedIn post about: '{key_phrase}'. \
         Return only the hook texts as a numbered list, without any additional explanation."
    )
}

/// Splits a model reply into hooks: one per non-empty line, with a leading
/// `N. ` ordinal removed.
pub fn parse_hooks(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_ordinal(line).to_string())
        .collect()
}

fn strip_ordinal(line: &str) -> &str {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix(". ") {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

/// Asks the provider for hooks about `key_phrase`.
pub async fn generate_hooks(
    provider: &dyn CompletionProvider,
    system_prompt: &str,
    key_phrase: &str,
) -> Result<Vec<String>> {
    let request = CompletionRequest {
        system_prompt: system_prompt.to_string(),
        user_prompt: user_prompt(key_phrase),
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };

    let reply = provider.complete(&request).await?;
    debug!("Model reply: {:?}", reply);

    let hooks = parse_hooks(&reply);
    if hooks.is_empty() {
        error!("Model returned no hooks for {:?}", key_phrase);
        return Err(HookError::NoHooks);
    }
    info!("Generated {} hooks for {:?}", hooks.len(), key_phrase);
    Ok(hooks)
}

// OpenAI chat completions wire types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Chat completions client for the OpenAI API (or anything speaking it)
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: SecretString, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HookError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            n: 1,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| HookError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            error!("Chat completion failed with {}: {}", status, message);
            return Err(HookError::Upstream(format!("{}: {}", status, message)));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| HookError::Upstream(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
