//! External generation service client.
//!
//! The pipeline talks to an OpenAI-compatible endpoint through one narrow
//! contract: `generate(prompt, max_length) -> text`. Transport failures,
//! non-success statuses, and malformed bodies all surface as a single
//! error kind; callers decide whether that is fatal.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;

use crate::error::RundownError;

/// Connection settings for the generation service.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model name (e.g. "gpt-4o-mini", "llama3.1:8b").
    pub model: String,
    /// Bound on the whole request. Expiry is a service failure, never an
    /// unbounded retry loop.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl GenerationConfig {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: 120,
            connect_timeout_secs: 30,
        }
    }
}

/// Request/response text contract with the generation service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str, max_length: u32) -> Result<String, RundownError>;
}

/// Generation service backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiGeneration {
    config: GenerationConfig,
}

impl OpenAiGeneration {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GenerationService for OpenAiGeneration {
    async fn generate(&self, prompt: &str, max_length: u32) -> Result<String, RundownError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(self.config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                RundownError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(&self.config.api_key)
            .with_api_base(&self.config.api_base);

        let client = Client::with_config(config).with_http_client(http_client);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .max_completion_tokens(max_length)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: prompt.to_string().into(),
                    name: None,
                },
            )])
            .build()?;

        match client.chat().create(request).await {
            Ok(response) => {
                let content = response
                    .choices
                    .first()
                    .and_then(|c| c.message.content.clone())
                    .unwrap_or_default();
                Ok(content)
            }
            Err(e) => Err(RundownError::ServiceUnavailable(e.to_string())),
        }
    }
}

/// Sanitize a generated reply for spoken use: strip reasoning tags and
/// XML-like markup, markdown emphasis, and collapse whitespace.
///
/// Line structure does not survive this; use the `freeform` helpers when
/// parsing structured replies.
pub fn sanitize_reply(response: &str) -> String {
    let tags_to_strip = [
        "thinking",
        "think",
        "reflection",
        "reflect",
        "internal",
        "reasoning",
        "thought",
        "scratch",
        "scratchpad",
        "plan",
        "analysis",
        "analyze",
        "consider",
        "pondering",
        "deliberation",
    ];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Remove any remaining orphaned opening/closing tags.
    if let Ok(orphan_re) = regex::Regex::new(r"</?[\w]+[^>]*>") {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    // Remove markdown emphasis markers.
    result = result.replace('*', "").replace('`', "");

    if let Ok(ws_re) = regex::Regex::new(r"\s+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}
