use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;

pub mod anthropic;
pub mod echo;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub const EMPTY_PROMPT: &str = "Error: Prompt cannot be empty.";
pub const NO_TEXT: &str = "I'm sorry, I couldn't generate a response for that prompt.";
pub const CALL_FAILED: &str = "An error occurred while communicating with the AI. Please try again later.";

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the model answered without any text (e.g. a blocked
    /// response).
    async fn complete(&self, prompt: &str) -> Result<Option<String>>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

/// Sends one prompt and always comes back with displayable text: either the
/// model's answer or a canned message describing what went wrong.
pub async fn send_prompt(provider: &dyn Provider, prompt: &str) -> String {
    if prompt.trim().is_empty() {
        tracing::error!(provider = provider.name(), "send_prompt called with an empty prompt");
        return EMPTY_PROMPT.to_string();
    }

    tracing::debug!(provider = provider.name(), bytes = prompt.len(), "sending prompt");
    match provider.complete(prompt).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            tracing::warn!(provider = provider.name(), "response was blocked or contained no text");
            NO_TEXT.to_string()
        }
        Err(e) => {
            tracing::error!(provider = provider.name(), error = %format!("{e:#}"), "LLM request failed");
            CALL_FAILED.to_string()
        }
    }
}

pub fn make_provider(cfg: &Config) -> Result<DynProvider> {
    let model = cfg.resolved_model();
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let base = cfg.api_base.clone();

    let provider: DynProvider = match cfg.provider {
        ProviderKind::Gemini => Box::new(gemini::Gemini::new(
            model,
            env_key("GEMINI_API_KEY"),
            base.unwrap_or_else(|| gemini::DEFAULT_BASE.into()),
            timeout,
        )?),
        ProviderKind::OpenAI => Box::new(openai::OpenAIProvider::new(
            model,
            env_key("OPENAI_API_KEY"),
            base.unwrap_or_else(|| openai::DEFAULT_BASE.into()),
            timeout,
        )?),
        ProviderKind::Anthropic => Box::new(anthropic::Anthropic::new(
            model,
            env_key("ANTHROPIC_API_KEY"),
            base.unwrap_or_else(|| anthropic::DEFAULT_BASE.into()),
            timeout,
        )?),
        ProviderKind::Ollama => Box::new(ollama::Ollama::new(
            model,
            base.unwrap_or_else(|| ollama::DEFAULT_BASE.into()),
            timeout,
        )?),
        ProviderKind::Echo => Box::new(echo::Echo),
    };
    tracing::info!(provider = provider.name(), model = %cfg.resolved_model(), "provider ready");
    Ok(provider)
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}

fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}
