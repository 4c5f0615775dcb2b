//! LLM provider abstraction used by the intent loop.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities: clone them freely.
//! The provider owns history continuation: [`LlmProvider::generate`] takes
//! the prior turns and hands back the full updated history, which the caller
//! stores as-is.

pub mod providers;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Chat types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Result of one generation round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub reply: String,
    /// Prior history plus this turn's user prompt and assistant reply.
    /// Never contains the system prompt.
    pub history: Vec<ChatMessage>,
}

impl Generation {
    fn from_turn(history: &[ChatMessage], prompt: &str, reply: String) -> Self {
        let mut updated = history.to_vec();
        updated.push(ChatMessage::user(prompt));
        updated.push(ChatMessage::assistant(reply.clone()));
        Self { reply, history: updated }
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `generate` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Send `prompt` with `system` and prior `history`; return the reply and
    /// the updated history.
    pub async fn generate(
        &self,
        prompt: &str,
        system: &str,
        history: &[ChatMessage],
    ) -> Result<Generation, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.generate(prompt, history).await,
            LlmProvider::OpenAiCompatible(p) => p.generate(prompt, system, history).await,
        }
    }
}
