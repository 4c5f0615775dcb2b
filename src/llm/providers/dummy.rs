//! Dummy LLM provider: echoes input back prefixed with `[echo]`, or returns
//! a canned reply. Used for offline runs and for testing the intent loop
//! without an API key.

use crate::llm::{ChatMessage, Generation, ProviderError};

#[derive(Debug, Clone, Default)]
pub struct DummyProvider {
    canned: Option<String>,
}

impl DummyProvider {
    pub fn echo() -> Self {
        Self { canned: None }
    }

    /// Always reply with `reply`, whatever the prompt.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self { canned: Some(reply.into()) }
    }

    pub async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<Generation, ProviderError> {
        let reply = match &self.canned {
            Some(r) => r.clone(),
            None => format!("[echo] {prompt}"),
        };
        Ok(Generation::from_turn(history, prompt, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_prefixes_echo() {
        let p = DummyProvider::echo();
        assert_eq!(p.generate("hello", &[]).await.unwrap().reply, "[echo] hello");
    }

    #[tokio::test]
    async fn generate_empty_input() {
        let p = DummyProvider::echo();
        assert_eq!(p.generate("", &[]).await.unwrap().reply, "[echo] ");
    }

    #[tokio::test]
    async fn canned_reply_ignores_prompt() {
        let p = DummyProvider::with_reply("/help");
        let g = p.generate("anything", &[]).await.unwrap();
        assert_eq!(g.reply, "/help");
        assert_eq!(g.history, vec![ChatMessage::user("anything"), ChatMessage::assistant("/help")]);
    }
}
