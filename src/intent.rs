//! Intent loop: turns free text into commands and plain lines via the LLM.
//!
//! The LLM is told which commands exist and asked to answer with one action
//! per line. Each non-blank line of the reply becomes an [`IntentAction`];
//! the dispatcher runs them in order. Conversation history is kept per
//! sender address and replaced wholesale with what the provider returns.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::commands::{COMMANDS, Command};
use crate::llm::{ChatMessage, LlmProvider, ProviderError};

/// One step the dispatcher should take for a line of LLM output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentAction {
    Command(Command),
    Text(String),
}

pub struct IntentLoop {
    provider: LlmProvider,
    histories: Mutex<HashMap<String, Vec<ChatMessage>>>,
    history_cap: Option<usize>,
}

impl IntentLoop {
    pub fn new(provider: LlmProvider, history_cap: Option<usize>) -> Self {
        Self { provider, histories: Mutex::new(HashMap::new()), history_cap }
    }

    /// Stored history for `sender` (empty if the sender never spoke).
    pub fn history(&self, sender: &str) -> Vec<ChatMessage> {
        self.histories
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(sender)
            .cloned()
            .unwrap_or_default()
    }

    /// Ask the LLM what to do with `text` from `sender`.
    pub async fn translate(&self, sender: &str, text: &str) -> Result<Vec<IntentAction>, ProviderError> {
        let prior = self.history(sender);
        let system = system_prompt();

        debug!(%sender, history_len = prior.len(), "intent: generating");
        let generation = self.provider.generate(text, &system, &prior).await?;

        let mut history = generation.history;
        if let Some(cap) = self.history_cap {
            if history.len() > cap {
                history.drain(..history.len() - cap);
            }
        }
        self.histories
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(sender.to_string(), history);

        let actions = parse_reply(&generation.reply);
        info!(%sender, actions = actions.len(), "intent: reply translated");
        Ok(actions)
    }
}

/// Split an LLM reply into actions, dropping blank lines.
pub fn parse_reply(reply: &str) -> Vec<IntentAction> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match Command::parse(line) {
            Some(cmd) => IntentAction::Command(cmd),
            None => IntentAction::Text(line.to_string()),
        })
        .collect()
}

/// Fixed instruction describing the available commands and reply format.
pub fn system_prompt() -> String {
    let mut prompt = String::from(
        "You are a friendly chat bot. Reply to the user in short plain-text lines.\n\
         You can also trigger bot commands: put each command on its own line, \
         starting with a slash, exactly as listed below.\n\nCommands:\n",
    );
    for d in COMMANDS.iter().filter(|d| d.offered_to_llm()) {
        prompt.push_str(&format!("{} - {}\n", d.usage, d.description));
    }
    prompt.push_str(
        "\nRules:\n\
         - One message or command per line.\n\
         - Do not wrap commands in quotes or code blocks.\n\
         - Only use commands from the list above.",
    );
    prompt
}
