//! Command table and parsing.
//!
//! Slash lines are parsed once into a [`Command`]; everything downstream
//! routes on the variant.

use std::collections::HashMap;

/// Lines starting with this character are commands.
pub const COMMAND_PREFIX: char = '/';

pub const HELP_TEXT: &str = "Here is the list of commands:\n\
/help: Show the list of commands.\n\
/ask [question]: Ask a question.\n\
/askfrombot [question]: Ask a question directly to the bot.\n\
/friend: Find a friend.\n\
/gn: Get a good night message.";

pub const UNKNOWN_COMMAND_TEXT: &str =
    "Unknown command. Please use /help to see the list of available commands.";

/// How a declared parameter is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Free text: the rest of the line after the trigger.
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// Static description of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub trigger: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const QUESTION: &[ParamSpec] = &[ParamSpec { name: "question", kind: ParamKind::Prompt }];

pub const COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { trigger: "help", usage: "/help", description: "Get help with the bot.", params: &[] },
    CommandDescriptor { trigger: "start", usage: "/start", description: "Start the bot.", params: &[] },
    CommandDescriptor { trigger: "ask", usage: "/ask [question]", description: "Ask a question.", params: QUESTION },
    CommandDescriptor {
        trigger: "askfrombot",
        usage: "/askfrombot [question]",
        description: "Ask a question directly to the bot.",
        params: QUESTION,
    },
    CommandDescriptor { trigger: "friend", usage: "/friend", description: "Find a friend.", params: &[] },
    CommandDescriptor { trigger: "gn", usage: "/gn", description: "Send a good night wishes.", params: &[] },
];

impl CommandDescriptor {
    /// Whether the intent loop may emit this command. `askfrombot` is itself
    /// the LLM path, so a line naming it from LLM output is dropped and the
    /// model is never told about it.
    pub fn offered_to_llm(&self) -> bool {
        self.trigger != "askfrombot"
    }
}

pub fn descriptor(trigger: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|d| d.trigger == trigger)
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Ask { question: Option<String> },
    Friend,
    Gn,
    AskFromBot { question: Option<String> },
    Unknown { token: String },
}

impl Command {
    /// Parse a slash line such as `"/ask what is ens?"`.
    /// Returns `None` when `line` is not a command.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix(COMMAND_PREFIX)?;
        let (token, args) = match rest.split_once(char::is_whitespace) {
            Some((token, args)) => (token, args.trim()),
            None => (rest, ""),
        };

        let mut params = HashMap::new();
        if let Some(d) = descriptor(&token.to_ascii_lowercase()) {
            // Every declared parameter is a prompt capture of the remaining text.
            for p in d.params {
                if p.kind == ParamKind::Prompt && !args.is_empty() {
                    params.insert(p.name.to_string(), args.to_string());
                }
            }
        }
        Some(Self::from_parts(token, &params))
    }

    /// Build a command from a token and captured parameters, as supplied by a
    /// transport that parses commands itself.
    pub fn from_parts(token: &str, params: &HashMap<String, String>) -> Self {
        let question = || {
            params
                .get("question")
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
        };
        let token = token.trim().trim_start_matches(COMMAND_PREFIX).to_ascii_lowercase();
        match token.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "ask" => Command::Ask { question: question() },
            "friend" => Command::Friend,
            "gn" => Command::Gn,
            "askfrombot" => Command::AskFromBot { question: question() },
            _ => Command::Unknown { token },
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Ask { .. } => "ask",
            Command::Friend => "friend",
            Command::Gn => "gn",
            Command::AskFromBot { .. } => "askfrombot",
            Command::Unknown { token } => token,
        }
    }
}

/// Prompt shown when a required parameter is missing.
pub fn missing_param_text(d: &CommandDescriptor, param: &ParamSpec) -> String {
    format!("Please provide a {}: {}", param.name, d.usage)
}
