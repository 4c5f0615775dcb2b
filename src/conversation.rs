//! Transport-facing types: inbound events, outbound messages, and the
//! conversation handle a transport attaches to every event.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::AppError;

/// Only inbound messages with this type id are processed.
pub const TEXT_TYPE_ID: &str = "text";

/// A boxed, owned future returned by [`ConversationHandle`] methods.
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;

/// Capability to talk back to one end user.
///
/// Supplied by the transport with every inbound event. `reply` threads the
/// text to the triggering message where the transport supports it; `send`
/// posts a fresh message into the conversation.
pub trait ConversationHandle: Send + Sync {
    /// Address of the user this handle talks to.
    fn sender(&self) -> &str;

    fn send(&self, text: String) -> SendFuture<'_>;

    fn reply(&self, text: String) -> SendFuture<'_>;
}

pub type SharedHandle = Arc<dyn ConversationHandle>;

/// Body of an inbound message. `command`/`params` are filled in by the
/// transport for slash-commands; plain text leaves them empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContent {
    pub content: String,
    pub command: Option<String>,
    pub params: HashMap<String, String>,
}

/// An inbound event from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub type_id: String,
    pub content: MessageContent,
    pub sender: String,
    /// `true` when the message was posted in a group conversation.
    pub group: bool,
}

impl InboundMessage {
    /// A direct text message, as the console channel produces.
    pub fn text(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            type_id: TEXT_TYPE_ID.to_string(),
            content: MessageContent { content: content.into(), ..Default::default() },
            sender: sender.into(),
            group: false,
        }
    }

    /// Whether the bot should act on this event at all.
    pub fn is_processable(&self) -> bool {
        self.type_id == TEXT_TYPE_ID && !self.group
    }
}

/// One message on its way to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Send(String),
    Reply(String),
}

impl Outbound {
    pub fn text(&self) -> &str {
        match self {
            Outbound::Send(t) | Outbound::Reply(t) => t,
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording handle shared by unit tests.

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingHandle {
        sender: String,
        pub sent: Mutex<Vec<Outbound>>,
    }

    impl RecordingHandle {
        pub fn new(sender: &str) -> Arc<Self> {
            Arc::new(Self { sender: sender.to_string(), sent: Mutex::new(Vec::new()) })
        }

        pub fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|o| o.text().to_string()).collect()
        }
    }

    impl ConversationHandle for RecordingHandle {
        fn sender(&self) -> &str {
            &self.sender
        }

        fn send(&self, text: String) -> SendFuture<'_> {
            self.sent.lock().unwrap().push(Outbound::Send(text));
            Box::pin(async { Ok(()) })
        }

        fn reply(&self, text: String) -> SendFuture<'_> {
            self.sent.lock().unwrap().push(Outbound::Reply(text));
            Box::pin(async { Ok(()) })
        }
    }
}
