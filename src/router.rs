//! Response router: knows who to talk to.
//!
//! Holds the single currently-active [`ConversationHandle`]. Every processed
//! inbound event overwrites it, and everything the bot says (handler output,
//! polled backend messages) goes out through whichever handle is active at
//! delivery time. Last write wins; a newer event from a different user
//! silently takes over the conversation.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, error};

use crate::conversation::{Outbound, SharedHandle};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no active conversation to deliver to")]
    NoActiveHandle,
    #[error("transport failed to deliver: {0}")]
    Transport(String),
}

/// Shared, cloneable router. Clones see the same active handle.
#[derive(Clone, Default)]
pub struct ResponseRouter {
    active: Arc<Mutex<Option<SharedHandle>>>,
}

impl ResponseRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` the active conversation, replacing any previous one.
    pub fn register(&self, handle: SharedHandle) {
        debug!(sender = handle.sender(), "registering active conversation");
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        *active = Some(handle);
    }

    /// Sender address of the active conversation, if any.
    pub fn active_sender(&self) -> Option<String> {
        self.current().map(|h| h.sender().to_string())
    }

    fn current(&self) -> Option<SharedHandle> {
        self.active.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Deliver one message through the active handle.
    ///
    /// The handle is cloned out of the lock before sending, so the lock is
    /// never held across the transport await.
    pub async fn deliver(&self, outbound: Outbound) -> Result<(), RouterError> {
        let Some(handle) = self.current() else {
            error!("no active conversation: message dropped");
            return Err(RouterError::NoActiveHandle);
        };

        let result = match outbound {
            Outbound::Send(text) => handle.send(text).await,
            Outbound::Reply(text) => handle.reply(text).await,
        };
        result.map_err(|e| {
            error!(sender = handle.sender(), error = %e, "transport delivery failed");
            RouterError::Transport(e.to_string())
        })
    }

    /// Deliver messages in order. A failure is logged and the rest are still
    /// attempted; the first error is returned.
    pub async fn deliver_all(&self, messages: Vec<Outbound>) -> Result<(), RouterError> {
        let mut first_err = None;
        for outbound in messages {
            if let Err(e) = self.deliver(outbound).await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::testing::RecordingHandle;

    #[tokio::test]
    async fn deliver_without_handle_errors() {
        let router = ResponseRouter::new();
        let err = router.deliver(Outbound::Send("hi".into())).await.unwrap_err();
        assert!(matches!(err, RouterError::NoActiveHandle));
        assert_eq!(router.active_sender(), None);
    }

    #[tokio::test]
    async fn deliver_uses_registered_handle() {
        let router = ResponseRouter::new();
        let h = RecordingHandle::new("0xabc");
        router.register(h.clone());

        router.deliver(Outbound::Send("one".into())).await.unwrap();
        router.deliver(Outbound::Reply("two".into())).await.unwrap();

        assert_eq!(
            *h.sent.lock().unwrap(),
            vec![Outbound::Send("one".into()), Outbound::Reply("two".into())]
        );
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let router = ResponseRouter::new();
        let first = RecordingHandle::new("0x1");
        let second = RecordingHandle::new("0x2");
        router.register(first.clone());
        router.register(second.clone());

        router.deliver(Outbound::Send("hello".into())).await.unwrap();

        assert!(first.texts().is_empty());
        assert_eq!(second.texts(), vec!["hello"]);
        assert_eq!(router.active_sender().as_deref(), Some("0x2"));
    }

    #[tokio::test]
    async fn clones_share_active_handle() {
        let router = ResponseRouter::new();
        let clone = router.clone();
        let h = RecordingHandle::new("0xabc");
        router.register(h.clone());

        clone.deliver(Outbound::Send("via clone".into())).await.unwrap();
        assert_eq!(h.texts(), vec!["via clone"]);
    }
}
