//! Comms: transport channels that feed inbound events to the dispatcher.
//!
//! Each channel implements [`Component`] and captures the shared
//! [`Dispatcher`] at construction. A real chat network would plug in here
//! the same way: turn its events into [`InboundMessage`]s, attach a
//! [`ConversationHandle`] that can post back, and call
//! [`Dispatcher::handle_event`].
//!
//! [`InboundMessage`]: crate::conversation::InboundMessage
//! [`ConversationHandle`]: crate::conversation::ConversationHandle

#[cfg(feature = "channel-pty")]
pub mod pty;

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::subsystems::runtime::Component;

/// Build every configured channel.
#[cfg_attr(not(feature = "channel-pty"), allow(unused_variables))]
pub fn channels(config: &Config, dispatcher: Arc<Dispatcher>) -> Vec<Box<dyn Component>> {
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new(
                "pty0",
                config.comms.pty.sender.clone(),
                dispatcher.clone(),
            )));
        }
    }

    if components.is_empty() {
        info!("no comms channels configured: only background tasks will run");
    }

    components
}
