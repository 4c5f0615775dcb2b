//! Long-running parts of the bot: transport channels, the pending-message
//! poller, and the runtime that supervises them.

pub mod comms;
pub mod poll;
pub mod runtime;
