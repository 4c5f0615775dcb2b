//! Wai bot: relays chat commands and free text to a backend service and an
//! LLM, and routes the answers back to the user.
//!
//! The binary entry point is `src/main.rs`; the library exposes the pieces
//! for integration tests and for embedding behind another transport.

pub mod backend;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod intent;
pub mod llm;
pub mod logger;
pub mod router;
pub mod subsystems;
