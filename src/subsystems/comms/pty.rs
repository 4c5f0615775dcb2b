//! PTY (console) comms channel: reads lines from stdin, hands them to the
//! dispatcher as direct text messages, prints whatever the bot says to stdout.
//!
//! Every line comes from the same configured sender address, so the console
//! behaves like a single chat user. Runs until the `shutdown` token is
//! cancelled (Ctrl-C) or stdin is closed.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conversation::{ConversationHandle, InboundMessage, SendFuture};
use crate::dispatcher::Dispatcher;
use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

// ── ConsoleHandle ────────────────────────────────────────────────────────────

/// Conversation handle that writes to stdout.
pub struct ConsoleHandle {
    sender: String,
}

impl ConsoleHandle {
    pub fn new(sender: impl Into<String>) -> Self {
        Self { sender: sender.into() }
    }
}

impl ConversationHandle for ConsoleHandle {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn send(&self, text: String) -> SendFuture<'_> {
        Box::pin(async move {
            println!("{text}");
            Ok(())
        })
    }

    fn reply(&self, text: String) -> SendFuture<'_> {
        Box::pin(async move {
            println!("↳ {text}");
            Ok(())
        })
    }
}

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    sender: String,
    dispatcher: Arc<Dispatcher>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, sender: impl Into<String>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { channel_id: channel_id.into(), sender: sender.into(), dispatcher }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            println!("─────────────────────────────────");
            println!(" Wai console  (Ctrl-C to quit)");
            println!(" /help lists the commands");
            println!("─────────────────────────────────");
            let stdin = BufReader::new(tokio::io::stdin());
            run_pty(self.channel_id, self.sender, self.dispatcher, stdin, shutdown).await
        })
    }
}

// ── run_pty ──────────────────────────────────────────────────────────────────

async fn run_pty<R>(
    channel_id: String,
    sender: String,
    dispatcher: Arc<Dispatcher>,
    reader: R,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    info!(%channel_id, %sender, "pty channel started");

    let handle: Arc<dyn ConversationHandle> = Arc::new(ConsoleHandle::new(sender.clone()));
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(%channel_id, "shutdown signal received: closing console channel");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!(%channel_id, "pty read error: {e}");
                        return Err(AppError::Comms(format!("stdin read failed: {e}")));
                    }
                    Ok(None) => {
                        info!(%channel_id, "pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        let input = input.trim();
                        if input.is_empty() {
                            continue;
                        }
                        debug!(%channel_id, input = %input, "pty received line");
                        dispatcher
                            .handle_event(InboundMessage::text(sender.clone(), input), handle.clone())
                            .await;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendClient;
    use crate::config::{AskLlmEncoding, BackendConfig, Variant};
    use crate::router::ResponseRouter;

    fn dispatcher() -> Arc<Dispatcher> {
        let backend = BackendClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_seconds: 1,
            ask_llm_encoding: AskLlmEncoding::Json,
        })
        .unwrap();
        Arc::new(Dispatcher::new(backend, ResponseRouter::new(), Variant::Polling, None))
    }

    #[tokio::test]
    async fn lines_register_console_sender_until_eof() {
        let d = dispatcher();
        let input: &[u8] = b"\n   \n/help\n";

        run_pty("pty0".into(), "console".into(), d.clone(), input, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(d.router().active_sender().as_deref(), Some("console"));
    }

    #[tokio::test]
    async fn blank_input_registers_nothing() {
        let d = dispatcher();
        let input: &[u8] = b"\n\n";

        run_pty("pty0".into(), "console".into(), d.clone(), input, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(d.router().active_sender(), None);
    }

    #[tokio::test]
    async fn cancelled_token_stops_channel() {
        let d = dispatcher();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let (_keep_open, rx) = tokio::io::duplex(64);

        run_pty("pty0".into(), "console".into(), d, BufReader::new(rx), shutdown)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn console_handle_reports_sender() {
        let h = ConsoleHandle::new("0xabc");
        assert_eq!(h.sender(), "0xabc");
        h.send("printed".into()).await.unwrap();
    }
}
