//! Command dispatcher: the entry point for every inbound event.
//!
//! An event is filtered (text, non-group), its handle becomes the active
//! conversation, and then it is routed either to a command handler or, for
//! free text, to the backend message queue (polling) or the intent loop
//! (sync). Handlers return their chat output as an ordered list of
//! [`Outbound`] messages; the dispatcher delivers them through the
//! [`ResponseRouter`]. No handler error ever reaches the transport: each is
//! turned into chat text or logged.

use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::commands::{self, Command, HELP_TEXT, UNKNOWN_COMMAND_TEXT};
use crate::config::Variant;
use crate::conversation::{InboundMessage, Outbound, SharedHandle};
use crate::intent::{IntentAction, IntentLoop};
use crate::router::ResponseRouter;

pub const WELCOME_FALLBACK: &str = "Welcome!";
pub const GOOD_NIGHT_TEXT: &str = "Good Night!";
pub const ASK_FROM_BOT_FAILED: &str = "An error occurred while processing your request.";

pub struct Dispatcher {
    backend: BackendClient,
    router: ResponseRouter,
    variant: Variant,
    /// Present in the sync variant only.
    intent: Option<IntentLoop>,
}

impl Dispatcher {
    pub fn new(
        backend: BackendClient,
        router: ResponseRouter,
        variant: Variant,
        intent: Option<IntentLoop>,
    ) -> Self {
        if variant == Variant::Sync && intent.is_none() {
            warn!("sync variant without an intent loop: free text will be ignored");
        }
        Self { backend, router, variant, intent }
    }

    pub fn router(&self) -> &ResponseRouter {
        &self.router
    }

    pub fn intent(&self) -> Option<&IntentLoop> {
        self.intent.as_ref()
    }

    /// Process one inbound event to completion.
    pub async fn handle_event(&self, message: InboundMessage, handle: SharedHandle) {
        if !message.is_processable() {
            debug!(
                type_id = %message.type_id,
                group = message.group,
                "ignoring inbound message"
            );
            return;
        }

        self.router.register(handle);

        let text = message.content.content.trim();
        if text.starts_with(commands::COMMAND_PREFIX) {
            let command = match &message.content.command {
                Some(token) => Command::from_parts(token, &message.content.params),
                None => Command::parse(text).unwrap_or(Command::Unknown { token: String::new() }),
            };
            info!(sender = %message.sender, command = command.token(), "command received");

            match (&command, self.variant) {
                (Command::AskFromBot { question: Some(q) }, Variant::Sync) => {
                    self.run_intent(&message.sender, q).await;
                }
                _ => {
                    let out = self.execute(&command).await;
                    self.deliver(out).await;
                }
            }
            return;
        }

        if text.is_empty() {
            return;
        }

        match self.variant {
            Variant::Polling => {
                let out = self.execute(&Command::AskFromBot { question: Some(text.to_string()) }).await;
                self.deliver(out).await;
            }
            Variant::Sync => self.run_intent(&message.sender, text).await,
        }
    }

    /// Run a command and return what should be said, without delivering it.
    pub async fn execute(&self, command: &Command) -> Vec<Outbound> {
        match command {
            Command::Start => self.handle_start().await,
            Command::Help => vec![Outbound::Send(HELP_TEXT.to_string())],
            Command::Ask { question } => self.handle_ask(question.as_deref()).await,
            Command::Friend => self.handle_friend().await,
            Command::Gn => self.handle_gn(),
            Command::AskFromBot { question } => self.handle_ask_from_bot(question.as_deref()).await,
            Command::Unknown { token } => {
                debug!(%token, "unknown command");
                vec![Outbound::Reply(UNKNOWN_COMMAND_TEXT.to_string())]
            }
        }
    }

    async fn deliver(&self, out: Vec<Outbound>) {
        if let Err(e) = self.router.deliver_all(out).await {
            warn!(error = %e, "delivery incomplete");
        }
    }

    // ── Handlers ─────────────────────────────────────────────────────────────

    async fn handle_start(&self) -> Vec<Outbound> {
        let text = match self.backend.start().await {
            Ok(resp) => resp.message.filter(|m| !m.is_empty()).unwrap_or_else(|| WELCOME_FALLBACK.to_string()),
            Err(e) => {
                warn!(error = %e, "start failed: sending fallback greeting");
                WELCOME_FALLBACK.to_string()
            }
        };
        vec![Outbound::Send(text)]
    }

    async fn handle_ask(&self, question: Option<&str>) -> Vec<Outbound> {
        let Some(question) = question else {
            return vec![missing_question("ask")];
        };
        let text = match self.backend.ask_llm(question).await {
            Ok(answer) => answer,
            Err(e) => e.to_chat_text(),
        };
        vec![Outbound::Send(text)]
    }

    async fn handle_friend(&self) -> Vec<Outbound> {
        let text = match self.backend.random_friend().await {
            Ok(friend) => friend.introduction(),
            Err(e) => e.to_chat_text(),
        };
        vec![Outbound::Send(text)]
    }

    fn handle_gn(&self) -> Vec<Outbound> {
        let mut out = vec![Outbound::Send(GOOD_NIGHT_TEXT.to_string())];
        if self.variant == Variant::Polling {
            out.push(Outbound::Send(HELP_TEXT.to_string()));
        }
        out
    }

    /// Queue `question` on the backend. The answer, if any, arrives later
    /// through the poll loop.
    async fn handle_ask_from_bot(&self, question: Option<&str>) -> Vec<Outbound> {
        let Some(question) = question else {
            return vec![missing_question("askfrombot")];
        };
        if self.variant == Variant::Sync {
            // Reached only from intent output; re-entering the LLM from its own
            // reply would loop.
            debug!("askfrombot from intent output ignored");
            return Vec::new();
        }
        match self.backend.post_user_message(question).await {
            Ok(()) => {
                debug!("question queued on backend");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "failed to queue question on backend");
                vec![Outbound::Send(ASK_FROM_BOT_FAILED.to_string())]
            }
        }
    }

    // ── Intent ───────────────────────────────────────────────────────────────

    /// Translate free text through the LLM and act on each line in order.
    async fn run_intent(&self, sender: &str, text: &str) {
        let Some(intent) = &self.intent else {
            warn!(%sender, "no intent loop configured: free text dropped");
            return;
        };

        let actions = match intent.translate(sender, text).await {
            Ok(actions) => actions,
            Err(e) => {
                warn!(%sender, error = %e, "intent translation failed");
                self.deliver(vec![Outbound::Send(format!("Error: {e}"))]).await;
                return;
            }
        };

        for action in actions {
            match action {
                IntentAction::Command(command) => {
                    debug!(command = command.token(), "intent: dispatching command");
                    let out = self.execute(&command).await;
                    self.deliver(out).await;
                }
                IntentAction::Text(line) => self.deliver(vec![Outbound::Send(line)]).await,
            }
        }
    }
}

fn missing_question(trigger: &str) -> Outbound {
    let text = commands::descriptor(trigger)
        .and_then(|d| d.params.first().map(|p| commands::missing_param_text(d, p)))
        .unwrap_or_else(|| format!("Missing parameter for /{trigger}"));
    Outbound::Reply(text)
}
