//! End-to-end flows through the public API: dispatcher, router, poller and
//! intent loop against a mocked backend.

use std::path::Path;
use std::sync::{Arc, Mutex};

use wai_bot::backend::BackendClient;
use wai_bot::config::{self, Config, Overrides, Variant};
use wai_bot::conversation::{ConversationHandle, InboundMessage, SendFuture};
use wai_bot::dispatcher::Dispatcher;
use wai_bot::intent::IntentLoop;
use wai_bot::llm::LlmProvider;
use wai_bot::llm::providers::dummy::DummyProvider;
use wai_bot::router::ResponseRouter;
use wai_bot::subsystems::poll::{PendingPoller, PollOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Recorder {
    sender: String,
    lines: Mutex<Vec<String>>,
}

impl Recorder {
    fn new(sender: &str) -> Arc<Self> {
        Arc::new(Self { sender: sender.into(), lines: Mutex::new(Vec::new()) })
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ConversationHandle for Recorder {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn send(&self, text: String) -> SendFuture<'_> {
        self.lines.lock().unwrap().push(text);
        Box::pin(async { Ok(()) })
    }

    fn reply(&self, text: String) -> SendFuture<'_> {
        self.lines.lock().unwrap().push(text);
        Box::pin(async { Ok(()) })
    }
}

#[test]
fn shipped_config_parses() {
    let cfg = config::load_from(Path::new("config/default.toml"), &Overrides::default()).unwrap();
    assert_eq!(cfg.variant, Variant::Polling);
    assert_eq!(cfg.poll.interval_ms, 5000);
    assert_eq!(cfg.llm.provider, "dummy");
}

#[tokio::test]
async fn polling_round_trip_reaches_latest_sender() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user-message"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-pending-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": ["done: https://sepolia.basescan.org/tx/0xfeed"]
        })))
        .mount(&server)
        .await;

    let cfg = Config::test_default(&server.uri(), Variant::Polling);
    let backend = BackendClient::new(&cfg.backend).unwrap();
    let router = ResponseRouter::new();
    let dispatcher = Dispatcher::new(backend.clone(), router.clone(), cfg.variant, None);
    let poller = PendingPoller::new("poll0", backend, router, cfg.poll.clone());

    let alice = Recorder::new("0xA11CE");
    let bob = Recorder::new("0xB0B");
    dispatcher.handle_event(InboundMessage::text("0xA11CE", "send 1 eth to bob"), alice.clone()).await;
    dispatcher.handle_event(InboundMessage::text("0xB0B", "hi"), bob.clone()).await;

    let outcome = poller.poll_once().await;

    assert_eq!(outcome, PollOutcome::Fetched { fetched: 1, delivered: 1 });
    // Single active conversation: the last sender gets the async answer.
    assert!(alice.lines().is_empty());
    assert_eq!(bob.lines(), vec!["done: https://base-sepolia.blockscout.com/tx/0xfeed"]);
}

#[tokio::test]
async fn sync_intent_mixes_commands_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask-llm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"answer": "ENS maps names to addresses."})))
        .mount(&server)
        .await;

    let cfg = Config::test_default(&server.uri(), Variant::Sync);
    let backend = BackendClient::new(&cfg.backend).unwrap();
    let intent = IntentLoop::new(
        LlmProvider::Dummy(DummyProvider::with_reply("Let me check.\n/ask what is ens\n\n/unknowncmd\nBye")),
        cfg.intent.history_cap,
    );
    let dispatcher = Dispatcher::new(backend, ResponseRouter::new(), cfg.variant, Some(intent));

    let user = Recorder::new("0xABC");
    dispatcher.handle_event(InboundMessage::text("0xABC", "tell me about ens"), user.clone()).await;

    assert_eq!(
        user.lines(),
        vec![
            "Let me check.",
            "ENS maps names to addresses.",
            "Unknown command. Please use /help to see the list of available commands.",
            "Bye",
        ]
    );
    assert_eq!(dispatcher.intent().unwrap().history("0xABC").len(), 2);
}
