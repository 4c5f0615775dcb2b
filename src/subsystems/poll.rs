//! Pending-message poller: the polling variant's outbound path.
//!
//! Every `interval_ms` the poller asks the backend for queued messages,
//! rewrites the explorer URL in each one and delivers them in order to the
//! active conversation. Fetch failures are logged and the cycle ends; nothing
//! is retried and nothing is acknowledged.
//!
//! A cycle runs to completion inside the loop task before the next tick is
//! awaited, and missed ticks are skipped, so a slow backend never causes
//! overlapping cycles.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::backend::BackendClient;
use crate::config::PollConfig;
use crate::conversation::Outbound;
use crate::router::ResponseRouter;
use crate::subsystems::runtime::{Component, ComponentFuture};

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The backend could not be reached or answered non-2xx.
    FetchFailed,
    /// `delivered` of `fetched` messages reached the user.
    Fetched { fetched: usize, delivered: usize },
}

pub struct PendingPoller {
    id: String,
    backend: BackendClient,
    router: ResponseRouter,
    config: PollConfig,
}

impl PendingPoller {
    pub fn new(id: impl Into<String>, backend: BackendClient, router: ResponseRouter, config: PollConfig) -> Self {
        Self { id: id.into(), backend, router, config }
    }

    /// Run a single fetch-and-deliver cycle.
    pub async fn poll_once(&self) -> PollOutcome {
        let messages = match self.backend.get_pending_messages().await {
            Ok(m) => m,
            Err(e) => {
                warn!(poller = %self.id, error = %e, "error polling backend");
                return PollOutcome::FetchFailed;
            }
        };

        if messages.is_empty() {
            trace!(poller = %self.id, "no pending messages");
            return PollOutcome::Fetched { fetched: 0, delivered: 0 };
        }

        let fetched = messages.len();
        debug!(poller = %self.id, fetched, "delivering pending messages");

        let mut delivered = 0;
        for message in messages {
            let text = rewrite(&message, &self.config.rewrite_from, &self.config.rewrite_to);
            match self.router.deliver(Outbound::Send(text)).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(poller = %self.id, error = %e, "pending message not delivered"),
            }
        }
        PollOutcome::Fetched { fetched, delivered }
    }
}

impl Component for PendingPoller {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            let period = Duration::from_millis(self.config.interval_ms);
            // First cycle one full period after start.
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(poller = %self.id, interval_ms = self.config.interval_ms, "pending-message poller running");

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        info!(poller = %self.id, "shutdown signal received: stopping poller");
                        break;
                    }

                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Replace every occurrence of `from` with `to`. An empty `from` disables the
/// rewrite.
pub fn rewrite(message: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return message.to_string();
    }
    message.replace(from, to)
}
