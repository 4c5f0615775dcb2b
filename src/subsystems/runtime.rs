//! Component runtime: shared scaffolding for the bot's long-running tasks.
//!
//! # Component model
//!
//! A [`Component`] is any independently-runnable unit: a transport channel
//! (console…) or a background loop (pending-message poller). Components
//! capture their shared state (`Arc<Dispatcher>`, `ResponseRouter`, …) at
//! construction time, then are handed to [`spawn_components`].
//!
//! Any component error cancels the shared [`CancellationToken`] so sibling
//! components shut down cleanly.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable unit.
///
/// [`Component::run`] is called once by [`spawn_components`] and should run
/// until `shutdown` is cancelled or the component's own work is done.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the component and return its async run-loop as a boxed future.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

/// An opaque handle to a running component set.
pub struct RuntimeHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl RuntimeHandle {
    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Runtime(format!("runtime task panicked: {e}"))),
        }
    }
}

/// Spawn each [`Component`] as an independent Tokio task and return a
/// [`RuntimeHandle`] that resolves when all components have exited.
///
/// If any component returns `Err` or panics, `shutdown` is cancelled and the
/// first error is returned once the rest have drained.
pub fn spawn_components(components: Vec<Box<dyn Component>>, shutdown: CancellationToken) -> RuntimeHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            let id = component.id().to_string();
            debug!(component = %id, "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Runtime(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("component error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    RuntimeHandle { inner: handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Waiter;

    impl Component for Waiter {
        fn id(&self) -> &str {
            "waiter"
        }

        fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    struct Failer;

    impl Component for Failer {
        fn id(&self) -> &str {
            "failer"
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async { Err(AppError::Comms("boom".into())) })
        }
    }

    #[tokio::test]
    async fn clean_shutdown_joins_ok() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waiter), Box::new(Waiter)], shutdown.clone());
        shutdown.cancel();
        handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn error_cancels_siblings_and_is_returned() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waiter), Box::new(Failer)], shutdown.clone());
        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(shutdown.is_cancelled());
    }

    struct LatePanic;

    impl Component for LatePanic {
        fn id(&self) -> &str {
            "late-panic"
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(give_up())
        }
    }

    async fn give_up() -> Result<(), AppError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        panic!("gave up")
    }

    #[tokio::test(start_paused = true)]
    async fn panic_is_a_runtime_error_and_stops_siblings() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waiter), Box::new(LatePanic)], shutdown.clone());

        let err = handle.join().await.unwrap_err();

        assert!(matches!(err, AppError::Runtime(ref m) if m.contains("panicked")), "got {err}");
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn empty_set_finishes_immediately() {
        spawn_components(Vec::new(), CancellationToken::new()).join().await.unwrap();
    }
}
