use std::sync::Arc;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Tells every part of a worker to stop what it is doing.
///
/// Tripped when the operator interrupts the worker. A single orchestrator
/// invocation has no cancellation of its own; this is the worker-level switch
/// that tears down progress display, monitoring and in-flight orchestration
/// together.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    /// Signal shutdown to every listener.
    pub fn trigger(&self) {
        if self.sender.send(()).is_err() {
            // Nobody is listening, which is fine when the worker is already
            // winding down.
            log::debug!("Shutdown triggered with no listeners");
        }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener::new(self.sender.subscribe())
    }
}

/// A handed-out subscription to the shutdown signal.
#[derive(Clone, Debug)]
pub struct ShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
}

impl ShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Point-in-time check whether shutdown has been signalled.
    pub fn is_triggered(&mut self) -> bool {
        let Ok(mut receiver) = self.receiver.try_lock() else {
            return false;
        };
        match receiver.try_recv() {
            Ok(()) => true,
            // A closed channel means the handle is gone; treat it as shutdown.
            Err(TryRecvError::Closed) => true,
            Err(_) => false,
        }
    }

    /// Wait until shutdown is signalled. Safe to race against other futures
    /// to cancel work in progress.
    pub async fn triggered(&mut self) {
        // A recv error means the handle was dropped, which also counts.
        let _ = self.receiver.lock().await.recv().await;
    }
}

/// The error surfaced from work that was cancelled by a shutdown signal.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownError {
    msg: String,
}

impl Default for ShutdownError {
    fn default() -> Self {
        Self {
            msg: "execution cancelled by shutdown signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_sees_the_trigger() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.listener();
        assert!(!listener.is_triggered());

        handle.trigger();
        assert!(listener.is_triggered());
    }

    #[tokio::test]
    async fn dropped_handle_counts_as_shutdown() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.listener();
        drop(handle);
        assert!(listener.is_triggered());
    }

    #[tokio::test]
    async fn wait_resolves_on_trigger() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.listener();
        let waiter = tokio::spawn(async move { listener.triggered().await });
        handle.trigger();
        waiter.await.unwrap();
    }
}
