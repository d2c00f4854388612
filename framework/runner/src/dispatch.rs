use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use gust_core::prelude::Script;

/// The peer-dispatch transport.
///
/// Implementations hand a sub-script to another worker of the same deployment
/// stage. The transport is best-effort: delivery is not guaranteed and a
/// peer's own execution failures are never reported back here.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Submit a sub-script for execution on a peer worker.
    ///
    /// Resolves once the submission has been accepted by the transport, not
    /// when the peer finishes. A submission error is fatal for the subtree
    /// that scheduled it.
    async fn dispatch(&self, script: Script) -> anyhow::Result<()>;
}

/// Submit `script` to a peer after `delay_ms` milliseconds.
///
/// The delay is how the orchestrator lines a chunk's cold start up with its
/// `_start`; a non-positive delay submits immediately.
pub async fn invoke_self<D: Dispatcher + ?Sized>(
    dispatcher: &D,
    delay_ms: i64,
    script: Script,
) -> anyhow::Result<()> {
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
    }
    if script.trace {
        log::info!(
            "Dispatching a chunk scheduled to start at {}",
            script
                .start
                .map(|s| s.to_string())
                .unwrap_or_else(|| "<unscheduled>".to_string())
        );
    }
    dispatcher
        .dispatch(script)
        .await
        .context("peer dispatch submission failed")
}
