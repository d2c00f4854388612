//! The seam between the orchestrator and the load-generation engine that
//! executes leaf chunks.

pub mod http;

use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use gust_core::prelude::Script;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

/// Progress notifications emitted by an engine while it runs a leaf script.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    PhaseStarted { index: usize, detail: String },
    PhaseCompleted { index: usize },
    Done,
}

/// Aggregated outcome of running one leaf script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    pub requests_fired: u64,
    pub requests_completed: u64,
    /// Responses by HTTP status code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub codes: BTreeMap<u16, u64>,
    /// Requests that never produced a response, bucketed by failure kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, u64>,
    pub latency: LatencySummary,
    /// Raw samples in milliseconds. Stripped by [`run_load`] so that only the
    /// summary leaves the worker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub latencies_ms: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl EngineReport {
    /// Fill in the latency summary from the collected raw samples.
    pub fn finalize_latency(&mut self) {
        if self.latencies_ms.is_empty() {
            return;
        }
        let mut sorted = self.latencies_ms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let percentile = |q: f64| sorted[((sorted.len() - 1) as f64 * q).round() as usize];
        self.latency = LatencySummary {
            min_ms: sorted[0],
            mean_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
            max_ms: sorted[sorted.len() - 1],
            p95_ms: percentile(0.95),
            p99_ms: percentile(0.99),
        };
    }
}

/// A load-generation engine capable of executing one leaf script.
#[async_trait]
pub trait LoadEngine: Send + Sync {
    async fn run(
        &self,
        script: &Script,
        events: UnboundedSender<EngineEvent>,
    ) -> anyhow::Result<EngineReport>;
}

/// Drive the engine over a leaf script.
///
/// Wires the engine's events into the log for diagnostics and strips the raw
/// latency samples from the returned report.
pub async fn run_load<E: LoadEngine + ?Sized>(
    start: u64,
    script: Script,
    engine: &E,
) -> anyhow::Result<EngineReport> {
    let trace = script.trace;
    let (events, mut receiver) = unbounded_channel();

    let watcher = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                EngineEvent::PhaseStarted { index, detail } => {
                    if trace {
                        log::info!("Starting phases[{index}]: {detail}");
                    } else {
                        log::debug!("Starting phases[{index}]");
                    }
                }
                EngineEvent::PhaseCompleted { index } => log::debug!("Finished phases[{index}]"),
                EngineEvent::Done => log::debug!("Load emission finished"),
            }
        }
    });

    let result = engine
        .run(&script, events)
        .await
        .with_context(|| format!("load engine failed on the chunk entered at {start}"));
    // The engine's event sender is gone once run returns, so the watcher
    // drains and exits on its own.
    let _ = watcher.await;

    let mut report = result?;
    report.latencies_ms.clear();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_summary_from_samples() {
        let mut report = EngineReport {
            latencies_ms: (1..=100).map(|n| n as f64).collect(),
            ..Default::default()
        };
        report.finalize_latency();
        assert_eq!(report.latency.min_ms, 1.0);
        assert_eq!(report.latency.max_ms, 100.0);
        assert_eq!(report.latency.mean_ms, 50.5);
        assert_eq!(report.latency.p95_ms, 95.0);
        assert_eq!(report.latency.p99_ms, 99.0);
    }

    #[test]
    fn latency_summary_of_an_empty_report_stays_zeroed() {
        let mut report = EngineReport::default();
        report.finalize_latency();
        assert_eq!(report.latency, LatencySummary::default());
    }

    struct SampleEngine;

    #[async_trait]
    impl LoadEngine for SampleEngine {
        async fn run(
            &self,
            _script: &Script,
            events: UnboundedSender<EngineEvent>,
        ) -> anyhow::Result<EngineReport> {
            let _ = events.send(EngineEvent::Done);
            Ok(EngineReport {
                requests_fired: 3,
                requests_completed: 3,
                latencies_ms: vec![1.0, 2.0, 3.0],
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn run_load_strips_raw_latency_samples() {
        let script = gust_core::prelude::Script::from_phases(vec![
            gust_core::prelude::Phase::pause(1),
        ]);
        let report = run_load(0, script, &SampleEngine).await.unwrap();
        assert_eq!(report.requests_completed, 3);
        assert!(report.latencies_ms.is_empty());
    }
}
