//! The bundled HTTP arrival engine.
//!
//! Executes a leaf script by firing GET requests at `config.target`, pacing
//! arrivals to follow the script's phase shapes.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use gust_core::prelude::{phase_length, PhaseShape, Script};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::{EngineEvent, EngineReport, LoadEngine};

pub struct HttpEngine {
    client: reqwest::Client,
}

impl HttpEngine {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build the HTTP client")?;
        Ok(Self { client })
    }
}

enum RequestOutcome {
    Completed { code: u16, latency_ms: f64 },
    Failed { reason: String },
}

/// How many arrivals each second of a phase should produce.
///
/// A ramp whose endpoints are both zero is rejected; the splitter guarantees
/// it never emits one.
fn arrivals_per_second(shape: PhaseShape) -> anyhow::Result<Vec<u64>> {
    Ok(match shape {
        PhaseShape::Constant {
            arrival_rate,
            duration,
        } => vec![arrival_rate; duration as usize],
        PhaseShape::Ramp {
            arrival_rate,
            ramp_to,
            duration,
        } => {
            anyhow::ensure!(
                arrival_rate.max(ramp_to) > 0,
                "a ramp must reach a non-zero rate"
            );
            let diff = ramp_to as f64 - arrival_rate as f64;
            (0..duration)
                .map(|second| {
                    // Sample the rate line at the middle of the second.
                    (arrival_rate as f64 + diff * (second as f64 + 0.5) / duration as f64).round()
                        as u64
                })
                .collect()
        }
        PhaseShape::Count {
            arrival_count,
            duration,
        } => {
            if duration == 0 {
                Vec::new()
            } else {
                let base = arrival_count / duration;
                let leftover = arrival_count % duration;
                (0..duration)
                    .map(|second| base + u64::from(second < leftover))
                    .collect()
            }
        }
        PhaseShape::Pause { pause } => vec![0; pause as usize],
    })
}

/// Millisecond offsets into a phase at which arrivals fire, spread evenly
/// within each second.
fn fire_offsets_ms(per_second: &[u64]) -> Vec<u64> {
    let mut offsets = Vec::new();
    for (second, &arrivals) in per_second.iter().enumerate() {
        for i in 0..arrivals {
            offsets.push(second as u64 * 1_000 + i * 1_000 / arrivals);
        }
    }
    offsets
}

#[async_trait]
impl LoadEngine for HttpEngine {
    async fn run(
        &self,
        script: &Script,
        events: UnboundedSender<EngineEvent>,
    ) -> anyhow::Result<EngineReport> {
        let target = script
            .config
            .extra
            .get("target")
            .and_then(Value::as_str)
            .context("config.target must name the service under test")?
            .to_string();

        let started = Instant::now();
        let mut inflight: JoinSet<RequestOutcome> = JoinSet::new();
        let mut report = EngineReport::default();
        let mut phase_offset_ms = 0u64;

        for (index, phase) in script.config.phases.iter().enumerate() {
            let shape = phase
                .shape()
                .with_context(|| format!("phases[{index}] has no recognizable shape"))?;
            let _ = events.send(EngineEvent::PhaseStarted {
                index,
                detail: phase.summary(),
            });

            for offset in fire_offsets_ms(&arrivals_per_second(shape)?) {
                let fire_at = started + Duration::from_millis(phase_offset_ms + offset);
                let client = self.client.clone();
                let target = target.clone();
                report.requests_fired += 1;
                inflight.spawn(async move {
                    tokio::time::sleep_until(fire_at).await;
                    let sent = Instant::now();
                    match client.get(&target).send().await {
                        Ok(response) => RequestOutcome::Completed {
                            code: response.status().as_u16(),
                            latency_ms: sent.elapsed().as_secs_f64() * 1_000.0,
                        },
                        Err(e) => RequestOutcome::Failed {
                            reason: if e.is_timeout() {
                                "timeout".to_string()
                            } else if e.is_connect() {
                                "connection failed".to_string()
                            } else {
                                "request failed".to_string()
                            },
                        },
                    }
                });
            }

            phase_offset_ms += phase_length(phase).unwrap_or(0) * 1_000;
            tokio::time::sleep_until(started + Duration::from_millis(phase_offset_ms)).await;
            let _ = events.send(EngineEvent::PhaseCompleted { index });
        }

        while let Some(joined) = inflight.join_next().await {
            match joined {
                Ok(RequestOutcome::Completed { code, latency_ms }) => {
                    report.requests_completed += 1;
                    *report.codes.entry(code).or_default() += 1;
                    report.latencies_ms.push(latency_ms);
                }
                Ok(RequestOutcome::Failed { reason }) => {
                    *report.errors.entry(reason).or_default() += 1;
                }
                Err(_) => {
                    *report.errors.entry("request task died".to_string()).or_default() += 1;
                }
            }
        }
        report.finalize_latency();
        let _ = events.send(EngineEvent::Done);

        Ok(report)
    }
}
