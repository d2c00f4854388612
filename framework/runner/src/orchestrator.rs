//! The recursive run loop that sizes a script down to worker-sized chunks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use gust_core::prelude::{
    script_length, script_width, split_script_by_length, split_script_by_width, validate, Script,
    ScriptHalves, SplitSettings,
};
use tokio::task::JoinSet;

use crate::dispatch::{invoke_self, Dispatcher};
use crate::engine::{run_load, EngineReport, LoadEngine};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis() as u64)
        .unwrap_or(0)
}

/// The result of one orchestrator invocation.
#[derive(Debug)]
pub enum RunOutcome {
    /// The script was too big for one worker; every piece has been dispatched
    /// or executed and the message carries the genesis and wall-clock bracket.
    Dispatched { message: String },
    /// The script fit in this worker and was run by the engine.
    Ran(EngineReport),
}

impl RunOutcome {
    pub fn summary(&self) -> String {
        match self {
            RunOutcome::Dispatched { message } => message.clone(),
            RunOutcome::Ran(report) => serde_json::to_string_pretty(report)
                .unwrap_or_else(|_| format!("{report:?}")),
        }
    }
}

/// Decides whether a script needs length-splitting, width-splitting or direct
/// execution, and tracks the completion of everything it schedules.
///
/// One instance serves any number of invocations; each call to [`run`] is an
/// independent task graph. Peers re-enter through [`run`] as well, so a
/// sub-script received over the transport gets the same treatment as a
/// top-level submission. Cloning is cheap and shares the adapters.
///
/// [`run`]: Orchestrator::run
pub struct Orchestrator<D, E> {
    dispatcher: Arc<D>,
    engine: Arc<E>,
}

impl<D, E> Clone for Orchestrator<D, E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<D, E> Orchestrator<D, E>
where
    D: Dispatcher + 'static,
    E: LoadEngine + 'static,
{
    pub fn new(dispatcher: D, engine: E) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            engine: Arc::new(engine),
        }
    }

    /// Entry point for a fresh invocation.
    ///
    /// Validates the script, then drives the split-and-dispatch loop to
    /// completion under a defensive deadline so a branch that never reports
    /// back cannot hang the invocation forever.
    pub async fn run(&self, script: Script) -> anyhow::Result<RunOutcome> {
        let settings = SplitSettings::resolve(&script)?;
        validate(&script, &settings)?;

        let time_now = now_millis();
        let total = script_length(&script)?;
        // Waiting for a parent-assigned start is legitimate and must not
        // count against the stall deadline.
        let scheduled_wait = script
            .start
            .map_or(0, |start| start.saturating_sub(time_now));
        let deadline = Duration::from_millis(
            scheduled_wait
                + (total + settings.max_chunk_duration_s) * 1_000
                + 2 * settings.time_buffer_ms,
        );
        tokio::time::timeout(deadline, self.clone().execute(time_now, script, settings))
            .await
            .map_err(|_| {
                anyhow::anyhow!("completion tracking stalled; gave up after {deadline:?}")
            })?
    }

    /// The split-or-execute decision, recursing on chunks that are still too
    /// wide after a length split. Only runs on scripts that already passed
    /// validation; chunks and remainders are valid by construction.
    fn execute(
        self,
        time_now: u64,
        mut script: Script,
        settings: SplitSettings,
    ) -> BoxFuture<anyhow::Result<RunOutcome>> {
        Box::pin(async move {
            let genesis = *script.genesis.get_or_insert(time_now);
            let trace = script.trace;
            let total = script_length(&script)?;
            let width = script_width(&script)?;

            if total > settings.max_chunk_duration_s {
                // The script runs longer than one worker may: peel off the
                // first chunk-sized piece and push the rest into the future.
                let ScriptHalves {
                    mut chunk,
                    mut remainder,
                } = split_script_by_length(script, settings.max_chunk_duration_s)?;

                let chunk_start = *chunk
                    .start
                    .get_or_insert(time_now + settings.time_buffer_ms);
                let remainder_start = chunk_start + settings.max_chunk_duration_s * 1_000;
                remainder.start = Some(remainder_start);

                if trace {
                    log::info!(
                        "Split a {total}s script: {}s chunk starting at {chunk_start}, \
                         remainder follows at {remainder_start}",
                        settings.max_chunk_duration_s
                    );
                }

                let mut branches: JoinSet<anyhow::Result<()>> = JoinSet::new();
                if script_width(&chunk)? > settings.max_chunk_rps as f64 {
                    // Still too wide for one worker; split it here instead of
                    // bouncing it off a peer only for the peer to split it.
                    let this = self.clone();
                    branches
                        .spawn(async move { this.execute(time_now, chunk, settings).await.map(drop) });
                } else {
                    let this = self.clone();
                    let delay = delay_until(chunk_start, settings.time_buffer_ms);
                    branches.spawn(async move { invoke_self(&*this.dispatcher, delay, chunk).await });
                }
                let this = self.clone();
                let delay = delay_until(remainder_start, settings.time_buffer_ms);
                branches.spawn(async move { invoke_self(&*this.dispatcher, delay, remainder).await });

                drain(branches).await?;
                Ok(RunOutcome::Dispatched {
                    message: completion_message(genesis, time_now),
                })
            } else if width > settings.max_chunk_rps as f64 {
                // The script is short enough but too wide: slice it into
                // concurrent lanes that all start together.
                let start = *script
                    .start
                    .get_or_insert(time_now + settings.time_buffer_ms);
                let planned = (width / settings.max_chunk_rps as f64).ceil() as u64;
                if trace {
                    log::info!(
                        "Splitting a {width} rps script into {planned} lanes of at most {} rps, \
                         all starting at {start}",
                        settings.max_chunk_rps
                    );
                }

                let mut branches: JoinSet<anyhow::Result<()>> = JoinSet::new();
                let mut current = script;
                let mut lanes = 0u64;
                loop {
                    let ScriptHalves { chunk, remainder } =
                        split_script_by_width(&current, settings.max_chunk_rps)?;
                    lanes += 1;
                    let this = self.clone();
                    let delay = delay_until(start, settings.time_buffer_ms);
                    branches.spawn(async move { invoke_self(&*this.dispatcher, delay, chunk).await });

                    current = remainder;
                    if script_width(&current)? <= 0.0 {
                        break;
                    }
                }
                if lanes != planned {
                    log::debug!("Width split produced {lanes} lanes where {planned} were predicted");
                }

                drain(branches).await?;
                Ok(RunOutcome::Dispatched {
                    message: completion_message(genesis, time_now),
                })
            } else {
                // Leaf: the script fits in this worker. Hold until its
                // scheduled start, then let the engine emit the load.
                let start = *script.start.get_or_insert(time_now);
                let delay = start as i64 - now_millis() as i64;
                if delay > 0 {
                    if trace {
                        log::info!("Holding {delay}ms for the scheduled start");
                    }
                    tokio::time::sleep(Duration::from_millis(delay as u64)).await;
                }
                let report = run_load(time_now, script, &*self.engine).await?;
                Ok(RunOutcome::Ran(report))
            }
        })
    }
}

/// How long to wait before submitting a chunk that must start at `start`:
/// the gap from now, less the cold-start buffer the peer needs.
fn delay_until(start: u64, buffer_ms: u64) -> i64 {
    start as i64 - now_millis() as i64 - buffer_ms as i64
}

async fn drain(mut branches: JoinSet<anyhow::Result<()>>) -> anyhow::Result<()> {
    while let Some(joined) = branches.join_next().await {
        joined.context("an orchestration branch died")??;
    }
    Ok(())
}

fn completion_message(genesis: u64, entered: u64) -> String {
    format!(
        "Load test with genesis {genesis} fully dispatched; this invocation ran {} -> {}",
        format_millis(entered),
        format_millis(now_millis())
    )
}

fn format_millis(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}
