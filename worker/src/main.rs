mod dispatchers;
mod serve;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use gust_runner::prelude::*;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinSet;

use crate::dispatchers::PeerDispatcher;

fn main() -> GustResult<()> {
    let cli = init();
    let stage = stage();
    let executor = Executor::new()?;

    // Ctrl-C trips the worker-level shutdown. A single invocation has no
    // cancellation of its own; this tears down the whole worker.
    let shutdown = executor.shutdown_handle().clone();
    executor.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted; shutting the worker down");
            shutdown.trigger();
        }
    });

    if let Some(url) = &cli.time_source {
        let clock = HttpDateClock::new(url)?;
        executor.spawn(async move { check_clock_drift(&clock).await });
    }

    match &cli.command {
        WorkerCommand::Run { script } => run_file(&executor, &cli, &stage, script),
        WorkerCommand::Serve { listen } => {
            let peer = cli
                .peer
                .clone()
                .unwrap_or_else(|| format!("http://{listen}"));
            let orchestrator =
                Orchestrator::new(PeerDispatcher::http(&peer, &stage)?, HttpEngine::new()?);
            start_monitor(executor.shutdown_handle().listener());
            executor.execute_in_place(serve::serve(*listen, &stage, orchestrator))
        }
    }
}

fn run_file(
    executor: &Executor,
    cli: &GustWorkerCli,
    stage: &str,
    path: &Path,
) -> GustResult<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read the script at {}", path.display()))?;
    let script: Script =
        serde_json::from_str(&raw).context("the file does not hold a load-test script")?;

    if !cli.no_progress {
        start_progress(
            Duration::from_secs(script_length(&script)?),
            executor.shutdown_handle().listener(),
        );
    }
    start_monitor(executor.shutdown_handle().listener());

    // Without a peer fleet this worker is a fleet of one: dispatched chunks
    // loop back and each re-enters the orchestrator as a fresh invocation.
    let (queue, inbox) = unbounded_channel();
    let dispatcher = match &cli.peer {
        Some(peer) => PeerDispatcher::http(peer, stage)?,
        None => PeerDispatcher::loopback(queue),
    };
    let orchestrator = Orchestrator::new(dispatcher, HttpEngine::new()?);

    executor.execute_in_place(async move {
        let outcome = orchestrator.run(script).await?;
        println!("{}", outcome.summary());
        drive_loopback(&orchestrator, inbox).await
    })
}

/// Run every script that comes back over the loopback, concurrently, until
/// the queue drains and nothing is in flight.
async fn drive_loopback(
    orchestrator: &Orchestrator<PeerDispatcher, HttpEngine>,
    mut inbox: UnboundedReceiver<Script>,
) -> GustResult<()> {
    let mut invocations = JoinSet::new();
    loop {
        while let Ok(script) = inbox.try_recv() {
            let orchestrator = orchestrator.clone();
            invocations.spawn(async move { orchestrator.run(script).await });
        }
        match invocations.join_next().await {
            Some(joined) => match joined.context("an invocation died")? {
                Ok(outcome) => log::info!("Invocation complete: {}", outcome.summary()),
                // Fatal for that subtree only; the rest of the fleet-of-one
                // keeps going.
                Err(e) => log::error!("Invocation failed: {e:#}"),
            },
            None => break Ok(()),
        }
    }
}
