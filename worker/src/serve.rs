use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use gust_runner::prelude::*;

use crate::dispatchers::PeerDispatcher;

type WorkerOrchestrator = Orchestrator<PeerDispatcher, HttpEngine>;

/// Accept scripts over HTTP.
///
/// The route is qualified by deployment stage so a worker only takes
/// sub-scripts from its own generation of the fleet.
pub async fn serve(
    listen: SocketAddr,
    stage: &str,
    orchestrator: WorkerOrchestrator,
) -> GustResult<()> {
    let app = Router::new()
        .route(&format!("/{stage}/run"), post(accept_script))
        .with_state(orchestrator);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Accepting scripts on {listen} for stage {stage}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn accept_script(
    State(orchestrator): State<WorkerOrchestrator>,
    Json(script): Json<Script>,
) -> StatusCode {
    // Fire and forget: the sender is acknowledged as soon as the script is
    // accepted and never learns how execution went.
    tokio::spawn(async move {
        match orchestrator.run(script).await {
            Ok(outcome) => log::info!("Invocation complete: {}", outcome.summary()),
            Err(e) => log::error!("Invocation failed: {e:#}"),
        }
    });
    StatusCode::ACCEPTED
}
