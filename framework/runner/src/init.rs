use clap::Parser;

use crate::cli::GustWorkerCli;

/// Initialise logging and parse the worker command line.
pub fn init() -> GustWorkerCli {
    env_logger::init();

    GustWorkerCli::parse()
}

/// The deployment stage this worker belongs to.
///
/// Dispatch targets are qualified by stage so that orchestrator copies only
/// route to peers of the same deployment generation.
pub fn stage() -> String {
    std::env::var("GUST_STAGE").unwrap_or_else(|_| "dev".to_string())
}
