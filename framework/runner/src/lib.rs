mod cli;
mod dispatch;
mod drift;
mod engine;
mod executor;
mod init;
mod monitor;
mod orchestrator;
mod progress;
mod types;

pub mod prelude {
    pub use crate::cli::{GustWorkerCli, WorkerCommand};
    pub use crate::dispatch::{invoke_self, Dispatcher};
    pub use crate::drift::{
        check_clock_drift, HttpDateClock, ReferenceClock, CLOCK_DRIFT_THRESHOLD_MS,
    };
    pub use crate::engine::http::HttpEngine;
    pub use crate::engine::{run_load, EngineEvent, EngineReport, LatencySummary, LoadEngine};
    pub use crate::executor::Executor;
    pub use crate::init::{init, stage};
    pub use crate::monitor::start_monitor;
    pub use crate::orchestrator::{now_millis, Orchestrator, RunOutcome};
    pub use crate::progress::start_progress;
    pub use crate::types::GustResult;
    pub use gust_core::prelude::*;
}
