use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct GustWorkerCli {
    /// Base URL of the peer worker fleet; oversized sub-scripts are POSTed
    /// there instead of being executed locally
    #[clap(long)]
    pub peer: Option<String>,

    /// HTTP time source probed once at startup to warn about clock drift
    #[clap(long)]
    pub time_source: Option<String>,

    /// Do not show a progress bar while emitting load
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: WorkerCommand,
}

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// Execute a load-test script from a file
    Run {
        /// Path to the script JSON
        script: std::path::PathBuf,
    },
    /// Accept scripts over HTTP, executing each as a fresh invocation
    Serve {
        /// Address to listen on
        #[clap(long, default_value = "127.0.0.1:8080")]
        listen: std::net::SocketAddr,
    },
}
