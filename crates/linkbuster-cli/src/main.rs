use linkbuster_core::logging::{self, LogTarget};

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible.
    if logging::init() == LogTarget::Stderr {
        eprintln!("linkbuster: log file unavailable, logging to stderr");
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("linkbuster error: {:#}", err);
        std::process::exit(1);
    }
}
