// src/main.rs

use flowrun::config::{effective_args, ConfigLocations};
use flowrun::fs::RealFileSystem;
use flowrun::logging::LogContext;
use flowrun::{cli, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("flowrun error: {err}");
        std::process::exit(1);
    }
}

async fn run_main() -> flowrun::FlowrunResult<()> {
    let locations = ConfigLocations::discover()?;
    let argv = effective_args(&RealFileSystem, &locations, std::env::args_os().skip(1));
    let args = cli::parse_from(argv).unwrap_or_else(|e| e.exit());

    let log = LogContext::from_args(&args);
    log.scope(run(args, &locations)).await
}
