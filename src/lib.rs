// src/lib.rs

pub mod artifacts;
pub mod bug_report;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod lifecycle;
pub mod logging;
pub mod plan;
pub mod watch;
pub mod workflow;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

use crate::artifacts::LocalArtifactServer;
use crate::cli::CliArgs;
use crate::config::{ConfigLocations, ResolvedInput};
use crate::errors::Result;
use crate::exec::{ExecutorConfig, ExecutorFactory, ProcessExecutorFactory};
use crate::fs::RealFileSystem;
use crate::lifecycle::ExecutionLifecycle;
use crate::plan::render::render_listing;
use crate::plan::EventPlanResolver;
use crate::watch::{FolderWatcher, IgnoreMatcher, WatchOptions};
use crate::workflow::TomlWorkflowPlanner;

pub use errors::{FlowrunError, Result as FlowrunResult};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - input resolution (env/secret/input overlays)
/// - workflow loading and plan resolution
/// - list / graph output, or execution through the lifecycle
/// - (optional) watch mode
/// - Ctrl-C handling
pub async fn run(args: CliArgs, locations: &ConfigLocations) -> Result<()> {
    let fs = RealFileSystem;

    if args.bug_report {
        print!("{}", bug_report::bug_report(&fs, locations));
        return Ok(());
    }

    let input = ResolvedInput::from_args(&args, &fs)?;
    debug!(workdir = ?input.workdir, workflows = ?input.workflows_path, "input resolved");

    let planner = TomlWorkflowPlanner::load(&fs, &input.workflows_path, input.recurse)?;
    let resolver = EventPlanResolver::new(&planner);
    let request = input.resolve_request();

    if input.list || input.graph {
        let plan = resolver.filter_plan(&request)?;
        if let Some(out) = render_listing(&plan, input.list, input.graph) {
            print!("{out}");
        }
        return Ok(());
    }

    let resolved = resolver.execution_plan(&request)?;
    info!(
        event = %resolved.event_name,
        target = %resolved.target,
        jobs = resolved.plan.job_count(),
        "plan resolved"
    );

    let factory =
        ProcessExecutorFactory::new(ExecutorConfig::from_input(&input, &resolved.event_name));
    let executor = factory.build_executor(&resolved.plan)?;

    let cancel = CancellationToken::new();
    // Also ends the Ctrl-C listener once we return.
    let _cancel_on_exit = cancel.clone().drop_guard();
    spawn_ctrl_c_handler(cancel.clone());

    let server = LocalArtifactServer::new();
    let lifecycle = ExecutionLifecycle::new(&server, input.artifacts.clone(), input.dry_run);

    if input.watch {
        let ignore = IgnoreMatcher::from_gitignore(&fs, &input.workdir);
        let watcher = FolderWatcher::new(WatchOptions::new(&input.workdir), ignore);
        lifecycle
            .run_watch(Arc::from(executor), watcher, &cancel)
            .await
    } else {
        lifecycle.run_once(executor, &cancel).await
    }
}

/// Ctrl-C → cooperative cancellation.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(
        async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => {
                        info!("interrupt received; shutting down");
                        cancel.cancel();
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
                },
                _ = cancel.cancelled() => {}
            }
        }
        .with_current_subscriber(),
    );
}
