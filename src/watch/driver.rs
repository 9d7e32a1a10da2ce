// src/watch/driver.rs

//! Watch-mode supervisor.
//!
//! The loop runs one pass right away and then one pass per change batch.
//! Passes are sequential and never pre-empted: cancellation is observed
//! only while the loop is waiting for the next batch. A failing pass ends
//! the loop with that error.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

use crate::errors::{FlowrunError, Result};
use crate::exec::{PlanExecutor, RunContext};
use crate::watch::watcher::{ChangeBatch, ChangeWatcher};

pub struct WatchDriver<W: ChangeWatcher> {
    watcher: W,
}

impl<W: ChangeWatcher> WatchDriver<W> {
    pub fn new(watcher: W) -> Self {
        Self { watcher }
    }

    /// Supervise `executor` until `cancel` fires, a pass fails, or the
    /// change stream closes.
    ///
    /// Returns the error of the most recent pass, if any; cancellation
    /// itself is not an error.
    pub async fn run(
        mut self,
        executor: Arc<dyn PlanExecutor>,
        ctx: RunContext,
        cancel: CancellationToken,
    ) -> Result<()> {
        let batches = self.watcher.start()?;

        // Cancelled by the foreground on shutdown, and by the loop when it
        // ends on its own.
        let stop = CancellationToken::new();
        let pass_loop = tokio::spawn(
            watch_loop(executor, ctx, batches, stop.clone()).with_current_subscriber(),
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("stopping watch mode");
                stop.cancel();
                self.watcher.stop();
            }
            _ = stop.cancelled() => {
                debug!("watch loop ended on its own");
            }
        }

        let result = pass_loop
            .await
            .map_err(|e| FlowrunError::Other(e.into()))
            .and_then(|r| r);
        self.watcher.stop();
        result
    }
}

async fn watch_loop(
    executor: Arc<dyn PlanExecutor>,
    ctx: RunContext,
    mut batches: mpsc::Receiver<ChangeBatch>,
    stop: CancellationToken,
) -> Result<()> {
    // Wakes the foreground whichever way this loop ends.
    let _stop_on_exit = stop.clone().drop_guard();

    let mut pass = 0usize;
    run_pass(&executor, &ctx, pass, None).await?;

    loop {
        let batch = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            batch = batches.recv() => match batch {
                Some(batch) => batch,
                None => {
                    debug!("change stream closed");
                    break;
                }
            },
        };
        if batch.is_empty() {
            continue;
        }
        pass += 1;
        run_pass(&executor, &ctx, pass, Some(&batch)).await?;
    }

    Ok(())
}

async fn run_pass(
    executor: &Arc<dyn PlanExecutor>,
    ctx: &RunContext,
    pass: usize,
    batch: Option<&ChangeBatch>,
) -> Result<()> {
    match batch {
        Some(batch) => info!(pass, changed = batch.paths.len(), first = ?batch.paths.first(), "files changed; running again"),
        None => info!(pass, "initial run"),
    }
    let result = executor.execute(ctx).await;
    if let Err(err) = &result {
        warn!(pass, error = %err, "execution failed; leaving watch mode");
    }
    result
}
