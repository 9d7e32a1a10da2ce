// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The lifecycle and the watch driver talk to a [`PlanExecutor`] instead of
//! spawning processes themselves. This makes it easy to swap in a fake
//! executor in tests while keeping the production implementation in
//! [`super::process`].
//!
//! [`PlanExecutorExt::finally`] attaches a cleanup stage that runs after the
//! executor on every exit path, including the future being dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::Result;
use crate::plan::Plan;

pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Per-execution context handed to executors.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
    dry_run: bool,
}

impl RunContext {
    pub fn new(cancel: CancellationToken, dry_run: bool) -> Self {
        Self { cancel, dry_run }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// A unit of work that runs a plan.
///
/// An executor may be invoked more than once (watch mode runs it once per
/// pass); invocations never overlap.
pub trait PlanExecutor: Send + Sync {
    fn execute<'a>(&'a self, ctx: &'a RunContext) -> ExecFuture<'a>;
}

impl<E: PlanExecutor + ?Sized> PlanExecutor for Box<E> {
    fn execute<'a>(&'a self, ctx: &'a RunContext) -> ExecFuture<'a> {
        (**self).execute(ctx)
    }
}

impl<E: PlanExecutor + ?Sized> PlanExecutor for Arc<E> {
    fn execute<'a>(&'a self, ctx: &'a RunContext) -> ExecFuture<'a> {
        (**self).execute(ctx)
    }
}

/// Builds the executor for a plan.
pub trait ExecutorFactory {
    fn build_executor(&self, plan: &Plan) -> Result<Box<dyn PlanExecutor>>;
}

/// Executor followed by a cleanup stage that always runs.
pub struct Finally<E, F> {
    inner: E,
    cleanup: F,
}

impl<E, F> PlanExecutor for Finally<E, F>
where
    E: PlanExecutor,
    F: Fn() -> Result<()> + Send + Sync,
{
    fn execute<'a>(&'a self, ctx: &'a RunContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let guard = CleanupGuard {
                cleanup: &self.cleanup,
            };
            let result = self.inner.execute(ctx).await;
            drop(guard);
            result
        })
    }
}

/// Runs the cleanup when dropped, so it also happens when the surrounding
/// future is dropped mid-execution.
struct CleanupGuard<'a, F: Fn() -> Result<()>> {
    cleanup: &'a F,
}

impl<F: Fn() -> Result<()>> Drop for CleanupGuard<'_, F> {
    fn drop(&mut self) {
        if let Err(err) = (self.cleanup)() {
            // The execution result takes priority.
            warn!(error = %err, "cleanup stage failed");
        }
    }
}

pub trait PlanExecutorExt: PlanExecutor + Sized {
    /// Attach `cleanup` to run after this executor, whatever its outcome.
    fn finally<F>(self, cleanup: F) -> Finally<Self, F>
    where
        F: Fn() -> Result<()> + Send + Sync,
    {
        Finally {
            inner: self,
            cleanup,
        }
    }
}

impl<E: PlanExecutor> PlanExecutorExt for E {}
