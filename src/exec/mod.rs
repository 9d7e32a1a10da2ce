// src/exec/mod.rs

//! Plan execution layer.
//!
//! - [`backend`] defines the [`PlanExecutor`] / [`ExecutorFactory`] seam the
//!   lifecycle and watch driver use, plus the `finally` cleanup wrapper.
//! - [`process`] is the production executor that runs job scripts locally.
//! - [`job_runner`] spawns a single job process and forwards its output.

pub mod backend;
pub mod job_runner;
pub mod process;

pub use backend::{
    ExecFuture, ExecutorFactory, Finally, PlanExecutor, PlanExecutorExt, RunContext,
};
pub use job_runner::SecretMasker;
pub use process::{ExecutorConfig, ProcessExecutorFactory, ProcessPlanExecutor};
