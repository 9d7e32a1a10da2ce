// src/exec/process.rs

//! Production executor: runs each job's `run` script as a local process.
//!
//! Stages run one after the other. Jobs inside a stage run concurrently; the
//! first failure cancels the rest of the stage and aborts the plan.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

use crate::config::{KeyValueMap, ResolvedInput};
use crate::errors::{FlowrunError, Result};
use crate::exec::backend::{ExecFuture, ExecutorFactory, PlanExecutor, RunContext};
use crate::exec::job_runner::{run_job, SecretMasker};
use crate::plan::{Plan, Stage};

/// Settings shared by every job of an executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub workdir: PathBuf,
    pub event_name: String,
    pub env: KeyValueMap,
    pub secrets: KeyValueMap,
    pub inputs: KeyValueMap,
    pub platforms: KeyValueMap,
    pub artifact_url: Option<String>,
    /// Forward job output at info level (debug otherwise).
    pub log_output: bool,
    pub insecure_secrets: bool,
}

impl ExecutorConfig {
    pub fn from_input(input: &ResolvedInput, event_name: &str) -> Self {
        Self {
            workdir: input.workdir.clone(),
            event_name: event_name.to_string(),
            env: input.env.clone(),
            secrets: input.secrets.clone(),
            inputs: input.inputs.clone(),
            platforms: input.platforms.clone(),
            artifact_url: input.artifacts.url(),
            log_output: !input.quiet,
            insecure_secrets: input.insecure_secrets,
        }
    }
}

/// Builds [`ProcessPlanExecutor`]s sharing one [`ExecutorConfig`].
#[derive(Debug, Clone)]
pub struct ProcessExecutorFactory {
    config: Arc<ExecutorConfig>,
}

impl ProcessExecutorFactory {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl ExecutorFactory for ProcessExecutorFactory {
    fn build_executor(&self, plan: &Plan) -> Result<Box<dyn PlanExecutor>> {
        Ok(Box::new(ProcessPlanExecutor::new(
            plan.clone(),
            Arc::clone(&self.config),
        )))
    }
}

#[derive(Debug, Clone)]
pub struct ProcessPlanExecutor {
    plan: Plan,
    config: Arc<ExecutorConfig>,
    masker: SecretMasker,
}

impl ProcessPlanExecutor {
    pub fn new(plan: Plan, config: Arc<ExecutorConfig>) -> Self {
        let masker = SecretMasker::new(config.secrets.values());
        Self {
            plan,
            config,
            masker,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    async fn run_stage(&self, index: usize, stage: &Stage, ctx: &RunContext) -> Result<()> {
        info!(stage = index, jobs = stage.runs.len(), "running stage");

        // Cancelled on first failure so sibling jobs are killed.
        let stage_cancel = ctx.cancel_token().child_token();
        let _guard = stage_cancel.clone().drop_guard();

        let mut set = JoinSet::new();
        for run in stage.runs.iter().cloned() {
            let config = Arc::clone(&self.config);
            let masker = self.masker.clone();
            let cancel = stage_cancel.clone();
            let dry_run = ctx.dry_run();
            set.spawn(
                async move { run_job(&run, &config, &masker, dry_run, cancel).await }
                    .with_current_subscriber(),
            );
        }

        let mut first_error: Option<FlowrunError> = None;
        while let Some(joined) = set.join_next().await {
            let outcome = joined.map_err(|e| FlowrunError::Other(e.into())).and_then(|r| r);
            if let Err(err) = outcome {
                if first_error.is_none() {
                    warn!(stage = index, error = %err, "job failed; cancelling stage");
                    stage_cancel.cancel();
                    first_error = Some(err);
                } else {
                    debug!(stage = index, error = %err, "further job error in failed stage");
                }
            }
        }

        match first_error {
            Some(err) if ctx.is_cancelled() => {
                debug!(error = %err, "stage ended by cancellation");
                Err(FlowrunError::Cancelled)
            }
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl PlanExecutor for ProcessPlanExecutor {
    fn execute<'a>(&'a self, ctx: &'a RunContext) -> ExecFuture<'a> {
        Box::pin(async move {
            if self.plan.is_empty() {
                info!("plan has no jobs; nothing to run");
                return Ok(());
            }

            info!(
                event = %self.config.event_name,
                stages = self.plan.stages.len(),
                jobs = self.plan.job_count(),
                dry_run = ctx.dry_run(),
                "executing plan"
            );

            for (index, stage) in self.plan.stages.iter().enumerate() {
                if ctx.is_cancelled() {
                    return Err(FlowrunError::Cancelled);
                }
                self.run_stage(index, stage, ctx).await?;
            }

            info!("plan completed");
            Ok(())
        })
    }
}

