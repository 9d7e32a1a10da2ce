// src/plan/mod.rs

//! Plans and how they are chosen.
//!
//! - A [`Plan`] is an ordered list of [`Stage`]s; jobs inside a stage are
//!   independent of each other.
//! - [`WorkflowPlanner`] is the contract of whatever knows the workflows.
//! - [`resolver`] decides which job or event drives a plan, separately for
//!   listing (filter plan) and for running (execution plan).
//! - [`render`] prints the filter plan for `--list` / `--graph`.

pub mod render;
pub mod resolver;

use std::fmt;
use std::path::PathBuf;

use crate::errors::Result;
use crate::workflow::JobSpec;

pub use resolver::{
    execution_event, execution_target, filter_target, EventPlanResolver, ResolveRequest,
    ResolvedExecution, DEFAULT_EVENT,
};

/// A single job scheduled as part of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub workflow_name: String,
    pub workflow_file: PathBuf,
    /// Events the owning workflow is triggered by.
    pub events: Vec<String>,
    pub job_id: String,
    pub job: JobSpec,
}

impl JobRun {
    /// Display name: the job's `name`, else its ID.
    pub fn display_name(&self) -> &str {
        self.job.name.as_deref().unwrap_or(&self.job_id)
    }
}

/// Jobs that may run concurrently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage {
    pub runs: Vec<JobRun>,
}

/// Ordered stages; stage `n + 1` starts only after stage `n` succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub stages: Vec<Stage>,
}

impl Plan {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(|s| s.runs.is_empty())
    }

    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.runs.len()).sum()
    }

    /// Merge `stages` into this plan stage-by-stage (stage 0 with stage 0,
    /// and so on).
    pub fn merge_stages(&mut self, stages: Vec<Stage>) {
        for (idx, stage) in stages.into_iter().enumerate() {
            if idx < self.stages.len() {
                self.stages[idx].runs.extend(stage.runs);
            } else {
                self.stages.push(stage);
            }
        }
    }

    pub fn runs(&self) -> impl Iterator<Item = &JobRun> {
        self.stages.iter().flat_map(|s| s.runs.iter())
    }
}

/// What a plan is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanTarget {
    Job(String),
    Event(String),
    All,
}

impl fmt::Display for PlanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTarget::Job(id) => write!(f, "job '{id}'"),
            PlanTarget::Event(name) => write!(f, "event '{name}'"),
            PlanTarget::All => write!(f, "all jobs"),
        }
    }
}

/// Contract of the component that knows the loaded workflows.
///
/// Implementations must be deterministic for a fixed set of workflows.
pub trait WorkflowPlanner {
    /// Trigger events of all loaded workflows, in load order. May be empty
    /// and may contain duplicates across workflows.
    fn discovered_events(&self) -> Vec<String>;

    fn plan_for_job(&self, job_id: &str) -> Result<Plan>;

    fn plan_for_event(&self, event: &str) -> Result<Plan>;

    fn plan_for_all(&self) -> Result<Plan>;

    /// Build the plan for a resolved target.
    fn plan_for(&self, target: &PlanTarget) -> Result<Plan> {
        match target {
            PlanTarget::Job(id) => self.plan_for_job(id),
            PlanTarget::Event(name) => self.plan_for_event(name),
            PlanTarget::All => self.plan_for_all(),
        }
    }
}
