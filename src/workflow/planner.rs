// src/workflow/planner.rs

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::errors::{FlowrunError, Result};
use crate::fs::FileSystem;
use crate::plan::{JobRun, Plan, Stage, WorkflowPlanner};
use crate::workflow::loader::load_workflows;
use crate::workflow::model::Workflow;

/// [`WorkflowPlanner`] over a fixed set of TOML workflows.
#[derive(Debug, Clone, Default)]
pub struct TomlWorkflowPlanner {
    workflows: Vec<Workflow>,
}

impl TomlWorkflowPlanner {
    pub fn new(workflows: Vec<Workflow>) -> Self {
        Self { workflows }
    }

    pub fn load(fs: &dyn FileSystem, path: &Path, recurse: bool) -> Result<Self> {
        let workflows = load_workflows(fs, path, recurse)?;
        debug!(count = workflows.len(), path = ?path, "workflows loaded");
        Ok(Self::new(workflows))
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    fn plan_workflows<'a>(&self, workflows: impl Iterator<Item = &'a Workflow>) -> Plan {
        let mut plan = Plan::default();
        for workflow in workflows {
            plan.merge_stages(workflow_stages(workflow, |_| true));
        }
        plan
    }
}

/// Stages of `workflow` restricted to the jobs accepted by `keep`. Stages
/// left empty are dropped.
fn workflow_stages(workflow: &Workflow, keep: impl Fn(&str) -> bool) -> Vec<Stage> {
    workflow
        .stages()
        .iter()
        .map(|ids| Stage {
            runs: ids
                .iter()
                .filter(|id| keep(id))
                .map(|id| JobRun {
                    workflow_name: workflow.name.clone(),
                    workflow_file: workflow.file.clone(),
                    events: workflow.events.clone(),
                    job_id: id.clone(),
                    job: workflow.jobs[id].clone(),
                })
                .collect(),
        })
        .filter(|stage| !stage.runs.is_empty())
        .collect()
}

/// `job_id` plus everything it transitively needs.
fn with_needs(workflow: &Workflow, job_id: &str) -> BTreeSet<String> {
    let mut selected = BTreeSet::new();
    let mut pending = vec![job_id.to_string()];
    while let Some(id) = pending.pop() {
        if !selected.insert(id.clone()) {
            continue;
        }
        if let Some(job) = workflow.jobs.get(&id) {
            pending.extend(job.needs.iter().cloned());
        }
    }
    selected
}

impl WorkflowPlanner for TomlWorkflowPlanner {
    fn discovered_events(&self) -> Vec<String> {
        self.workflows
            .iter()
            .flat_map(|w| w.events.iter().cloned())
            .collect()
    }

    fn plan_for_job(&self, job_id: &str) -> Result<Plan> {
        let mut plan = Plan::default();
        let mut found = false;

        for workflow in self.workflows.iter() {
            if !workflow.jobs.contains_key(job_id) {
                continue;
            }
            found = true;
            let selected = with_needs(workflow, job_id);
            plan.merge_stages(workflow_stages(workflow, |id| selected.contains(id)));
        }

        if !found {
            return Err(FlowrunError::UnknownJob(job_id.to_string()));
        }
        Ok(plan)
    }

    fn plan_for_event(&self, event: &str) -> Result<Plan> {
        let plan = self.plan_workflows(self.workflows.iter().filter(|w| w.is_triggered_by(event)));
        if plan.is_empty() {
            debug!(event, "no workflows triggered by event");
        }
        Ok(plan)
    }

    fn plan_for_all(&self) -> Result<Plan> {
        Ok(self.plan_workflows(self.workflows.iter()))
    }
}
