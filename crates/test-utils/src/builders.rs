// crates/test-utils/src/builders.rs

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use flowrun::plan::{JobRun, Plan, Stage};
use flowrun::workflow::{load_workflow_str, JobSpec, Workflow};

/// Builder for workflow TOML text.
#[derive(Debug, Clone, Default)]
pub struct WorkflowBuilder {
    name: Option<String>,
    on: Vec<String>,
    jobs: BTreeMap<String, JobSpec>,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Workflow without a `name`; the file stem is used instead.
    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn on(mut self, event: &str) -> Self {
        self.on.push(event.to_string());
        self
    }

    pub fn job(mut self, id: &str, job: JobSpec) -> Self {
        self.jobs.insert(id.to_string(), job);
        self
    }

    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            writeln!(out, "name = {name:?}").unwrap();
        }
        let events: Vec<String> = self.on.iter().map(|e| format!("{e:?}")).collect();
        writeln!(out, "on = [{}]", events.join(", ")).unwrap();

        for (id, job) in &self.jobs {
            writeln!(out, "\n[jobs.{id}]").unwrap();
            if let Some(name) = &job.name {
                writeln!(out, "name = {name:?}").unwrap();
            }
            if let Some(runs_on) = &job.runs_on {
                writeln!(out, "runs-on = {runs_on:?}").unwrap();
            }
            if !job.needs.is_empty() {
                let needs: Vec<String> = job.needs.iter().map(|n| format!("{n:?}")).collect();
                writeln!(out, "needs = [{}]", needs.join(", ")).unwrap();
            }
            writeln!(out, "run = {:?}", job.run).unwrap();
            if !job.env.is_empty() {
                writeln!(out, "[jobs.{id}.env]").unwrap();
                for (k, v) in &job.env {
                    writeln!(out, "{k} = {v:?}").unwrap();
                }
            }
        }
        out
    }

    /// Parse and validate through the real loader.
    pub fn build(&self, file: &str) -> Workflow {
        load_workflow_str(PathBuf::from(file), &self.to_toml())
            .expect("Failed to build valid workflow from builder")
    }
}

/// Builder for `JobSpec`.
pub struct JobBuilder {
    job: JobSpec,
}

impl JobBuilder {
    pub fn new(run: &str) -> Self {
        Self {
            job: JobSpec {
                name: None,
                runs_on: None,
                needs: vec![],
                run: run.to_string(),
                env: BTreeMap::new(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.job.name = Some(name.to_string());
        self
    }

    pub fn runs_on(mut self, label: &str) -> Self {
        self.job.runs_on = Some(label.to_string());
        self
    }

    pub fn needs(mut self, dep: &str) -> Self {
        self.job.needs.push(dep.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.job.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> JobSpec {
        self.job
    }
}

/// Single-stage plan with one job per ID, all in workflow `wf`.
pub fn plan_of(job_ids: &[&str]) -> Plan {
    Plan::new(vec![Stage {
        runs: job_ids
            .iter()
            .map(|id| JobRun {
                workflow_name: "wf".to_string(),
                workflow_file: PathBuf::from("wf.toml"),
                events: vec!["push".to_string()],
                job_id: id.to_string(),
                job: JobBuilder::new("true").build(),
            })
            .collect(),
    }])
}
