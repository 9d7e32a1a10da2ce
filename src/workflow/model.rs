// src/workflow/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

/// A workflow file as read from TOML, before validation.
///
/// ```toml
/// name = "ci"
/// on = ["push", "pull_request"]
///
/// [jobs.build]
/// runs-on = "ubuntu-latest"
/// run = "cargo build"
///
/// [jobs.test]
/// needs = ["build"]
/// run = "cargo test"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowFile {
    pub name: Option<String>,

    /// Trigger events, either a single string or a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub on: Vec<String>,

    /// Jobs keyed by job ID.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobSpec>,
}

/// `[jobs.<id>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSpec {
    /// Human-readable name; the job ID is used when absent.
    pub name: Option<String>,

    /// Platform label, mapped to an image through `-P label=image`.
    pub runs_on: Option<String>,

    /// Jobs that must succeed before this one starts.
    #[serde(default, deserialize_with = "one_or_many")]
    pub needs: Vec<String>,

    /// Shell command to run.
    pub run: String,

    /// Extra environment for this job.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A validated workflow.
///
/// Construct through [`crate::workflow::load_workflow_str`] or
/// `Workflow::try_from((path, raw))`, which check dependencies and compute
/// the stage layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub name: String,
    pub file: PathBuf,
    pub events: Vec<String>,
    pub jobs: BTreeMap<String, JobSpec>,
    /// Job IDs grouped by dependency depth.
    pub(crate) stages: Vec<Vec<String>>,
}

impl Workflow {
    pub(crate) fn new_unchecked(
        name: String,
        file: PathBuf,
        events: Vec<String>,
        jobs: BTreeMap<String, JobSpec>,
        stages: Vec<Vec<String>>,
    ) -> Self {
        Self {
            name,
            file,
            events,
            jobs,
            stages,
        }
    }

    /// Job IDs grouped by dependency depth, stage 0 first.
    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    pub fn is_triggered_by(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
