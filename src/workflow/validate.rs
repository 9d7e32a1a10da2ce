// src/workflow/validate.rs

use std::collections::HashMap;
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{FlowrunError, Result};
use crate::workflow::model::{RawWorkflowFile, Workflow};

impl TryFrom<(PathBuf, RawWorkflowFile)> for Workflow {
    type Error = FlowrunError;

    fn try_from((file, raw): (PathBuf, RawWorkflowFile)) -> Result<Self> {
        let name = raw.name.clone().unwrap_or_else(|| {
            file.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        ensure_has_jobs(&name, &raw)?;
        validate_job_dependencies(&name, &raw)?;
        let stages = compute_stages(&name, &raw)?;

        Ok(Workflow::new_unchecked(name, file, raw.on, raw.jobs, stages))
    }
}

fn ensure_has_jobs(name: &str, raw: &RawWorkflowFile) -> Result<()> {
    if raw.jobs.is_empty() {
        return Err(FlowrunError::Config(format!(
            "workflow '{name}' must contain at least one [jobs.<id>] section"
        )));
    }
    Ok(())
}

fn validate_job_dependencies(name: &str, raw: &RawWorkflowFile) -> Result<()> {
    for (id, job) in raw.jobs.iter() {
        for dep in job.needs.iter() {
            if dep == id {
                return Err(FlowrunError::Config(format!(
                    "job '{id}' in workflow '{name}' cannot depend on itself in `needs`"
                )));
            }
            if !raw.jobs.contains_key(dep) {
                return Err(FlowrunError::Config(format!(
                    "job '{id}' in workflow '{name}' has unknown dependency '{dep}' in `needs`"
                )));
            }
        }
    }
    Ok(())
}

/// Group jobs by dependency depth: a job without `needs` is in stage 0, any
/// other job sits one stage after its deepest dependency.
fn compute_stages(name: &str, raw: &RawWorkflowFile) -> Result<Vec<Vec<String>>> {
    // Edge direction: dep -> job.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for id in raw.jobs.keys() {
        graph.add_node(id.as_str());
    }
    for (id, job) in raw.jobs.iter() {
        for dep in job.needs.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| {
        FlowrunError::DagCycle(format!(
            "cycle detected in workflow '{}' involving job '{}'",
            name,
            cycle.node_id()
        ))
    })?;

    let mut depth: HashMap<&str, usize> = HashMap::new();
    for id in order {
        let d = raw.jobs[id]
            .needs
            .iter()
            .filter_map(|dep| depth.get(dep.as_str()))
            .map(|d| d + 1)
            .max()
            .unwrap_or(0);
        depth.insert(id, d);
    }

    let stage_count = depth.values().copied().max().map_or(0, |d| d + 1);
    let mut stages = vec![Vec::new(); stage_count];
    // BTreeMap iteration keeps job IDs sorted within a stage.
    for id in raw.jobs.keys() {
        stages[depth[id.as_str()]].push(id.clone());
    }
    Ok(stages)
}
