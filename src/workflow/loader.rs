// src/workflow/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{FlowrunError, Result};
use crate::fs::FileSystem;
use crate::workflow::model::{RawWorkflowFile, Workflow};

/// Extension of workflow files.
pub const WORKFLOW_EXTENSION: &str = "toml";

/// Parse and validate a single workflow from its TOML text.
pub fn load_workflow_str(file: impl Into<PathBuf>, contents: &str) -> Result<Workflow> {
    let raw: RawWorkflowFile = toml::from_str(contents)?;
    Workflow::try_from((file.into(), raw))
}

/// Load every workflow under `path`.
///
/// - `path` may be a single file or a directory.
/// - Directories are scanned in sorted order; subdirectories only when
///   `recurse` is set.
/// - A missing path is an error.
pub fn load_workflows(fs: &dyn FileSystem, path: &Path, recurse: bool) -> Result<Vec<Workflow>> {
    if !fs.exists(path) {
        return Err(FlowrunError::Config(format!(
            "workflows path {:?} does not exist",
            path
        )));
    }

    let mut files = Vec::new();
    if fs.is_dir(path) {
        collect_workflow_files(fs, path, recurse, &mut files)?;
    } else {
        files.push(path.to_path_buf());
    }

    let mut workflows = Vec::with_capacity(files.len());
    for file in files {
        debug!(file = ?file, "loading workflow");
        let contents = fs.read_to_string(&file)?;
        workflows.push(load_workflow_str(file, &contents)?);
    }
    Ok(workflows)
}

fn collect_workflow_files(
    fs: &dyn FileSystem,
    dir: &Path,
    recurse: bool,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut entries = fs.read_dir(dir)?;
    entries.sort();

    for entry in entries {
        if fs.is_dir(&entry) {
            if recurse {
                collect_workflow_files(fs, &entry, recurse, out)?;
            }
        } else if entry.extension().is_some_and(|ext| ext == WORKFLOW_EXTENSION) {
            out.push(entry);
        }
    }
    Ok(())
}
