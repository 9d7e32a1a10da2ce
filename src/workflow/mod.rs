// src/workflow/mod.rs

//! Workflow files and the planner built on them.
//!
//! Workflows are TOML files under the workflows path (default
//! `.flowrun/workflows`). Validation rejects unknown or self `needs` and
//! dependency cycles, and lays jobs out in stages by dependency depth.

pub mod loader;
pub mod model;
pub mod planner;
pub mod validate;

pub use loader::{load_workflow_str, load_workflows, WORKFLOW_EXTENSION};
pub use model::{JobSpec, RawWorkflowFile, Workflow};
pub use planner::TomlWorkflowPlanner;
