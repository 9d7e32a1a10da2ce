// src/errors.rs

//! Crate-wide error type and `Result` alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowrunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error loading from {path:?}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("Job '{job}' failed with exit code {code}")]
    JobFailed { job: String, code: i32 },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Artifact server error: {0}")]
    Artifact(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowrunError>;
