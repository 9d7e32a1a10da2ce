// src/config/input.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::artifacts::{outbound_ip, ArtifactSettings};
use crate::cli::CliArgs;
use crate::config::overlay::{
    overlay, parse_platforms, parse_secrets, read_env_file, KeyValueMap,
};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::plan::ResolveRequest;

/// Everything a single invocation needs, resolved once from the parsed CLI
/// and the env/secret/input files. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub event: Option<String>,
    pub job: Option<String>,
    pub detect_event: bool,
    pub watch: bool,
    pub list: bool,
    pub graph: bool,
    pub dry_run: bool,
    pub quiet: bool,
    pub insecure_secrets: bool,
    pub workdir: PathBuf,
    pub workflows_path: PathBuf,
    pub recurse: bool,
    pub platforms: KeyValueMap,
    pub env: KeyValueMap,
    pub secrets: KeyValueMap,
    pub inputs: KeyValueMap,
    pub artifacts: ArtifactSettings,
}

impl ResolvedInput {
    /// Resolve paths against the working directory and load the overlays.
    ///
    /// A malformed env/secret/input file aborts here, before any planning.
    pub fn from_args(args: &CliArgs, fs: &dyn FileSystem) -> Result<Self> {
        let workdir = absolute_workdir(&args.directory)?;
        let resolve = |p: &Path| resolve_path(&workdir, p);

        let env_file = resolve(&args.env_file);
        debug!(path = ?env_file, "loading environment");
        let env = overlay(fs, &args.envs, &env_file)?;

        let input_file = resolve(&args.input_file);
        debug!(path = ?input_file, "loading job inputs");
        let inputs = overlay(fs, &args.inputs, &input_file)?;

        let secret_file = resolve(&args.secret_file);
        debug!(path = ?secret_file, "loading secrets");
        let mut secrets = KeyValueMap::new();
        parse_secrets(&args.secrets, &mut secrets);
        read_env_file(fs, &secret_file, &mut secrets)?;

        let artifacts = ArtifactSettings {
            storage_path: args
                .artifact_server_path
                .as_deref()
                .filter(|p| !p.as_os_str().is_empty())
                .map(resolve),
            bind_addr: args
                .artifact_server_addr
                .clone()
                .unwrap_or_else(|| outbound_ip().to_string()),
            port: args.artifact_server_port,
        };

        Ok(Self {
            event: args.event.clone().filter(|e| !e.is_empty()),
            job: args.job.clone().filter(|j| !j.is_empty()),
            detect_event: args.detect_event,
            watch: args.watch,
            list: args.list,
            graph: args.graph,
            dry_run: args.dryrun,
            quiet: args.quiet,
            insecure_secrets: args.insecure_secrets,
            workflows_path: resolve(&args.workflows),
            recurse: !args.no_recurse,
            platforms: parse_platforms(&args.platforms),
            env,
            secrets,
            inputs,
            artifacts,
            workdir,
        })
    }

    /// The event/job selection part of the input.
    pub fn resolve_request(&self) -> ResolveRequest {
        ResolveRequest {
            event: self.event.clone(),
            job: self.job.clone(),
            detect_event: self.detect_event,
        }
    }
}

fn absolute_workdir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    Ok(if dir == Path::new(".") {
        cwd
    } else {
        cwd.join(dir)
    })
}

/// Absolute paths are kept; relative ones are joined onto the workdir.
pub fn resolve_path(workdir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}
