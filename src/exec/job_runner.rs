// src/exec/job_runner.rs

//! Individual job process runner.

use std::collections::BTreeMap;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

use crate::errors::{FlowrunError, Result};
use crate::exec::process::ExecutorConfig;
use crate::plan::JobRun;

/// Replaces secret values in job output.
#[derive(Debug, Clone, Default)]
pub struct SecretMasker {
    secrets: Vec<String>,
}

impl SecretMasker {
    pub fn new<'a>(values: impl IntoIterator<Item = &'a String>) -> Self {
        let mut secrets: Vec<String> = values
            .into_iter()
            .filter(|v| !v.is_empty())
            .cloned()
            .collect();
        // Longest first so a secret containing another is masked whole.
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        Self { secrets }
    }

    pub fn mask(&self, line: &str) -> String {
        self.secrets
            .iter()
            .fold(line.to_string(), |acc, secret| acc.replace(secret.as_str(), "***"))
    }
}

/// Environment passed to a job process on top of the inherited one.
pub fn job_env(run: &JobRun, config: &ExecutorConfig) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.extend(config.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(run.job.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(config.secrets.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(
        config
            .inputs
            .iter()
            .map(|(k, v)| (format!("INPUT_{}", k.to_uppercase()), v.clone())),
    );

    env.insert("FLOWRUN_EVENT_NAME".to_string(), config.event_name.clone());
    env.insert("FLOWRUN_JOB".to_string(), run.job_id.clone());
    env.insert("FLOWRUN_WORKFLOW".to_string(), run.workflow_name.clone());
    if let Some(image) = platform_image(run, config) {
        env.insert("FLOWRUN_PLATFORM_IMAGE".to_string(), image.to_string());
    }
    if let Some(url) = &config.artifact_url {
        env.insert("FLOWRUN_ARTIFACT_URL".to_string(), url.clone());
    }
    env
}

fn platform_image<'a>(run: &JobRun, config: &'a ExecutorConfig) -> Option<&'a str> {
    let label = run.job.runs_on.as_deref()?;
    config
        .platforms
        .get(&label.to_lowercase())
        .map(String::as_str)
        .filter(|image| !image.is_empty())
}

fn shell_command(script: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    }
}

/// Run a single job to completion.
///
/// Cancelling `cancel` kills the child process and yields
/// [`FlowrunError::Cancelled`].
pub async fn run_job(
    run: &JobRun,
    config: &ExecutorConfig,
    masker: &SecretMasker,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<()> {
    if dry_run {
        info!(
            job = %run.job_id,
            workflow = %run.workflow_name,
            cmd = %masker.mask(&run.job.run),
            "dry-run: not starting job"
        );
        return Ok(());
    }

    info!(job = %run.job_id, workflow = %run.workflow_name, "starting job");

    let mut cmd = shell_command(&run.job.run);
    cmd.current_dir(&config.workdir)
        .envs(job_env(run, config))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group so cancellation reaches everything the script spawned.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for job '{}'", run.job_id))?;

    let readers = [
        child
            .stdout
            .take()
            .map(|out| forward_output(out, run, config, masker, "stdout")),
        child
            .stderr
            .take()
            .map(|err| forward_output(err, run, config, masker, "stderr")),
    ];

    let outcome = tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process of job '{}'", run.job_id))?;
            let code = status.code().unwrap_or(-1);
            info!(job = %run.job_id, exit_code = code, success = status.success(), "job exited");
            if status.success() {
                Ok(())
            } else {
                Err(FlowrunError::JobFailed { job: run.job_id.clone(), code })
            }
        }
        _ = cancel.cancelled() => {
            info!(job = %run.job_id, "cancellation requested; killing job process");
            if let Some(pid) = child.id() {
                kill_process_group(pid, &run.job_id).await;
            }
            if let Err(e) = child.kill().await {
                warn!(job = %run.job_id, error = %e, "failed to kill job process");
            }
            // Orphaned grandchildren may still hold the pipes open.
            for reader in readers.into_iter().flatten() {
                reader.abort();
            }
            return Err(FlowrunError::Cancelled);
        }
    };

    // Drain remaining output before reporting.
    for reader in readers.into_iter().flatten() {
        let _ = reader.await;
    }

    outcome
}

/// SIGKILL the job's process group (the shell and its descendants).
#[cfg(unix)]
async fn kill_process_group(pid: u32, job: &str) {
    let status = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{pid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => debug!(job = %job, pgid = pid, "killed job process group"),
        Ok(s) => debug!(job = %job, pgid = pid, code = ?s.code(), "process group kill returned non-zero"),
        Err(e) => warn!(job = %job, error = %e, "failed to kill job process group"),
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pid: u32, _job: &str) {}

fn forward_output<R>(
    stream: R,
    run: &JobRun,
    config: &ExecutorConfig,
    masker: &SecretMasker,
    name: &'static str,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let job = run.job_id.clone();
    let log_output = config.log_output;
    let masker = if config.insecure_secrets {
        SecretMasker::default()
    } else {
        masker.clone()
    };

    tokio::spawn(
        async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if log_output {
                    info!(job = %job, stream = name, "| {}", masker.mask(&line));
                } else {
                    debug!(job = %job, stream = name, "| {}", masker.mask(&line));
                }
            }
        }
        .with_current_subscriber(),
    )
}
