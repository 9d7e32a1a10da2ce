// crates/test-utils/src/fakes.rs

//! In-memory stand-ins for the planner, executor, watcher and artifact
//! service seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use flowrun::artifacts::{ArtifactService, ArtifactSettings, ServiceHandle, StartFuture};
use flowrun::errors::{FlowrunError, Result};
use flowrun::exec::{ExecFuture, PlanExecutor, RunContext};
use flowrun::plan::{Plan, PlanTarget, WorkflowPlanner};
use flowrun::watch::{ChangeBatch, ChangeWatcher, CHANGE_CHANNEL_CAPACITY};

use crate::builders::plan_of;

/// Ordered record of what happened, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Planner with fixed discovered events that records which plans were asked
/// for. Each plan holds a single job named after its target.
#[derive(Debug, Clone, Default)]
pub struct FakePlanner {
    events: Vec<String>,
    known_jobs: Vec<String>,
    calls: Arc<Mutex<Vec<PlanTarget>>>,
}

impl FakePlanner {
    pub fn new(events: &[&str]) -> Self {
        Self {
            events: events.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Restrict `plan_for_job` to these IDs; others yield `UnknownJob`.
    pub fn with_jobs(mut self, jobs: &[&str]) -> Self {
        self.known_jobs = jobs.iter().map(|j| j.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<PlanTarget> {
        self.calls.lock().unwrap().clone()
    }
}

impl WorkflowPlanner for FakePlanner {
    fn discovered_events(&self) -> Vec<String> {
        self.events.clone()
    }

    fn plan_for_job(&self, job_id: &str) -> Result<Plan> {
        self.calls
            .lock()
            .unwrap()
            .push(PlanTarget::Job(job_id.to_string()));
        if !self.known_jobs.is_empty() && !self.known_jobs.iter().any(|j| j == job_id) {
            return Err(FlowrunError::UnknownJob(job_id.to_string()));
        }
        Ok(plan_of(&[job_id]))
    }

    fn plan_for_event(&self, event: &str) -> Result<Plan> {
        self.calls
            .lock()
            .unwrap()
            .push(PlanTarget::Event(event.to_string()));
        Ok(plan_of(&[&format!("on-{event}")]))
    }

    fn plan_for_all(&self) -> Result<Plan> {
        self.calls.lock().unwrap().push(PlanTarget::All);
        Ok(plan_of(&["all"]))
    }
}

/// Executor that counts invocations and can be told to fail or stall.
#[derive(Debug, Clone, Default)]
pub struct CountingExecutor {
    calls: Arc<AtomicUsize>,
    fail_on: Option<usize>,
    delay: Option<Duration>,
    log: Option<EventLog>,
    dry_runs: Arc<Mutex<Vec<bool>>>,
    cancelled_seen: Arc<Mutex<Vec<bool>>>,
}

impl CountingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th invocation (1-based).
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Sleep this long inside every invocation, ignoring cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Record an `exec` entry per invocation.
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dry-run flag seen by each invocation.
    pub fn dry_runs(&self) -> Vec<bool> {
        self.dry_runs.lock().unwrap().clone()
    }

    /// Whether the context was cancelled when each invocation finished.
    pub fn cancelled_seen(&self) -> Vec<bool> {
        self.cancelled_seen.lock().unwrap().clone()
    }

    /// Poll until at least `n` invocations have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl PlanExecutor for CountingExecutor {
    fn execute<'a>(&'a self, ctx: &'a RunContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.dry_runs.lock().unwrap().push(ctx.dry_run());
            if let Some(log) = &self.log {
                log.push("exec");
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.cancelled_seen.lock().unwrap().push(ctx.is_cancelled());

            if self.fail_on == Some(n) {
                return Err(FlowrunError::JobFailed {
                    job: format!("call-{n}"),
                    code: 1,
                });
            }
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
struct WatcherState {
    sender: Option<mpsc::Sender<ChangeBatch>>,
    starts: usize,
    stops: usize,
}

/// Test-side view of a [`FakeWatcher`].
#[derive(Debug, Clone, Default)]
pub struct FakeWatcherHandle {
    state: Arc<Mutex<WatcherState>>,
}

impl FakeWatcherHandle {
    /// Inject a batch. Returns `false` once the watcher is stopped.
    pub async fn send(&self, batch: ChangeBatch) -> bool {
        let sender = self.state.lock().unwrap().sender.clone();
        match sender {
            Some(tx) => tx.send(batch).await.is_ok(),
            None => false,
        }
    }

    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().sender.is_some()
    }
}

/// Watcher whose batches come from the test. Batches given up front are
/// queued on start.
#[derive(Debug, Default)]
pub struct FakeWatcher {
    queued: Vec<ChangeBatch>,
    handle: FakeWatcherHandle,
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batches(batches: Vec<ChangeBatch>) -> Self {
        Self {
            queued: batches,
            ..Self::default()
        }
    }

    pub fn handle(&self) -> FakeWatcherHandle {
        self.handle.clone()
    }
}

impl ChangeWatcher for FakeWatcher {
    fn start(&mut self) -> Result<mpsc::Receiver<ChangeBatch>> {
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        for batch in self.queued.drain(..) {
            tx.try_send(batch)
                .map_err(|e| FlowrunError::Config(format!("queueing fake batch: {e}")))?;
        }
        let mut state = self.handle.state.lock().unwrap();
        state.starts += 1;
        state.sender = Some(tx);
        Ok(rx)
    }

    fn stop(&mut self) {
        let mut state = self.handle.state.lock().unwrap();
        if state.sender.take().is_some() {
            state.stops += 1;
        }
    }

    fn is_running(&self) -> bool {
        self.handle.is_running()
    }
}

/// Artifact service that logs `service:start` / `service:stop`.
#[derive(Debug, Clone, Default)]
pub struct FakeArtifactService {
    log: EventLog,
    starts: Arc<AtomicUsize>,
    fail_start: bool,
}

impl FakeArtifactService {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn failing(log: EventLog) -> Self {
        Self {
            log,
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl ArtifactService for FakeArtifactService {
    fn start<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        _settings: &'a ArtifactSettings,
    ) -> StartFuture<'a> {
        Box::pin(async move {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.log.push("service:start");
            if self.fail_start {
                return Err(FlowrunError::Artifact("address in use".to_string()));
            }
            let log = self.log.clone();
            Ok(ServiceHandle::new(move || log.push("service:stop")))
        })
    }
}
