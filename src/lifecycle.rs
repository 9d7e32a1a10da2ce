// src/lifecycle.rs

//! Start/stop of the artifact service around plan execution.
//!
//! - single run: the service is started, the executor runs with a `finally`
//!   stage that stops the service, whatever the outcome.
//! - watch mode: the service is started once for the whole session and
//!   stopped once after the watch driver returns.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::artifacts::{ArtifactService, ArtifactSettings, ServiceHandle, SharedServiceHandle};
use crate::errors::Result;
use crate::exec::{PlanExecutor, PlanExecutorExt, RunContext};
use crate::watch::{ChangeWatcher, WatchDriver};

pub struct ExecutionLifecycle<'a> {
    service: &'a dyn ArtifactService,
    settings: ArtifactSettings,
    dry_run: bool,
}

impl<'a> ExecutionLifecycle<'a> {
    pub fn new(service: &'a dyn ArtifactService, settings: ArtifactSettings, dry_run: bool) -> Self {
        Self {
            service,
            settings,
            dry_run,
        }
    }

    /// Start the artifact service unless no storage path is configured.
    pub async fn start_service(&self, cancel: &CancellationToken) -> Result<ServiceHandle> {
        if !self.settings.is_enabled() {
            debug!("artifact storage path unset; not starting artifact service");
            return Ok(ServiceHandle::noop());
        }
        info!(
            path = ?self.settings.storage_path,
            addr = %self.settings.bind_addr,
            port = self.settings.port,
            "starting artifact service"
        );
        self.service.start(cancel, &self.settings).await
    }

    /// Run `executor` once. The service is stopped exactly once afterwards,
    /// also when execution fails.
    pub async fn run_once(
        &self,
        executor: Box<dyn PlanExecutor>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let handle = SharedServiceHandle::new(self.start_service(cancel).await?);
        let ctx = RunContext::new(cancel.child_token(), self.dry_run);

        let executor = executor.finally(move || {
            handle.stop();
            Ok(())
        });
        executor.execute(&ctx).await
    }

    /// Run `executor` under a [`WatchDriver`] until `cancel` fires or a pass
    /// fails.
    pub async fn run_watch<W: ChangeWatcher>(
        &self,
        executor: Arc<dyn PlanExecutor>,
        watcher: W,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut handle = self.start_service(cancel).await?;

        // Pass tokens are not tied to `cancel`: a running pass completes.
        let ctx = RunContext::new(CancellationToken::new(), self.dry_run);
        let result = WatchDriver::new(watcher)
            .run(executor, ctx, cancel.clone())
            .await;

        handle.stop();
        result
    }
}
