// src/artifacts/server.rs

//! Local artifact server.
//!
//! Routes:
//! - `GET /health`
//! - `PUT /artifacts/{*path}` stores the request body under the storage root
//! - `GET /artifacts/{*path}` returns a stored file

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

use super::{ArtifactService, ArtifactSettings, ServiceHandle, StartFuture};
use crate::errors::FlowrunError;

/// Artifact server backed by a directory on disk.
#[derive(Debug, Clone, Default)]
pub struct LocalArtifactServer;

impl LocalArtifactServer {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactService for LocalArtifactServer {
    fn start<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        settings: &'a ArtifactSettings,
    ) -> StartFuture<'a> {
        Box::pin(async move {
            let Some(root) = settings.storage_path.clone() else {
                return Ok(ServiceHandle::noop());
            };

            tokio::fs::create_dir_all(&root).await?;

            let listener = TcpListener::bind((settings.bind_addr.as_str(), settings.port))
                .await
                .map_err(|e| {
                    FlowrunError::Artifact(format!(
                        "binding {}:{}: {e}",
                        settings.bind_addr, settings.port
                    ))
                })?;
            let local_addr = listener.local_addr()?;
            info!(addr = %local_addr, root = ?root, "artifact server started");

            let shutdown = cancel.child_token();
            let serve_shutdown = shutdown.clone();
            let app = router(Arc::new(root));

            tokio::spawn(
                async move {
                    if let Err(err) = axum::serve(listener, app)
                        .with_graceful_shutdown(serve_shutdown.cancelled_owned())
                        .await
                    {
                        warn!(error = %err, "artifact server exited with error");
                    }
                    debug!("artifact server stopped");
                }
                .with_current_subscriber(),
            );

            Ok(ServiceHandle::new(move || shutdown.cancel()))
        })
    }
}

fn router(root: Arc<PathBuf>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/artifacts/{*path}",
            get(fetch_artifact).put(store_artifact),
        )
        .with_state(root)
}

async fn store_artifact(
    State(root): State<Arc<PathBuf>>,
    UrlPath(path): UrlPath<String>,
    body: Bytes,
) -> StatusCode {
    let Some(target) = storage_path(&root, &path) else {
        return StatusCode::BAD_REQUEST;
    };
    if let Some(parent) = target.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            warn!(path = %path, error = %err, "creating artifact directory failed");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    match tokio::fs::write(&target, &body).await {
        Ok(()) => {
            debug!(path = %path, bytes = body.len(), "artifact stored");
            StatusCode::CREATED
        }
        Err(err) => {
            warn!(path = %path, error = %err, "storing artifact failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn fetch_artifact(
    State(root): State<Arc<PathBuf>>,
    UrlPath(path): UrlPath<String>,
) -> Result<Vec<u8>, StatusCode> {
    let target = storage_path(&root, &path).ok_or(StatusCode::BAD_REQUEST)?;
    tokio::fs::read(&target)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)
}

/// Map a URL path onto the storage root. Returns `None` for anything that is
/// not a plain relative path (`..`, absolute paths, prefixes).
pub fn storage_path(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    let mut out = root.to_path_buf();
    let mut pushed = false;
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    pushed.then_some(out)
}
