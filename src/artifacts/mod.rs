// src/artifacts/mod.rs

//! Auxiliary artifact service.
//!
//! The lifecycle only talks to an [`ArtifactService`]; the shipped
//! [`LocalArtifactServer`] is a small axum server storing uploads on disk.
//! Starting a service yields a [`ServiceHandle`] that owns its stop function.

pub mod server;

use std::fmt;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::Result;

pub use server::LocalArtifactServer;

/// Addressing and storage location of the artifact service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    /// Storage root. The service is never started when this is `None`.
    pub storage_path: Option<PathBuf>,
    pub bind_addr: String,
    pub port: u16,
}

impl ArtifactSettings {
    pub fn is_enabled(&self) -> bool {
        self.storage_path.is_some()
    }

    /// Base URL jobs use to reach the service, if it is enabled.
    pub fn url(&self) -> Option<String> {
        self.is_enabled()
            .then(|| format!("http://{}:{}/", self.bind_addr, self.port))
    }
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            storage_path: None,
            bind_addr: Ipv4Addr::LOCALHOST.to_string(),
            port: crate::cli::DEFAULT_ARTIFACT_PORT,
        }
    }
}

pub type StartFuture<'a> = Pin<Box<dyn Future<Output = Result<ServiceHandle>> + Send + 'a>>;

/// Something that can be started around an execution and stopped afterwards.
pub trait ArtifactService: Send + Sync {
    /// Start serving. The returned handle stops the service when
    /// [`ServiceHandle::stop`] is called or the handle is dropped.
    fn start<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        settings: &'a ArtifactSettings,
    ) -> StartFuture<'a>;
}

type StopFn = Box<dyn FnOnce() + Send>;

/// Owns the stop function of a running service.
///
/// Stopping is idempotent: the function runs at most once, either on an
/// explicit [`stop`](Self::stop) or on drop.
pub struct ServiceHandle {
    stop: Option<StopFn>,
}

impl ServiceHandle {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// Handle for a service that was never started.
    pub fn noop() -> Self {
        Self { stop: None }
    }

    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            debug!("stopping artifact service");
            stop();
        }
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A [`ServiceHandle`] that can be shared with a cleanup closure.
#[derive(Debug, Clone)]
pub struct SharedServiceHandle(Arc<Mutex<ServiceHandle>>);

impl SharedServiceHandle {
    pub fn new(handle: ServiceHandle) -> Self {
        Self(Arc::new(Mutex::new(handle)))
    }

    pub fn stop(&self) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).stop();
    }
}

/// Preferred outbound IP of this host, `127.0.0.1` if it cannot be
/// determined. Connecting a UDP socket sends no packets.
pub fn outbound_ip() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
