// src/watch/mod.rs

//! Watch mode.
//!
//! - [`watcher`] turns filesystem events into coalesced [`ChangeBatch`]es.
//! - [`ignore`] filters change paths through the root's `.gitignore`.
//! - [`driver`] re-runs the executor once per batch until cancelled.
//!
//! Nothing here knows about workflows or plans; the driver only sees a
//! [`crate::exec::PlanExecutor`].

pub mod driver;
pub mod ignore;
pub mod watcher;

pub use driver::WatchDriver;
pub use ignore::{IgnoreMatcher, GITIGNORE_FILE};
pub use watcher::{
    ChangeBatch, ChangeWatcher, FolderWatcher, WatchOptions, CHANGE_CHANNEL_CAPACITY,
    DEFAULT_POLL_INTERVAL,
};
