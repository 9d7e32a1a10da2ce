// src/logging.rs

//! Logging setup for `flowrun` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--verbose` (debug)
//! 3. `FLOWRUN_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for `--list`,
//! `--graph` and `--bug-report` output.
//!
//! No global subscriber is installed. [`LogContext`] owns the dispatcher and
//! scopes the driver future with it; spawned tasks inherit it through
//! `with_current_subscriber`.

use std::future::Future;

use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt;

use crate::cli::{CliArgs, LogLevel};

pub const LOG_ENV_VAR: &str = "FLOWRUN_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging context of one invocation.
#[derive(Clone)]
pub struct LogContext {
    dispatch: Dispatch,
    level: Level,
}

impl std::fmt::Debug for LogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogContext")
            .field("level", &self.level)
            .finish()
    }
}

impl LogContext {
    pub fn new(level: Level, format: LogFormat) -> Self {
        // Send logs to stderr; keep stdout free for listings.
        let builder = fmt()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr);

        let dispatch = match format {
            LogFormat::Text => Dispatch::new(builder.finish()),
            LogFormat::Json => Dispatch::new(builder.json().finish()),
        };
        Self { dispatch, level }
    }

    pub fn from_args(args: &CliArgs) -> Self {
        let env_level = std::env::var(LOG_ENV_VAR).ok();
        let level = resolve_level(args.log_level, args.verbose, env_level.as_deref());
        let format = if args.json {
            LogFormat::Json
        } else {
            LogFormat::Text
        };
        Self::new(level, format)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `fut` with this context's subscriber as the default.
    pub fn scope<F: Future>(&self, fut: F) -> WithDispatch<F> {
        fut.with_subscriber(self.dispatch.clone())
    }
}

/// Pick the effective level from the CLI flag, the verbose switch and the
/// `FLOWRUN_LOG` value, in that order.
pub fn resolve_level(cli_level: Option<LogLevel>, verbose: bool, env: Option<&str>) -> Level {
    if let Some(lvl) = cli_level {
        return level_from_log_level(lvl);
    }
    if verbose {
        return Level::DEBUG;
    }
    env.and_then(parse_level_str).unwrap_or(Level::INFO)
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
