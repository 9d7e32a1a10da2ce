// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The argument list handed to clap is the effective one built by
//! [`crate::config::effective_args`]: rc-file flags first, then the process
//! arguments. `args_override_self` makes a repeated single-valued flag keep
//! its last value, which is how the command line wins over rc files.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Default port of the artifact server.
pub const DEFAULT_ARTIFACT_PORT: u16 = 34567;

/// Command-line arguments for `flowrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flowrun",
    version,
    about = "Run workflows locally by event name (e.g. `push`) or by job ID.",
    long_about = "Run workflows locally by event name (e.g. `push`) or by job ID.\n\n\
                  If no event name is passed and the workflows only handle one event, that \
                  event is used; otherwise the default is `push`.",
    args_override_self = true
)]
pub struct CliArgs {
    /// Event name to run.
    #[arg(value_name = "EVENT")]
    pub event: Option<String>,

    /// Watch the working directory and run again when files change.
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// List workflows and jobs instead of running them.
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Draw the job graph instead of running it.
    #[arg(short = 'g', long)]
    pub graph: bool,

    /// Run a specific job ID.
    #[arg(short = 'j', long, value_name = "JOB")]
    pub job: Option<String>,

    /// Display system information for a bug report.
    #[arg(long)]
    pub bug_report: bool,

    /// Secret to make available to jobs, with optional value
    /// (e.g. `-s mysecret=foo` or `-s mysecret`).
    #[arg(short = 's', long = "secret", value_name = "KEY[=VALUE]")]
    pub secrets: Vec<String>,

    /// Env to make available to jobs, with optional value
    /// (e.g. `--env myenv=foo` or `--env myenv`).
    #[arg(long = "env", value_name = "KEY[=VALUE]")]
    pub envs: Vec<String>,

    /// Job input to make available as `INPUT_<KEY>` (e.g. `--input myinput=foo`).
    #[arg(long = "input", value_name = "KEY[=VALUE]")]
    pub inputs: Vec<String>,

    /// Custom image per platform label (e.g. `-P ubuntu-latest=node:16-buster-slim`).
    #[arg(short = 'P', long = "platform", value_name = "LABEL=IMAGE")]
    pub platforms: Vec<String>,

    /// Use the first event type from the workflows as the triggering event.
    #[arg(long)]
    pub detect_event: bool,

    /// Path to workflow file(s).
    #[arg(short = 'W', long, value_name = "PATH", default_value = ".flowrun/workflows")]
    pub workflows: PathBuf,

    /// Do not load workflows from subdirectories of `--workflows`.
    #[arg(long)]
    pub no_recurse: bool,

    /// Working directory.
    #[arg(short = 'C', long = "directory", value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Verbose output (debug logging).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    pub json: bool,

    /// Disable logging of output from jobs.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Dry-run mode: plan and log jobs without running them.
    #[arg(short = 'n', long)]
    pub dryrun: bool,

    /// File with secrets to read from.
    #[arg(long, value_name = "PATH", default_value = ".secrets")]
    pub secret_file: PathBuf,

    /// Environment file to read and use as env for jobs.
    #[arg(long, value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// File to read job inputs from.
    #[arg(long, value_name = "PATH", default_value = ".input")]
    pub input_file: PathBuf,

    /// Do not mask secret values in job output.
    #[arg(long)]
    pub insecure_secrets: bool,

    /// Where the artifact server stores uploads. The server does not start
    /// when this is unset.
    #[arg(long, value_name = "PATH")]
    pub artifact_server_path: Option<PathBuf>,

    /// Address the artifact server binds to (default: outbound IP).
    #[arg(long, value_name = "ADDR")]
    pub artifact_server_addr: Option<String>,

    /// Port the artifact server listens on.
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_ARTIFACT_PORT)]
    pub artifact_server_port: u16,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose`, `FLOWRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse an effective argument list (without `argv[0]`).
pub fn parse_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv = std::iter::once(OsString::from("flowrun")).chain(args.into_iter().map(Into::into));
    CliArgs::try_parse_from(argv)
}
