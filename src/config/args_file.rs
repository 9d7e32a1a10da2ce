// src/config/args_file.rs

//! Reading flag arguments out of rc files.
//!
//! An rc file holds one directive per line. Lines beginning with `-` are
//! flags; the first whitespace run separates the flag from its value:
//!
//! ```text
//! -P ubuntu-latest=node:16-buster-slim
//! --env-file .env.local
//! --detect-event
//! ```

use std::ffi::OsString;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::locations::ConfigLocations;
use crate::fs::FileSystem;

static FIRST_WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex is valid"));

/// How lines of an rc file are turned into arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsFileMode {
    /// Keep only `-` lines, split each into at most two tokens.
    /// Used to seed the live flag set.
    Split,
    /// Keep every trimmed line verbatim. Used for diagnostic listings.
    NoSplit,
}

/// Read arguments from a single rc file.
///
/// A missing or unreadable file yields an empty list.
pub fn read_args_file(fs: &dyn FileSystem, path: &Path, mode: ArgsFileMode) -> Vec<String> {
    let contents = match fs.read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            debug!(path = ?path, error = %err, "rc file not readable; skipping");
            return Vec::new();
        }
    };

    let mut args = Vec::new();
    for line in contents.lines() {
        let arg = line.trim();
        match mode {
            ArgsFileMode::Split if arg.starts_with('-') => {
                args.extend(FIRST_WHITESPACE_RUN.splitn(arg, 2).map(str::to_string));
            }
            ArgsFileMode::Split => {}
            ArgsFileMode::NoSplit => args.push(arg.to_string()),
        }
    }
    args
}

/// Arguments from every rc file, in candidate order (split mode).
pub fn config_file_args(fs: &dyn FileSystem, locations: &ConfigLocations) -> Vec<String> {
    locations
        .paths()
        .iter()
        .flat_map(|path| read_args_file(fs, path, ArgsFileMode::Split))
        .collect()
}

/// The effective argument sequence handed to the flag parser: rc-file
/// arguments first, then the process's own arguments (without `argv[0]`).
///
/// Later single-valued flags override earlier ones, so the command line
/// always wins over any rc file.
pub fn effective_args<I, T>(
    fs: &dyn FileSystem,
    locations: &ConfigLocations,
    process_args: I,
) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = config_file_args(fs, locations)
        .into_iter()
        .map(OsString::from)
        .collect();
    args.extend(process_args.into_iter().map(Into::into));
    args
}
