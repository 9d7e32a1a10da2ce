// src/bug_report.rs

//! `--bug-report` output.

use std::fmt::Write as _;

use crate::config::{read_args_file, ArgsFileMode, ConfigLocations};
use crate::fs::FileSystem;

fn row(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "{key:<24}{value}");
}

/// System summary plus the contents of every rc file that has any.
pub fn bug_report(fs: &dyn FileSystem, locations: &ConfigLocations) -> String {
    let mut out = String::new();
    row(&mut out, "flowrun version:", env!("CARGO_PKG_VERSION"));
    row(&mut out, "OS:", std::env::consts::OS);
    row(&mut out, "Arch:", std::env::consts::ARCH);
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    row(&mut out, "CPUs:", &cpus);

    row(&mut out, "Config files:", "");
    for path in locations.paths() {
        let lines = read_args_file(fs, path, ArgsFileMode::NoSplit);
        if lines.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\t{}:", path.display());
        for line in lines {
            let _ = writeln!(out, "\t\t{line}");
        }
    }
    out
}
