// src/watch/ignore.rs

//! `.gitignore`-style filter for watch-mode change paths.
//!
//! Supported subset:
//! - blank lines and `#` comments are skipped
//! - `!pattern` re-includes a previously ignored path
//! - a trailing `/` restricts the rule to directories
//! - a pattern containing `/` is anchored at the root; otherwise it matches
//!   at any depth
//!
//! The last matching rule wins. A path is also ignored when one of its
//! ancestor directories is.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::fs::FileSystem;

pub const GITIGNORE_FILE: &str = ".gitignore";

#[derive(Debug, Clone)]
struct IgnoreRule {
    matcher: GlobMatcher,
    negated: bool,
    dir_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    rules: Vec<IgnoreRule>,
}

impl IgnoreMatcher {
    /// Matcher that ignores nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read `<root>/.gitignore`. A missing or unreadable file yields an
    /// empty matcher.
    pub fn from_gitignore(fs: &dyn FileSystem, root: &Path) -> Self {
        let path = root.join(GITIGNORE_FILE);
        if !fs.is_file(&path) {
            debug!(path = ?path, "no ignore file");
            return Self::empty();
        }
        match fs.read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) => {
                warn!(path = ?path, error = %e, "failed to read ignore file");
                Self::empty()
            }
        }
    }

    /// Build a matcher from ignore-file text. Invalid patterns are skipped.
    pub fn parse(contents: &str) -> Self {
        let rules = contents
            .lines()
            .filter_map(|line| {
                let rule = parse_rule(line)?;
                match rule {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        warn!(pattern = line.trim(), error = %e, "skipping invalid ignore pattern");
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `rel` (relative to the watch root, `/` separated) is ignored.
    pub fn is_ignored(&self, rel: &str, is_dir: bool) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let rel = rel.trim_start_matches("./").trim_matches('/');
        if rel.is_empty() {
            return false;
        }

        // Every proper ancestor is a directory.
        for (idx, _) in rel.match_indices('/') {
            if self.matches(&rel[..idx], true) == Some(true) {
                return true;
            }
        }

        self.matches(rel, is_dir).unwrap_or(false)
    }

    /// Outcome of the last matching rule, if any.
    fn matches(&self, rel: &str, is_dir: bool) -> Option<bool> {
        self.rules
            .iter()
            .rev()
            .find(|rule| (!rule.dir_only || is_dir) && rule.matcher.is_match(rel))
            .map(|rule| !rule.negated)
    }
}

fn parse_rule(line: &str) -> Option<Result<IgnoreRule, globset::Error>> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (negated, pattern) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line.strip_prefix('\\').unwrap_or(line)),
    };
    let (dir_only, pattern) = match pattern.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    if pattern.is_empty() {
        return None;
    }

    let glob = if let Some(anchored) = pattern.strip_prefix('/') {
        anchored.to_string()
    } else if pattern.contains('/') {
        pattern.to_string()
    } else {
        format!("**/{pattern}")
    };

    // `*` must not cross directory separators.
    let built = GlobBuilder::new(&glob).literal_separator(true).build();
    Some(built.map(|g| IgnoreRule {
        matcher: g.compile_matcher(),
        negated,
        dir_only,
    }))
}
