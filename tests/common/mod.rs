// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub use flowrun_test_utils::{init_tracing, with_timeout};

/// Temporary project directory with helpers to lay out files.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }
}
