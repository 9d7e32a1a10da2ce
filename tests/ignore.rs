// tests/ignore.rs

mod common;
use crate::common::{init_tracing, with_timeout, TempProject};

use std::path::{Path, PathBuf};
use std::time::Duration;

use flowrun::fs::mock::MockFileSystem;
use flowrun::watch::{ChangeWatcher, FolderWatcher, IgnoreMatcher, WatchOptions};

#[test]
fn unanchored_pattern_matches_at_any_depth() {
    let m = IgnoreMatcher::parse("*.log\n");
    assert!(m.is_ignored("debug.log", false));
    assert!(m.is_ignored("nested/deep/trace.log", false));
    assert!(!m.is_ignored("src/main.rs", false));
}

#[test]
fn anchored_pattern_only_matches_from_root() {
    let m = IgnoreMatcher::parse("/build\ndocs/*.html\n");
    assert!(m.is_ignored("build", true));
    assert!(m.is_ignored("build/out.o", false));
    assert!(!m.is_ignored("sub/build", true));
    assert!(m.is_ignored("docs/index.html", false));
    assert!(!m.is_ignored("docs/api/index.html", false));
}

#[test]
fn directory_pattern_ignores_contents_but_not_files_of_that_name() {
    let m = IgnoreMatcher::parse("target/\n");
    assert!(m.is_ignored("target", true));
    assert!(m.is_ignored("target/debug/flowrun", false));
    assert!(m.is_ignored("crates/x/target/debug", true));
    assert!(!m.is_ignored("target", false));
}

#[test]
fn negation_reincludes_and_last_rule_wins() {
    let m = IgnoreMatcher::parse("*.env\n!keep.env\n");
    assert!(m.is_ignored("prod.env", false));
    assert!(!m.is_ignored("keep.env", false));

    let m = IgnoreMatcher::parse("!keep.env\n*.env\n");
    assert!(m.is_ignored("keep.env", false));
}

#[test]
fn comments_blank_lines_and_invalid_patterns_are_skipped() {
    init_tracing();
    let m = IgnoreMatcher::parse("# tmp files\n\n[invalid\n*.tmp\n");
    assert!(m.is_ignored("a.tmp", false));
    assert!(!m.is_ignored("# tmp files", false));
}

#[test]
fn missing_gitignore_ignores_nothing() {
    let fs = MockFileSystem::new();
    let m = IgnoreMatcher::from_gitignore(&fs, Path::new("/project"));
    assert!(m.is_empty());
    assert!(!m.is_ignored("anything", false));
}

#[test]
fn gitignore_is_read_from_the_root() {
    let fs = MockFileSystem::new();
    fs.add_file("/project/.gitignore", "node_modules/\n");
    let m = IgnoreMatcher::from_gitignore(&fs, Path::new("/project"));
    assert!(m.is_ignored("node_modules/pkg/index.js", false));
}

#[tokio::test]
async fn folder_watcher_batches_changes_and_skips_ignored_paths() {
    init_tracing();
    let project = TempProject::new();
    project.write("src/lib.rs", "");

    let ignore = IgnoreMatcher::parse("*.log\n");
    let options =
        WatchOptions::new(project.root()).with_poll_interval(Duration::from_millis(100));
    let mut watcher = FolderWatcher::new(options, ignore);
    let mut batches = watcher.start().expect("watcher starts");
    assert!(watcher.is_running());

    // Let the backend settle before touching files.
    tokio::time::sleep(Duration::from_millis(100)).await;
    project.write("debug.log", "noise");
    project.write("src/lib.rs", "pub fn touched() {}");

    let batch = with_timeout(batches.recv()).await.expect("a batch");
    assert!(batch.paths.contains(&PathBuf::from("src/lib.rs")), "{batch:?}");
    assert!(!batch.paths.iter().any(|p| p.ends_with("debug.log")));

    watcher.stop();
    assert!(!watcher.is_running());
    assert!(with_timeout(batches.recv()).await.is_none());
}
