// tests/config_args.rs

mod common;
use crate::common::init_tracing;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use flowrun::cli;
use flowrun::config::{
    config_file_args, effective_args, read_args_file, ArgsFileMode, ConfigLocations,
    RC_FILE_NAME,
};
use flowrun::fs::mock::MockFileSystem;

fn locations() -> ConfigLocations {
    ConfigLocations::from_paths(vec![
        PathBuf::from("/home/u/.flowrunrc"),
        PathBuf::from("/home/u/.config/.flowrunrc"),
        PathBuf::from("./.flowrunrc"),
    ])
}

fn os(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

#[test]
fn split_mode_keeps_flag_lines_and_splits_once() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(
        "/rc",
        "# comment\n-P ubuntu-latest=node:16 buster\n   --detect-event  \nnot a flag\n\n--env-file\t.env.local\n",
    );

    let args = read_args_file(&fs, Path::new("/rc"), ArgsFileMode::Split);
    assert_eq!(
        args,
        vec![
            "-P",
            "ubuntu-latest=node:16 buster",
            "--detect-event",
            "--env-file",
            ".env.local",
        ]
    );
}

#[test]
fn no_split_mode_keeps_every_trimmed_line() {
    let fs = MockFileSystem::new();
    fs.add_file("/rc", "  -P a=b  \nplain line\n");

    let args = read_args_file(&fs, Path::new("/rc"), ArgsFileMode::NoSplit);
    assert_eq!(args, vec!["-P a=b", "plain line"]);
}

#[test]
fn missing_rc_file_contributes_nothing() {
    let fs = MockFileSystem::new();
    assert!(read_args_file(&fs, Path::new("/nope"), ArgsFileMode::Split).is_empty());
    assert!(config_file_args(&fs, &locations()).is_empty());
}

#[test]
fn file_args_follow_candidate_order_then_process_args() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/home/u/.flowrunrc", "--job home\n");
    fs.add_file("./.flowrunrc", "--job cwd\n");
    fs.add_file("/home/u/.config/.flowrunrc", "--job xdg\n");

    let args = effective_args(&fs, &locations(), ["--job", "cli"]);
    assert_eq!(
        args,
        os(&["--job", "home", "--job", "xdg", "--job", "cwd", "--job", "cli"])
    );
}

#[test]
fn process_args_override_rc_file_flags() {
    let fs = MockFileSystem::new();
    fs.add_file("/home/u/.flowrunrc", "--job from-rc\n-W ci/flows\n--detect-event\n");

    let args = cli::parse_from(effective_args(&fs, &locations(), ["--job", "from-cli"]))
        .expect("flags parse");

    assert_eq!(args.job.as_deref(), Some("from-cli"));
    assert_eq!(args.workflows, PathBuf::from("ci/flows"));
    assert!(args.detect_event);
}

#[test]
fn rc_values_apply_when_not_given_on_command_line() {
    let fs = MockFileSystem::new();
    fs.add_file("./.flowrunrc", "--secret-file prod.secrets\n-P Ubuntu-Latest=img:1\n");

    let args = cli::parse_from(effective_args(&fs, &locations(), ["-P", "macos=img:2"]))
        .expect("flags parse");

    assert_eq!(args.secret_file, PathBuf::from("prod.secrets"));
    assert_eq!(args.platforms, vec!["Ubuntu-Latest=img:1", "macos=img:2"]);
}

#[test]
fn malformed_flag_is_rejected_before_anything_runs() {
    let err = cli::parse_from(["--artifact-server-port", "not-a-port"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[test]
fn locations_use_xdg_when_set_and_fall_back_to_home_config() {
    let home = Path::new("/home/u");

    let with_xdg = ConfigLocations::for_home(home, Some("/xdg"));
    assert_eq!(
        with_xdg.paths(),
        &[
            home.join(RC_FILE_NAME),
            Path::new("/xdg").join(RC_FILE_NAME),
            Path::new(".").join(RC_FILE_NAME),
        ]
    );

    let empty_xdg = ConfigLocations::for_home(home, Some(""));
    assert_eq!(empty_xdg.paths()[1], home.join(".config").join(RC_FILE_NAME));
    assert_eq!(ConfigLocations::for_home(home, None), empty_xdg);
}
