// tests/logging.rs

use tracing::Level;

use flowrun::cli::{self, LogLevel};
use flowrun::logging::{resolve_level, LogContext, LogFormat};

#[test]
fn cli_level_beats_verbose_and_environment() {
    assert_eq!(resolve_level(Some(LogLevel::Warn), true, Some("trace")), Level::WARN);
}

#[test]
fn verbose_beats_environment() {
    assert_eq!(resolve_level(None, true, Some("error")), Level::DEBUG);
}

#[test]
fn environment_is_used_when_valid_else_info() {
    assert_eq!(resolve_level(None, false, Some(" Trace ")), Level::TRACE);
    assert_eq!(resolve_level(None, false, Some("loud")), Level::INFO);
    assert_eq!(resolve_level(None, false, None), Level::INFO);
}

#[tokio::test]
async fn scoped_context_does_not_install_a_global_subscriber() {
    let args = cli::parse_from(["--json", "--log-level", "debug"]).expect("flags parse");
    let ctx = LogContext::from_args(&args);
    assert_eq!(ctx.level(), Level::DEBUG);

    let inside = ctx
        .scope(async { tracing::enabled!(Level::DEBUG) })
        .await;
    assert!(inside);
    assert!(!tracing::enabled!(Level::DEBUG), "no subscriber outside the scope");

    let text = LogContext::new(Level::INFO, LogFormat::Text);
    assert_eq!(text.level(), Level::INFO);
}
