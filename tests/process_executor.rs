// tests/process_executor.rs

#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout, TempProject};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use flowrun::errors::FlowrunError;
use flowrun::exec::job_runner::job_env;
use flowrun::exec::{
    ExecutorConfig, ExecutorFactory, PlanExecutor, ProcessExecutorFactory, ProcessPlanExecutor,
    RunContext, SecretMasker,
};
use flowrun::plan::{JobRun, Plan, Stage};
use flowrun_test_utils::builders::JobBuilder;

fn run(id: &str, script: &str) -> JobRun {
    JobRun {
        workflow_name: "ci".to_string(),
        workflow_file: PathBuf::from("ci.toml"),
        events: vec!["push".to_string()],
        job_id: id.to_string(),
        job: JobBuilder::new(script).build(),
    }
}

fn config(workdir: &std::path::Path) -> ExecutorConfig {
    ExecutorConfig {
        workdir: workdir.to_path_buf(),
        event_name: "push".to_string(),
        log_output: true,
        ..ExecutorConfig::default()
    }
}

fn executor(plan: Plan, config: ExecutorConfig) -> ProcessPlanExecutor {
    ProcessPlanExecutor::new(plan, Arc::new(config))
}

#[tokio::test]
async fn stages_run_in_order_with_job_environment() {
    init_tracing();
    let project = TempProject::new();
    let mut cfg = config(project.root());
    cfg.env.insert("GREETING".into(), "hi".into());
    cfg.inputs.insert("target".into(), "prod".into());

    let plan = Plan::new(vec![
        Stage {
            runs: vec![run(
                "first",
                "echo \"$GREETING $FLOWRUN_EVENT_NAME $FLOWRUN_JOB $INPUT_TARGET\" > first.txt",
            )],
        },
        Stage {
            runs: vec![run("second", "cat first.txt > second.txt")],
        },
    ]);

    with_timeout(executor(plan, cfg).execute(&RunContext::default()))
        .await
        .expect("plan succeeds");

    let second = std::fs::read_to_string(project.root().join("second.txt")).expect("output");
    assert_eq!(second.trim(), "hi push first prod");
}

#[tokio::test]
async fn failing_job_reports_exit_code_and_stops_later_stages() {
    let project = TempProject::new();
    let plan = Plan::new(vec![
        Stage {
            runs: vec![run("broken", "exit 3")],
        },
        Stage {
            runs: vec![run("never", "touch never.txt")],
        },
    ]);

    let err = with_timeout(executor(plan, config(project.root())).execute(&RunContext::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowrunError::JobFailed { ref job, code: 3 } if job == "broken"));
    assert!(!project.root().join("never.txt").exists());
}

#[tokio::test]
async fn dry_run_spawns_nothing() {
    let project = TempProject::new();
    let plan = Plan::new(vec![Stage {
        runs: vec![run("touch", "touch created.txt")],
    }]);

    executor(plan, config(project.root()))
        .execute(&RunContext::new(CancellationToken::new(), true))
        .await
        .expect("dry run");

    assert!(!project.root().join("created.txt").exists());
}

#[tokio::test]
async fn cancellation_kills_running_jobs() {
    init_tracing();
    let project = TempProject::new();
    let plan = Plan::new(vec![Stage {
        runs: vec![run("sleepy", "sleep 30")],
    }]);
    let cancel = CancellationToken::new();
    let ctx = RunContext::new(cancel.clone(), false);
    let exec = executor(plan, config(project.root()));

    let started = Instant::now();
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    };
    let (result, ()) = with_timeout(async { tokio::join!(exec.execute(&ctx), canceller) }).await;

    assert!(matches!(result, Err(FlowrunError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancellation_reaches_processes_started_by_the_script() {
    let project = TempProject::new();
    let plan = Plan::new(vec![Stage {
        runs: vec![run("nested", "sleep 4; echo done > done.txt")],
    }]);
    let cancel = CancellationToken::new();
    let ctx = RunContext::new(cancel.clone(), false);
    let exec = executor(plan, config(project.root()));

    let started = Instant::now();
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    };
    let (result, ()) = with_timeout(async { tokio::join!(exec.execute(&ctx), canceller) }).await;

    assert!(matches!(result, Err(FlowrunError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!project.root().join("done.txt").exists());
}

#[tokio::test]
async fn failing_job_kills_its_siblings_in_the_stage() {
    let project = TempProject::new();
    let plan = Plan::new(vec![Stage {
        runs: vec![
            run("slow", "sleep 4; echo late > late.txt"),
            run("broken", "sleep 0.1; exit 2"),
        ],
    }]);

    let started = Instant::now();
    let err = with_timeout(executor(plan, config(project.root())).execute(&RunContext::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowrunError::JobFailed { ref job, code: 2 } if job == "broken"));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!project.root().join("late.txt").exists());
}

#[tokio::test]
async fn factory_builds_executor_for_an_empty_plan() {
    let project = TempProject::new();
    let factory = ProcessExecutorFactory::new(config(project.root()));
    let exec = factory.build_executor(&Plan::default()).expect("executor");
    exec.execute(&RunContext::default()).await.expect("nothing to run");
}

#[test]
fn secrets_are_masked_longest_first() {
    let secrets = ["abc".to_string(), "abcdef".to_string(), String::new()];
    let masker = SecretMasker::new(secrets.iter());
    assert_eq!(masker.mask("token=abcdef and abc"), "token=*** and ***");
    assert_eq!(masker.mask("nothing here"), "nothing here");
}

#[test]
fn job_env_layers_variables_and_maps_platform_image() {
    let mut cfg = ExecutorConfig {
        event_name: "release".to_string(),
        artifact_url: Some("http://127.0.0.1:34567/".to_string()),
        ..ExecutorConfig::default()
    };
    cfg.env.insert("LEVEL".into(), "global".into());
    cfg.secrets.insert("TOKEN".into(), "t".into());
    cfg.platforms.insert("ubuntu-latest".into(), "node:16".into());

    let mut job_run = run("deploy", "true");
    job_run.job = JobBuilder::new("true")
        .runs_on("Ubuntu-Latest")
        .env("LEVEL", "job")
        .build();

    let env = job_env(&job_run, &cfg);
    assert_eq!(env["LEVEL"], "job");
    assert_eq!(env["TOKEN"], "t");
    assert_eq!(env["FLOWRUN_EVENT_NAME"], "release");
    assert_eq!(env["FLOWRUN_WORKFLOW"], "ci");
    assert_eq!(env["FLOWRUN_PLATFORM_IMAGE"], "node:16");
    assert_eq!(env["FLOWRUN_ARTIFACT_URL"], "http://127.0.0.1:34567/");
}
