// tests/workflow_planner.rs

mod common;
use crate::common::{init_tracing, TempProject};

use flowrun::errors::FlowrunError;
use flowrun::fs::RealFileSystem;
use flowrun::plan::render::{render_graph, render_list, render_listing};
use flowrun::plan::{Plan, WorkflowPlanner};
use flowrun::workflow::{load_workflow_str, TomlWorkflowPlanner};
use flowrun_test_utils::builders::{JobBuilder, WorkflowBuilder};

fn stage_ids(plan: &Plan) -> Vec<Vec<String>> {
    plan.stages
        .iter()
        .map(|s| s.runs.iter().map(|r| r.job_id.clone()).collect())
        .collect()
}

fn ci_workflow() -> WorkflowBuilder {
    WorkflowBuilder::new("ci")
        .on("push")
        .on("pull_request")
        .job("build", JobBuilder::new("cargo build").build())
        .job("lint", JobBuilder::new("cargo clippy").build())
        .job("test", JobBuilder::new("cargo test").needs("build").build())
        .job(
            "package",
            JobBuilder::new("cargo package").needs("test").needs("lint").build(),
        )
}

#[test]
fn jobs_are_layered_by_dependency_depth() {
    init_tracing();
    let wf = ci_workflow().build("ci.toml");
    assert_eq!(
        wf.stages(),
        &[
            vec!["build".to_string(), "lint".to_string()],
            vec!["test".to_string()],
            vec!["package".to_string()],
        ]
    );
}

#[test]
fn name_defaults_to_file_stem_and_on_accepts_a_single_string() {
    let wf = load_workflow_str(
        "flows/nightly.toml",
        "on = \"schedule\"\n[jobs.run]\nrun = \"true\"\n",
    )
    .expect("valid workflow");
    assert_eq!(wf.name, "nightly");
    assert_eq!(wf.events, vec!["schedule"]);
}

#[test]
fn dependency_cycles_are_rejected() {
    let toml = WorkflowBuilder::new("loop")
        .on("push")
        .job("a", JobBuilder::new("true").needs("b").build())
        .job("b", JobBuilder::new("true").needs("a").build())
        .to_toml();

    let err = load_workflow_str("loop.toml", &toml).unwrap_err();
    assert!(matches!(err, FlowrunError::DagCycle(_)), "got {err:?}");
}

#[test]
fn unknown_and_self_needs_are_rejected() {
    let unknown = WorkflowBuilder::new("w")
        .on("push")
        .job("a", JobBuilder::new("true").needs("ghost").build())
        .to_toml();
    assert!(matches!(
        load_workflow_str("w.toml", &unknown),
        Err(FlowrunError::Config(_))
    ));

    let self_dep = WorkflowBuilder::new("w")
        .on("push")
        .job("a", JobBuilder::new("true").needs("a").build())
        .to_toml();
    assert!(matches!(
        load_workflow_str("w.toml", &self_dep),
        Err(FlowrunError::Config(_))
    ));
}

#[test]
fn workflow_without_jobs_is_rejected() {
    let err = load_workflow_str("empty.toml", "on = [\"push\"]\n").unwrap_err();
    assert!(matches!(err, FlowrunError::Config(_)));
}

#[test]
fn job_plan_contains_the_job_and_what_it_needs() {
    let planner = TomlWorkflowPlanner::new(vec![ci_workflow().build("ci.toml")]);

    let plan = planner.plan_for_job("test").expect("plan");
    assert_eq!(stage_ids(&plan), vec![vec!["build"], vec!["test"]]);

    let err = planner.plan_for_job("deploy").unwrap_err();
    assert!(matches!(err, FlowrunError::UnknownJob(ref id) if id == "deploy"));
}

#[test]
fn event_plan_only_includes_triggered_workflows() {
    let release = WorkflowBuilder::new("release")
        .on("release")
        .job("publish", JobBuilder::new("cargo publish").build())
        .build("release.toml");
    let planner = TomlWorkflowPlanner::new(vec![ci_workflow().build("ci.toml"), release]);

    assert_eq!(
        planner.discovered_events(),
        vec!["push", "pull_request", "release"]
    );

    let plan = planner.plan_for_event("release").expect("plan");
    assert_eq!(stage_ids(&plan), vec![vec!["publish"]]);

    let none = planner.plan_for_event("schedule").expect("plan");
    assert!(none.is_empty());

    let all = planner.plan_for_all().expect("plan");
    assert_eq!(all.job_count(), 5);
    assert_eq!(all.stages[0].runs.len(), 3);
}

#[test]
fn loads_sorted_files_and_recurses_only_when_asked() {
    init_tracing();
    let project = TempProject::new();
    project.write(
        ".flowrun/workflows/b.toml",
        &WorkflowBuilder::new("b").on("push").job("b1", JobBuilder::new("true").build()).to_toml(),
    );
    project.write(
        ".flowrun/workflows/a.toml",
        &WorkflowBuilder::new("a").on("push").job("a1", JobBuilder::new("true").build()).to_toml(),
    );
    project.write(
        ".flowrun/workflows/nested/c.toml",
        &WorkflowBuilder::new("c").on("release").job("c1", JobBuilder::new("true").build()).to_toml(),
    );
    project.write(".flowrun/workflows/README.md", "not a workflow");

    let dir = project.root().join(".flowrun/workflows");

    let flat = TomlWorkflowPlanner::load(&RealFileSystem, &dir, false).expect("load");
    let names: Vec<&str> = flat.workflows().iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);

    let deep = TomlWorkflowPlanner::load(&RealFileSystem, &dir, true).expect("load");
    let names: Vec<&str> = deep.workflows().iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn missing_workflows_path_is_an_error() {
    let project = TempProject::new();
    let err = TomlWorkflowPlanner::load(&RealFileSystem, &project.root().join("nope"), true)
        .unwrap_err();
    assert!(matches!(err, FlowrunError::Config(_)));
}

#[test]
fn list_and_graph_render_every_job() {
    let planner = TomlWorkflowPlanner::new(vec![ci_workflow().build("ci.toml")]);
    let plan = planner.plan_for_all().expect("plan");

    let list = render_list(&plan);
    let lines: Vec<&str> = list.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Stage"));
    assert!(lines.iter().any(|l| l.contains("package") && l.contains("ci.toml")));

    let graph = render_graph(&plan);
    for id in ["build", "lint", "test", "package"] {
        assert!(graph.contains(id), "graph is missing {id}:\n{graph}");
    }
}

#[test]
fn list_takes_precedence_over_graph() {
    let planner = TomlWorkflowPlanner::new(vec![ci_workflow().build("ci.toml")]);
    let plan = planner.plan_for_all().expect("plan");

    assert_eq!(render_listing(&plan, true, true), Some(render_list(&plan)));
    assert_eq!(render_listing(&plan, false, true), Some(render_graph(&plan)));
    assert_eq!(render_listing(&plan, false, false), None);
}
