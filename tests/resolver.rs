// tests/resolver.rs

mod common;
use crate::common::init_tracing;

use proptest::prelude::*;

use flowrun::errors::FlowrunError;
use flowrun::plan::{
    execution_event, filter_target, EventPlanResolver, PlanTarget, ResolveRequest, DEFAULT_EVENT,
};
use flowrun_test_utils::fakes::FakePlanner;

fn request(event: Option<&str>, job: Option<&str>, detect_event: bool) -> ResolveRequest {
    ResolveRequest {
        event: event.map(str::to_string),
        job: job.map(str::to_string),
        detect_event,
    }
}

#[test]
fn no_events_no_selection_uses_default_event_and_all_jobs() {
    init_tracing();
    let planner = FakePlanner::new(&[]);
    let resolver = EventPlanResolver::new(&planner);
    let req = request(None, None, false);

    let exec = resolver.execution_plan(&req).expect("execution plan");
    assert_eq!(exec.event_name, DEFAULT_EVENT);
    assert_eq!(exec.target, PlanTarget::Event(DEFAULT_EVENT.to_string()));

    resolver.filter_plan(&req).expect("filter plan");
    assert_eq!(planner.calls().last(), Some(&PlanTarget::All));
}

#[test]
fn single_event_is_used_for_execution_but_not_for_filtering() {
    let planner = FakePlanner::new(&["pull_request"]);
    let resolver = EventPlanResolver::new(&planner);
    let req = request(None, None, false);

    let exec = resolver.execution_plan(&req).expect("execution plan");
    assert_eq!(exec.event_name, "pull_request");

    resolver.filter_plan(&req).expect("filter plan");
    assert_eq!(planner.calls().last(), Some(&PlanTarget::All));
}

#[test]
fn detect_event_filters_by_first_discovered_event() {
    let planner = FakePlanner::new(&["release", "push"]);
    let resolver = EventPlanResolver::new(&planner);
    let req = request(None, None, true);

    resolver.filter_plan(&req).expect("filter plan");
    assert_eq!(
        planner.calls().last(),
        Some(&PlanTarget::Event("release".to_string()))
    );

    let exec = resolver.execution_plan(&req).expect("execution plan");
    assert_eq!(exec.event_name, "release");
}

#[test]
fn duplicate_single_event_counts_as_one() {
    let events = vec!["push".to_string(), "push".to_string()];
    assert_eq!(execution_event(&request(None, None, false), &events, "x"), "push");
}

#[test]
fn several_events_without_detection_fall_back_to_default() {
    let planner = FakePlanner::new(&["release", "schedule"]);
    let resolver = EventPlanResolver::new(&planner).with_default_event("workflow_dispatch");

    let exec = resolver
        .execution_plan(&request(None, None, false))
        .expect("execution plan");
    assert_eq!(exec.event_name, "workflow_dispatch");
}

#[test]
fn job_selects_job_plan_but_event_is_still_resolved() {
    let planner = FakePlanner::new(&["push"]);
    let resolver = EventPlanResolver::new(&planner);

    let exec = resolver
        .execution_plan(&request(None, Some("build"), false))
        .expect("execution plan");

    assert_eq!(exec.target, PlanTarget::Job("build".to_string()));
    assert_eq!(exec.event_name, "push");
    assert_eq!(exec.plan.runs().next().map(|r| r.job_id.as_str()), Some("build"));
}

#[test]
fn unknown_job_error_propagates_verbatim() {
    let planner = FakePlanner::new(&["push"]).with_jobs(&["build"]);
    let resolver = EventPlanResolver::new(&planner);

    let err = resolver
        .execution_plan(&request(None, Some("deploy"), false))
        .unwrap_err();
    assert!(matches!(err, FlowrunError::UnknownJob(ref id) if id == "deploy"));
}

#[test]
fn empty_strings_count_as_not_given() {
    let events = vec!["a".to_string(), "b".to_string()];
    let req = request(Some(""), Some(""), false);
    assert_eq!(filter_target(&req, &events), PlanTarget::All);
    assert_eq!(execution_event(&req, &events, "push"), "push");
}

fn event_name() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

proptest! {
    #[test]
    fn explicit_event_always_wins(
        event in event_name(),
        events in proptest::collection::vec(event_name(), 0..5),
        detect in any::<bool>(),
    ) {
        let req = request(Some(event.as_str()), None, detect);
        prop_assert_eq!(execution_event(&req, &events, DEFAULT_EVENT), event.clone());
        prop_assert_eq!(filter_target(&req, &events), PlanTarget::Event(event));
    }

    #[test]
    fn job_always_drives_filter_plan(
        job in "[a-z]{1,8}",
        event in proptest::option::of(event_name()),
        events in proptest::collection::vec(event_name(), 0..5),
        detect in any::<bool>(),
    ) {
        let req = request(event.as_deref(), Some(job.as_str()), detect);
        prop_assert_eq!(filter_target(&req, &events), PlanTarget::Job(job));
    }

    #[test]
    fn execution_event_is_never_empty(
        events in proptest::collection::vec("[a-z]{0,4}", 0..5),
        detect in any::<bool>(),
    ) {
        let req = request(None, None, detect);
        let chosen = execution_event(&req, &events, DEFAULT_EVENT);
        prop_assert!(!chosen.is_empty());
        prop_assert!(chosen == DEFAULT_EVENT || events.contains(&chosen));
    }

    #[test]
    fn without_detection_filter_never_picks_an_event_on_its_own(
        events in proptest::collection::vec(event_name(), 0..5),
    ) {
        let req = request(None, None, false);
        prop_assert_eq!(filter_target(&req, &events), PlanTarget::All);
    }
}
