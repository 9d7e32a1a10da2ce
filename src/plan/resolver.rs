// src/plan/resolver.rs

//! Event / job resolution.
//!
//! Listing and running resolve differently on purpose:
//!
//! | step | filter plan (`--list`, `--graph`) | execution plan |
//! |------|-----------------------------------|----------------|
//! | 1 | job ID given → that job | positional event |
//! | 2 | positional event | the only distinct discovered event |
//! | 3 | `--detect-event` → first discovered event | `--detect-event` → first discovered event |
//! | 4 | all jobs | [`DEFAULT_EVENT`] |
//!
//! For execution a job ID, when given, decides the plan; the resolved event
//! name is still what the jobs see as their trigger.

use std::collections::BTreeSet;

use tracing::debug;

use super::{Plan, PlanTarget, WorkflowPlanner};
use crate::errors::Result;

/// Event used for execution when nothing else decides.
pub const DEFAULT_EVENT: &str = "push";

/// The user's event/job selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Positional event name.
    pub event: Option<String>,
    /// `--job`.
    pub job: Option<String>,
    /// `--detect-event`.
    pub detect_event: bool,
}

impl ResolveRequest {
    fn event(&self) -> Option<&str> {
        self.event.as_deref().filter(|e| !e.is_empty())
    }

    fn job(&self) -> Option<&str> {
        self.job.as_deref().filter(|j| !j.is_empty())
    }
}

/// Plan to run plus the event that triggers it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExecution {
    pub event_name: String,
    pub target: PlanTarget,
    pub plan: Plan,
}

fn first_event(events: &[String]) -> Option<&str> {
    events.first().map(String::as_str).filter(|e| !e.is_empty())
}

fn only_event(events: &[String]) -> Option<&str> {
    let distinct: BTreeSet<&str> = events
        .iter()
        .map(String::as_str)
        .filter(|e| !e.is_empty())
        .collect();
    if distinct.len() == 1 {
        distinct.into_iter().next()
    } else {
        None
    }
}

/// Target of the filter plan. Falls back to "all jobs" when ambiguous.
pub fn filter_target(request: &ResolveRequest, events: &[String]) -> PlanTarget {
    if let Some(job) = request.job() {
        debug!(job, "filtering by job");
        return PlanTarget::Job(job.to_string());
    }
    if let Some(event) = request.event() {
        debug!(event, "filtering by event from arguments");
        return PlanTarget::Event(event.to_string());
    }
    if request.detect_event {
        if let Some(event) = first_event(events) {
            debug!(event, "filtering by first detected workflow event");
            return PlanTarget::Event(event.to_string());
        }
    }
    debug!("filtering with all jobs");
    PlanTarget::All
}

/// Event that triggers the execution. Always concrete.
pub fn execution_event(request: &ResolveRequest, events: &[String], default_event: &str) -> String {
    if let Some(event) = request.event() {
        debug!(event, "using event from arguments");
        return event.to_string();
    }
    if let Some(event) = only_event(events) {
        debug!(event, "using the only detected workflow event");
        return event.to_string();
    }
    if request.detect_event {
        if let Some(event) = first_event(events) {
            debug!(event, "using first detected workflow event");
            return event.to_string();
        }
    }
    debug!(event = default_event, "using default workflow event");
    default_event.to_string()
}

/// Target of the execution plan: the job if given, else the event.
pub fn execution_target(request: &ResolveRequest, event_name: &str) -> PlanTarget {
    match request.job() {
        Some(job) => PlanTarget::Job(job.to_string()),
        None => PlanTarget::Event(event_name.to_string()),
    }
}

/// Builds filter and execution plans from a [`WorkflowPlanner`].
#[derive(Debug)]
pub struct EventPlanResolver<'a, P: ?Sized> {
    planner: &'a P,
    default_event: String,
}

impl<'a, P: WorkflowPlanner + ?Sized> EventPlanResolver<'a, P> {
    pub fn new(planner: &'a P) -> Self {
        Self {
            planner,
            default_event: DEFAULT_EVENT.to_string(),
        }
    }

    /// Override the event used when nothing else decides.
    pub fn with_default_event(mut self, event: impl Into<String>) -> Self {
        self.default_event = event.into();
        self
    }

    /// Plan used only for listing / graphing.
    pub fn filter_plan(&self, request: &ResolveRequest) -> Result<Plan> {
        let events = self.planner.discovered_events();
        let target = filter_target(request, &events);
        debug!(%target, "preparing filter plan");
        self.planner.plan_for(&target)
    }

    /// Plan that is actually run.
    pub fn execution_plan(&self, request: &ResolveRequest) -> Result<ResolvedExecution> {
        let events = self.planner.discovered_events();
        let event_name = execution_event(request, &events, &self.default_event);
        let target = execution_target(request, &event_name);
        debug!(%target, event = %event_name, "planning execution");
        let plan = self.planner.plan_for(&target)?;
        Ok(ResolvedExecution {
            event_name,
            target,
            plan,
        })
    }
}
