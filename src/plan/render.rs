// src/plan/render.rs

//! Text output for `--list` and `--graph`.

use std::fmt::Write;

use super::Plan;

const LIST_HEADER: [&str; 6] = [
    "Stage",
    "Job ID",
    "Job name",
    "Workflow name",
    "Workflow file",
    "Events",
];

/// Output for the list/graph flags. `--list` takes precedence over
/// `--graph`; `None` when neither is set.
pub fn render_listing(plan: &Plan, list: bool, graph: bool) -> Option<String> {
    if list {
        Some(render_list(plan))
    } else if graph {
        Some(render_graph(plan))
    } else {
        None
    }
}

/// One row per job, columns aligned.
pub fn render_list(plan: &Plan) -> String {
    let mut rows: Vec<[String; 6]> = Vec::with_capacity(plan.job_count() + 1);
    rows.push(LIST_HEADER.map(str::to_string));

    for (idx, stage) in plan.stages.iter().enumerate() {
        for run in &stage.runs {
            let file = run
                .workflow_file
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            rows.push([
                idx.to_string(),
                run.job_id.clone(),
                run.display_name().to_string(),
                run.workflow_name.clone(),
                file,
                run.events.join(","),
            ]);
        }
    }

    let mut widths = [0usize; 6];
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in &rows {
        let line = row
            .iter()
            .zip(widths.iter())
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

/// Each stage as a row of boxed job names, stages joined by arrows.
pub fn render_graph(plan: &Plan) -> String {
    let mut out = String::new();
    let stages: Vec<_> = plan.stages.iter().filter(|s| !s.runs.is_empty()).collect();

    for (idx, stage) in stages.iter().enumerate() {
        let labels: Vec<&str> = stage.runs.iter().map(|r| r.display_name()).collect();

        let top = labels
            .iter()
            .map(|l| format!("╭{}╮", "─".repeat(l.chars().count() + 2)))
            .collect::<Vec<_>>()
            .join(" ");
        let mid = labels
            .iter()
            .map(|l| format!("│ {l} │"))
            .collect::<Vec<_>>()
            .join(" ");
        let bottom = labels
            .iter()
            .map(|l| format!("╰{}╯", "─".repeat(l.chars().count() + 2)))
            .collect::<Vec<_>>()
            .join(" ");

        let _ = writeln!(out, "{top}");
        let _ = writeln!(out, "{mid}");
        let _ = writeln!(out, "{bottom}");

        if idx + 1 < stages.len() {
            let width = top.chars().count();
            let _ = writeln!(out, "{:>w$}", "⬇", w = width / 2 + 1);
        }
    }
    out
}
