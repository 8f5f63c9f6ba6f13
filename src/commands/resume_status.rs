use anyhow::Result;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::migrate::paths::resolve_paths;
use crate::migrate::plan::{self, ActionPlan};
use crate::migrate::resume_log::{self, LogEntry};

#[derive(Debug, Clone)]
pub struct ResumeStatusOptions {
    pub plan_path: PathBuf,
    pub log_path: Option<PathBuf>,
}

/// Log lines whose filename disagrees with the plan action at that index.
fn mismatched_entries(plan: &ActionPlan, entries: &[LogEntry]) -> usize {
    entries
        .iter()
        .filter(|entry| {
            plan.actions
                .get(entry.index)
                .is_none_or(|action| action.filename != entry.filename)
        })
        .count()
}

/// Summarizes the resume log against the plan. Read-only: nothing here feeds
/// the executor, which resumes only from the offset the operator passes.
pub fn run(opts: &ResumeStatusOptions) -> Result<CommandReport> {
    let paths = resolve_paths();
    let log_path = opts.log_path.clone().unwrap_or(paths.resume_log);
    let mut report = CommandReport::new("resume-status");

    report.detail(format!("plan={}", opts.plan_path.display()));
    report.detail(format!("resume_log={}", log_path.display()));

    let action_plan = plan::load(&opts.plan_path)?;
    let total = action_plan.actions.len();
    report.detail(format!("plan_actions={total}"));

    if !log_path.exists() {
        report.detail("resume log not found; nothing has been imported with it yet");
        report.detail("suggested_resume=0");
        return Ok(report);
    }

    let entries = resume_log::read_entries(&log_path)?;
    let summary = resume_log::summarize(&entries);
    report.detail(format!("log_lines={}", summary.lines));
    report.detail(format!("imported={}", summary.imported));
    report.detail(format!("skipped={}", summary.skipped));
    report.detail(format!("errored={}", summary.errored));
    match summary.highest_index {
        Some(i) => report.detail(format!("highest_index={i}")),
        None => report.detail("highest_index=none"),
    }

    let suggested = summary.suggested_resume().min(total);
    report.detail(format!("suggested_resume={suggested}"));
    report.detail(format!("remaining={}", total - suggested));

    let mismatched = mismatched_entries(&action_plan, &entries);
    if mismatched > 0 {
        report.issue(format!(
            "{mismatched} log line(s) do not match the plan; the log may belong to another plan"
        ));
    }

    Ok(report)
}
