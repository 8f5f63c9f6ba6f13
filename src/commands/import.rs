use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::library::bridge::BridgeLibrary;
use crate::migrate::config::{OnError, load_config};
use crate::migrate::executor::{self, Decision, Executor, FailurePolicy, ImportFailure};
use crate::migrate::paths::resolve_paths;
use crate::migrate::plan;
use crate::migrate::resume_log::ResumeLog;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub plan_path: PathBuf,
    pub library_name: Option<String>,
    pub resume: usize,
    pub log_path: Option<PathBuf>,
    pub on_error: Option<OnError>,
}

/// Asks the operator on the terminal; anything but yes stops the run.
struct TerminalPrompt;

impl FailurePolicy for TerminalPrompt {
    fn decide(&mut self, failure: &ImportFailure<'_>) -> Decision {
        let mut stderr = io::stderr();
        let _ = write!(
            stderr,
            "import of #{} ({}) failed: {:#}\ncontinue with the next photo? [y/N] (resume later with --resume {}) ",
            failure.index, failure.filename, failure.error, failure.resume_from
        );
        let _ = stderr.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(n) if n > 0 => match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => Decision::Continue,
                _ => Decision::Stop,
            },
            _ => Decision::Stop,
        }
    }
}

fn policy_for(mode: OnError) -> Box<dyn FailurePolicy> {
    match mode {
        OnError::Prompt => Box::new(TerminalPrompt),
        OnError::Continue => Box::new(|_: &ImportFailure<'_>| Decision::Continue),
        OnError::Stop => Box::new(|_: &ImportFailure<'_>| Decision::Stop),
    }
}

pub fn run(opts: &ImportOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths();
    let log_path = opts.log_path.clone().unwrap_or(paths.resume_log);
    let on_error = opts.on_error.unwrap_or(cfg.execution.on_error);
    let mut report = CommandReport::new("import");

    report.detail(format!("plan={}", opts.plan_path.display()));
    report.detail(format!("resume_log={}", log_path.display()));
    report.detail(format!("resume_from={}", opts.resume));
    report.detail(format!("on_error={on_error}"));

    let action_plan = plan::load(&opts.plan_path)?;

    let Some(bridge_bin) = paths.bridge_bin else {
        report.issue("PHOTO_LIBRARY_BRIDGE_BIN is not set; cannot reach the photo library");
        return Ok(report);
    };
    let mut library = BridgeLibrary::new(&bridge_bin, cfg.execution.bridge_timeout())?;
    report.detail(format!("bridge={}", library.bin().display()));

    let identity = executor::verify_library(&mut library, opts.library_name.as_deref())
        .context("library check failed; no photos were imported")?;
    report.detail(format!("library={} version={}", identity.name, identity.version));

    let log = ResumeLog::open(&log_path)?;
    let mut policy = policy_for(on_error);
    let summary = Executor::new(&mut library, policy.as_mut(), log).run(&action_plan, opts.resume)?;

    report.detail(format!("attempted={}", summary.attempted));
    report.detail(format!("imported={}", summary.imported));
    report.detail(format!("skipped={}", summary.skipped));
    report.detail(format!("errored={}", summary.errored));
    report.detail(format!("albums_created={}", summary.albums_created));
    report.detail(format!("albums_reused={}", summary.albums_found));
    report.detail(format!("album_memberships={}", summary.album_memberships));
    if summary.album_failures > 0 || summary.attribute_failures > 0 {
        report.detail(format!(
            "album_failures={} attribute_failures={}",
            summary.album_failures, summary.attribute_failures
        ));
    }

    match summary.stopped_at {
        Some(next) => report.issue(format!(
            "run stopped after an import failure; continue with `photo-migrate import {} --resume {next}`",
            opts.plan_path.display()
        )),
        None => report.detail(format!(
            "plan complete: processed actions {}..{}",
            summary.start, summary.total
        )),
    }
    if summary.errored > 0 {
        report.detail(format!(
            "{} action(s) logged as ERROR in {}",
            summary.errored,
            log_path.display()
        ));
    }

    Ok(report)
}
