use anyhow::Result;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::migrate::config::load_config;
use crate::migrate::embed::{ExifTool, MetadataWriter};
use crate::migrate::paths::resolve_paths;
use crate::migrate::plan::{self, PlanOptions};
use crate::migrate::translate::TranslateOptions;
use crate::migrate::warn::{self, WarnEvent};

#[derive(Debug, Clone)]
pub struct PrepOptions {
    pub source_dir: PathBuf,
    pub plan_path: PathBuf,
    pub staging_dir: Option<PathBuf>,
    pub no_embed: bool,
}

pub fn run(opts: &PrepOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths();
    let staging_dir = opts.staging_dir.clone().unwrap_or(paths.staging_dir);
    let mut report = CommandReport::new("prep");

    report.detail(format!("source_dir={}", opts.source_dir.display()));
    report.detail(format!("staging_dir={}", staging_dir.display()));
    report.detail(format!("plan={}", opts.plan_path.display()));

    if !opts.source_dir.is_dir() {
        report.issue("source dir does not exist or is not a directory");
        return Ok(report);
    }

    let mut exiftool = None;
    if cfg.planning.embed_metadata && !opts.no_embed {
        match ExifTool::resolve(paths.exiftool_bin.as_deref()) {
            Ok(tool) => {
                report.detail(format!("exiftool={}", tool.bin().display()));
                exiftool = Some(tool);
            }
            Err(err) => {
                warn::emit(
                    WarnEvent::new("EXIFTOOL_UNAVAILABLE", "prep")
                        .reason("metadata will not be embedded")
                        .err(&format!("{err:#}")),
                );
                report.detail("exiftool=unavailable (embedding skipped)");
            }
        }
    } else {
        report.detail("embedding=disabled");
    }

    let options = PlanOptions {
        translate: TranslateOptions {
            albums_as_keywords: cfg.planning.albums_as_keywords,
            dedupe_keywords: cfg.planning.dedupe_keywords,
        },
    };
    let writer = exiftool.as_mut().map(|tool| tool as &mut dyn MetadataWriter);
    let action_plan = plan::prepare(&opts.source_dir, &staging_dir, options, writer)?;
    plan::save(&opts.plan_path, &action_plan)?;

    let meta = &action_plan.metadata;
    report.detail(format!("total_photos={}", meta.total_photos));
    report.detail(format!("photos_prepared={}", meta.photos_prepared));
    report.detail(format!("photos_with_metadata={}", meta.photos_with_metadata));
    report.detail(format!("album_count={}", meta.album_count));
    report.detail(format!("unmatched_ids={}", meta.unmatched_ids.len()));
    report.detail(format!("skipped_files={}", meta.skipped_files.len()));
    report.detail(format!("actions={}", action_plan.actions.len()));
    if action_plan.actions.is_empty() {
        report.detail("no photos found; plan is empty");
    } else {
        report.detail(format!(
            "next: photo-migrate import {}",
            opts.plan_path.display()
        ));
    }

    Ok(report)
}
