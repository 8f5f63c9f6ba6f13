//! Replays an action plan against a photo library, one action at a time.
//!
//! Per action: PENDING → IMPORTING → {IMPORTED, SKIPPED, ERRORED}. Only an
//! imported item gets metadata and album membership, and failures at that
//! stage never revert the import. Exactly one resume log line is appended
//! per attempted action.

use crate::error::MigrateError;
use crate::library::{
    ItemAttribute, ItemHandle, LibraryIdentity, PhotoLibrary, library_name_matches,
};
use crate::migrate::album_cache::AlbumResolver;
use crate::migrate::plan::{Action, ActionPlan};
use crate::migrate::resume_log::{LogEntry, Outcome, ResumeLog};
use crate::migrate::translate::TranslatedMetadata;
use crate::migrate::warn::{self, WarnEvent};
use anyhow::Result;
use tracing::{error, info};

/// The library's own duplicate heuristic stays on: a duplicate surfaces as an
/// empty import result and is logged as SKIPPED.
const SKIP_DUPLICATE_CHECK: bool = false;

const STAGED_FILE_MISSING: &str = "staged file missing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop,
}

/// An unexpected collaborator failure while importing one action.
#[derive(Debug)]
pub struct ImportFailure<'a> {
    pub index: usize,
    pub filename: &'a str,
    pub error: &'a anyhow::Error,
    /// Offset to pass on a later run to pick up after this action.
    pub resume_from: usize,
}

/// Decides whether a run continues after an unexpected import failure.
pub trait FailurePolicy {
    fn decide(&mut self, failure: &ImportFailure<'_>) -> Decision;
}

impl<F> FailurePolicy for F
where
    F: FnMut(&ImportFailure<'_>) -> Decision,
{
    fn decide(&mut self, failure: &ImportFailure<'_>) -> Decision {
        self(failure)
    }
}

/// Terminal state of one attempted action.
#[derive(Debug)]
pub enum ActionState {
    Imported {
        albums_added: usize,
        albums_failed: usize,
        attributes_failed: usize,
    },
    Skipped,
    /// The staged file was gone; recorded without consulting the policy.
    Missing,
    Failed(anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub start: usize,
    pub total: usize,
    pub attempted: usize,
    pub imported: usize,
    pub skipped: usize,
    pub errored: usize,
    pub album_memberships: usize,
    pub album_failures: usize,
    pub attribute_failures: usize,
    pub albums_created: usize,
    pub albums_found: usize,
    /// Set when the run was stopped early; the offset to resume from.
    pub stopped_at: Option<usize>,
}

pub fn attributes_for(meta: &TranslatedMetadata) -> Vec<ItemAttribute> {
    let mut out = Vec::new();
    if let Some(title) = &meta.title {
        out.push(ItemAttribute::Title(title.clone()));
    }
    if let Some(description) = &meta.description {
        out.push(ItemAttribute::Description(description.clone()));
    }
    if !meta.keywords.is_empty() {
        out.push(ItemAttribute::Keywords(meta.keywords.clone()));
    }
    if let Some(point) = meta.location {
        out.push(ItemAttribute::Location {
            latitude: point.latitude,
            longitude: point.longitude,
        });
    }
    out
}

/// Query the open library and, when `expected` is given, refuse to proceed
/// against a differently named one.
pub fn verify_library(
    library: &mut dyn PhotoLibrary,
    expected: Option<&str>,
) -> Result<LibraryIdentity> {
    let identity = library.identity()?;
    if let Some(expected) = expected {
        if !library_name_matches(&identity.name, expected) {
            return Err(MigrateError::LibraryMismatch {
                expected: expected.to_string(),
                found: identity.name,
            }
            .into());
        }
    }
    Ok(identity)
}

/// Owns the album resolver and the resume log for one run.
pub struct Executor<'a> {
    library: &'a mut dyn PhotoLibrary,
    policy: &'a mut dyn FailurePolicy,
    log: ResumeLog,
    albums: AlbumResolver,
}

impl<'a> Executor<'a> {
    pub fn new(
        library: &'a mut dyn PhotoLibrary,
        policy: &'a mut dyn FailurePolicy,
        log: ResumeLog,
    ) -> Self {
        Self {
            library,
            policy,
            log,
            albums: AlbumResolver::new(),
        }
    }

    /// Process actions `[start, len)` in plan order. The offset is trusted
    /// as given; it is never recomputed from the resume log.
    pub fn run(mut self, plan: &ActionPlan, start: usize) -> Result<RunSummary> {
        let total = plan.actions.len();
        if start > total {
            return Err(MigrateError::ResumeOffsetOutOfRange {
                offset: start,
                len: total,
            }
            .into());
        }

        let mut summary = RunSummary {
            start,
            total,
            ..RunSummary::default()
        };
        info!(start, total, log = %self.log.path().display(), "starting import run");

        for (index, action) in plan.actions.iter().enumerate().skip(start) {
            summary.attempted += 1;
            info!("[{}/{}] importing {}", index + 1, total, action.filename);

            match self.process(index, action)? {
                ActionState::Imported {
                    albums_added,
                    albums_failed,
                    attributes_failed,
                } => {
                    summary.imported += 1;
                    summary.album_memberships += albums_added;
                    summary.album_failures += albums_failed;
                    summary.attribute_failures += attributes_failed;
                }
                ActionState::Skipped => summary.skipped += 1,
                ActionState::Missing => summary.errored += 1,
                ActionState::Failed(err) => {
                    summary.errored += 1;
                    let failure = ImportFailure {
                        index,
                        filename: &action.filename,
                        error: &err,
                        resume_from: index + 1,
                    };
                    if self.policy.decide(&failure) == Decision::Stop {
                        info!(index, resume_from = index + 1, "import stopped");
                        summary.stopped_at = Some(index + 1);
                        break;
                    }
                }
            }
        }

        summary.albums_created = self.albums.created();
        summary.albums_found = self.albums.found();
        Ok(summary)
    }

    fn record(
        &mut self,
        index: usize,
        action: &Action,
        outcome: Outcome,
        detail: Option<&str>,
    ) -> Result<()> {
        let mut entry = LogEntry::new(index, &action.filename, outcome);
        if let Some(detail) = detail {
            entry = entry.with_detail(detail);
        }
        self.log.append(&entry)
    }

    fn process(&mut self, index: usize, action: &Action) -> Result<ActionState> {
        if !action.staged_file.is_file() {
            error!(index, staged = %action.staged_file.display(), "staged file not found");
            let detail = format!("{STAGED_FILE_MISSING}: {}", action.staged_file.display());
            self.record(index, action, Outcome::Error, Some(&detail))?;
            return Ok(ActionState::Missing);
        }

        let imported = match self
            .library
            .import(std::slice::from_ref(&action.staged_file), SKIP_DUPLICATE_CHECK)
        {
            Ok(items) => items,
            Err(err) => {
                let detail = format!("{err:#}");
                error!(index, file = %action.filename, err = %detail, "import failed");
                self.record(index, action, Outcome::Error, Some(&detail))?;
                return Ok(ActionState::Failed(err));
            }
        };

        if imported.is_empty() {
            info!(index, file = %action.filename, "skipped (duplicate or rejected)");
            self.record(index, action, Outcome::Skipped, None)?;
            return Ok(ActionState::Skipped);
        }

        if imported.len() != 1 {
            let violation = MigrateError::ImportCountMismatch {
                index,
                count: imported.len(),
            };
            self.record(index, action, Outcome::Error, Some(&violation.to_string()))?;
            return Err(violation.into());
        }
        let item = &imported[0];

        let attributes_failed = action
            .metadata
            .as_ref()
            .map_or(0, |meta| self.apply_metadata(item, meta, &action.photo_id));
        let (albums_added, albums_failed) = self.add_to_albums(item, action);

        self.record(index, action, Outcome::Imported, None)?;
        Ok(ActionState::Imported {
            albums_added,
            albums_failed,
            attributes_failed,
        })
    }

    fn apply_metadata(
        &mut self,
        item: &ItemHandle,
        meta: &TranslatedMetadata,
        photo_id: &str,
    ) -> usize {
        let mut failed = 0usize;
        for attribute in attributes_for(meta) {
            if let Err(err) = self.library.set_attribute(item, &attribute) {
                failed += 1;
                warn::emit(
                    WarnEvent::new("ATTRIBUTE_FAILED", "execute")
                        .item(photo_id)
                        .reason(attribute.name())
                        .err(&format!("{err:#}")),
                );
            }
        }
        failed
    }

    fn add_to_albums(&mut self, item: &ItemHandle, action: &Action) -> (usize, usize) {
        let mut added = 0usize;
        let mut failed = 0usize;
        if !action.albums.is_empty() {
            info!(
                "adding to {} album(s): {}",
                action.albums.len(),
                action.albums.join(", ")
            );
        }
        for name in &action.albums {
            let outcome = self
                .albums
                .resolve(&mut *self.library, name)
                .and_then(|album| self.library.add_to_album(&album, std::slice::from_ref(item)));
            match outcome {
                Ok(()) => added += 1,
                Err(err) => {
                    failed += 1;
                    warn::emit(
                        WarnEvent::new("ALBUM_ADD_FAILED", "execute")
                            .item(&action.photo_id)
                            .reason(name)
                            .err(&format!("{err:#}")),
                    );
                }
            }
        }
        (added, failed)
    }
}
