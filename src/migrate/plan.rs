//! Action plan: the persisted hand-off between the planning and execution
//! phases. Action order is catalog order and is the unit of resumability, so
//! nothing downstream may reorder `actions`.

use crate::migrate::album_index::album_key;
use crate::migrate::catalog::{self, CatalogEntry};
use crate::migrate::embed::{self, MetadataWriter};
use crate::migrate::translate::{self, TranslateOptions, TranslatedMetadata};
use crate::migrate::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, FileTimes};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub source_directory: PathBuf,
    pub staging_directory: PathBuf,
    pub total_photos: usize,
    #[serde(default)]
    pub photos_prepared: usize,
    #[serde(default)]
    pub photos_with_metadata: usize,
    #[serde(default)]
    pub album_count: usize,
    /// Catalog ids referenced by the album index that have no media file.
    #[serde(default)]
    pub unmatched_ids: Vec<String>,
    /// Media files skipped because no identifier could be derived.
    #[serde(default)]
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub name: String,
    pub photo_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub photo_id: String,
    pub source_file: PathBuf,
    pub staged_file: PathBuf,
    pub filename: String,
    pub has_metadata: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TranslatedMetadata>,
    #[serde(default)]
    pub albums: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub metadata: PlanMetadata,
    #[serde(default)]
    pub albums: BTreeMap<String, AlbumSummary>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl ActionPlan {
    fn new(source_dir: &Path, staging_dir: &Path, total_photos: usize) -> Self {
        Self {
            metadata: PlanMetadata {
                source_directory: source_dir.to_path_buf(),
                staging_directory: staging_dir.to_path_buf(),
                total_photos,
                photos_prepared: 0,
                photos_with_metadata: 0,
                album_count: 0,
                unmatched_ids: Vec::new(),
                skipped_files: Vec::new(),
            },
            albums: BTreeMap::new(),
            actions: Vec::new(),
        }
    }

    /// Group by the same key the executor resolves albums with, so the plan
    /// lists exactly the albums a run will create or reuse.
    fn count_albums(&mut self, albums: &[String]) {
        for name in albums {
            self.albums
                .entry(album_key(name))
                .or_insert_with(|| AlbumSummary {
                    name: name.clone(),
                    photo_count: 0,
                })
                .photo_count += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub translate: TranslateOptions,
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Refuse to stage into the export itself: copying a file onto itself
/// truncates the original.
fn ensure_distinct_dirs(source_dir: &Path, staging_dir: &Path) -> Result<()> {
    if same_file(source_dir, staging_dir) {
        anyhow::bail!(
            "staging dir {} is the source dir {}; refusing to overwrite the originals",
            staging_dir.display(),
            source_dir.display()
        );
    }
    Ok(())
}

/// Copy `src` to `dst`, carrying over access and modification times.
pub fn stage_copy(src: &Path, dst: &Path) -> Result<()> {
    if same_file(src, dst) {
        anyhow::bail!(
            "{} and {} are the same file",
            src.display(),
            dst.display()
        );
    }
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    let meta = fs::metadata(src).with_context(|| format!("failed to stat {}", src.display()))?;
    let mut times = FileTimes::new().set_modified(meta.modified()?);
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    fs::File::options()
        .write(true)
        .open(dst)
        .and_then(|f| f.set_times(times))
        .with_context(|| format!("failed to set times on {}", dst.display()))?;
    Ok(())
}

fn translated_metadata(entry: &CatalogEntry, opts: &PlanOptions) -> Option<TranslatedMetadata> {
    let path = entry.metadata_path.as_deref()?;
    match translate::load_record(path) {
        Ok(record) => {
            let meta = translate::translate(&record, &entry.id, &entry.albums, opts.translate);
            (!meta.is_empty()).then_some(meta)
        }
        Err(err) => {
            warn::emit(
                WarnEvent::new("METADATA_UNREADABLE", "plan")
                    .item(&entry.id)
                    .file(&path.display().to_string())
                    .err(&format!("{err:#}")),
            );
            None
        }
    }
}

fn embed_metadata(
    writer: &mut dyn MetadataWriter,
    staged: &Path,
    meta: &TranslatedMetadata,
    item: &str,
) -> bool {
    let request = embed::tag_request(meta);
    if request.is_empty() {
        return false;
    }
    match writer.set_tags(staged, &request) {
        Ok(()) => true,
        Err(err) => {
            warn::emit(
                WarnEvent::new("EMBED_FAILED", "plan")
                    .item(item)
                    .file(&staged.display().to_string())
                    .err(&format!("{err:#}")),
            );
            false
        }
    }
}

/// Build the catalog for `source_dir`, stage every media file into
/// `staging_dir`, and assemble the ordered action plan. Per-item failures are
/// warned and never abort planning.
pub fn prepare(
    source_dir: &Path,
    staging_dir: &Path,
    opts: PlanOptions,
    mut writer: Option<&mut dyn MetadataWriter>,
) -> Result<ActionPlan> {
    ensure_distinct_dirs(source_dir, staging_dir)?;
    let build = catalog::build(source_dir)?;
    let total = build.catalog.len();
    info!(
        source = %source_dir.display(),
        total,
        memberships = build.memberships,
        "catalog built"
    );

    let mut plan = ActionPlan::new(source_dir, staging_dir, total);
    plan.metadata.unmatched_ids = build.catalog.unmatched_ids();
    plan.metadata.skipped_files = build.skipped_files.clone();
    if build.catalog.is_empty() {
        return Ok(plan);
    }

    fs::create_dir_all(staging_dir)
        .with_context(|| format!("failed to create {}", staging_dir.display()))?;

    for entry in build.catalog.iter() {
        let Some(source_file) = entry.media_path.as_deref() else {
            if plan.metadata.unmatched_ids.contains(&entry.id) {
                warn::emit(
                    WarnEvent::new("NO_MEDIA_FILE", "plan")
                        .item(&entry.id)
                        .reason("referenced-by-album-index-only"),
                );
            }
            continue;
        };
        let Some(filename) = source_file
            .file_name()
            .and_then(|n| n.to_str())
            .map(ToOwned::to_owned)
        else {
            continue;
        };

        let staged_file = staging_dir.join(&filename);
        let staged = match stage_copy(source_file, &staged_file) {
            Ok(()) => true,
            Err(err) => {
                warn::emit(
                    WarnEvent::new("STAGE_COPY_FAILED", "plan")
                        .item(&entry.id)
                        .file(&filename)
                        .err(&format!("{err:#}")),
                );
                false
            }
        };

        let metadata = translated_metadata(entry, &opts);
        let mut has_metadata = false;
        if staged {
            if let (Some(meta), Some(writer)) = (metadata.as_ref(), writer.as_deref_mut()) {
                has_metadata = embed_metadata(writer, &staged_file, meta, &entry.id);
            }
        }
        if has_metadata {
            plan.metadata.photos_with_metadata += 1;
        }

        plan.count_albums(&entry.albums);
        plan.actions.push(Action {
            photo_id: entry.id.clone(),
            source_file: source_file.to_path_buf(),
            staged_file,
            filename,
            has_metadata,
            metadata,
            albums: entry.albums.clone(),
        });

        let prepared = plan.actions.len();
        if prepared % PROGRESS_EVERY == 0 {
            info!(prepared, total, "staging progress");
        } else {
            debug!(prepared, id = %entry.id, "staged");
        }
    }

    plan.metadata.photos_prepared = plan.actions.len();
    plan.metadata.album_count = plan.albums.len();
    Ok(plan)
}

pub fn save(path: &Path, plan: &ActionPlan) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(plan)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn load(path: &Path) -> Result<ActionPlan> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: ActionPlan = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::embed::TagRequest;

    #[derive(Default)]
    struct RecordingWriter {
        calls: Vec<(PathBuf, usize)>,
        fail_for: Option<String>,
    }

    impl MetadataWriter for RecordingWriter {
        fn set_tags(&mut self, path: &Path, tags: &TagRequest) -> Result<()> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if self.fail_for.as_deref() == Some(name) {
                anyhow::bail!("exiftool exploded");
            }
            self.calls.push((path.to_path_buf(), tags.len()));
            Ok(())
        }
    }

    fn scenario(lat: &str, lon: &str) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("export");
        fs::create_dir_all(&src).expect("mkdir");
        fs::write(src.join("img_001_9999999999_o.jpg"), b"jpeg").expect("photo");
        fs::write(
            src.join("photo_9999999999_o.json"),
            format!(
                r#"{{"name":"Bay","tags":[{{"tag":"boat"}},{{"tag":"harbor"}}],
                    "geo":[{{"latitude":"{lat}","longitude":"{lon}"}}]}}"#
            ),
        )
        .expect("record");
        fs::write(
            src.join("albums.json"),
            r#"{"albums":[{"title":"Trip 2020","photos":["9999999999"]}]}"#,
        )
        .expect("albums");
        tmp
    }

    #[test]
    fn single_photo_scenario_builds_one_action() {
        let tmp = scenario("38500000", "-121500000");
        let staging = tmp.path().join("staged");
        let plan = prepare(
            &tmp.path().join("export"),
            &staging,
            PlanOptions::default(),
            None,
        )
        .expect("prepare");

        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.albums.len(), 1);
        assert_eq!(plan.albums["trip 2020"].name, "Trip 2020");
        assert_eq!(plan.albums["trip 2020"].photo_count, 1);
        assert_eq!(plan.metadata.album_count, 1);
        assert_eq!(plan.metadata.photos_prepared, 1);

        let action = &plan.actions[0];
        assert_eq!(action.photo_id, "9999999999");
        assert_eq!(action.filename, "img_001_9999999999_o.jpg");
        assert_eq!(action.albums, vec!["Trip 2020".to_string()]);
        assert!(!action.has_metadata);
        assert!(staging.join("img_001_9999999999_o.jpg").is_file());

        let meta = action.metadata.as_ref().expect("metadata");
        assert_eq!(meta.keywords.len(), 2);
        let point = meta.location.expect("location");
        assert!((point.latitude - 38.5).abs() < 1e-9);
        assert!((point.longitude + 121.5).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_coordinates_are_omitted_from_plan() {
        let tmp = scenario("95000000", "0");
        let plan = prepare(
            &tmp.path().join("export"),
            &tmp.path().join("staged"),
            PlanOptions::default(),
            None,
        )
        .expect("prepare");
        let meta = plan.actions[0].metadata.as_ref().expect("metadata");
        assert_eq!(meta.location, None);
        assert_eq!(meta.keywords.len(), 2);
    }

    #[test]
    fn embedding_marks_has_metadata_and_failures_do_not_abort() {
        let tmp = scenario("38500000", "-121500000");
        let src = tmp.path().join("export");
        fs::write(src.join("other_1234_o.jpg"), b"jpeg").expect("photo");
        fs::write(src.join("photo_1234.json"), r#"{"name":"Other"}"#).expect("record");

        let mut writer = RecordingWriter {
            fail_for: Some("other_1234_o.jpg".into()),
            ..RecordingWriter::default()
        };
        let plan = prepare(
            &src,
            &tmp.path().join("staged"),
            PlanOptions::default(),
            Some(&mut writer),
        )
        .expect("prepare");

        assert_eq!(plan.actions.len(), 2);
        assert!(plan.actions[0].has_metadata);
        assert!(!plan.actions[1].has_metadata);
        assert_eq!(plan.metadata.photos_with_metadata, 1);
        assert_eq!(writer.calls.len(), 1);
    }

    #[test]
    fn staging_preserves_modification_time() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("a_1_o.jpg");
        fs::write(&src, b"x").expect("write");
        let old = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_500_000_000);
        fs::File::options()
            .write(true)
            .open(&src)
            .and_then(|f| f.set_modified(old))
            .expect("set mtime");

        let dst = tmp.path().join("staged.jpg");
        stage_copy(&src, &dst).expect("stage");
        assert_eq!(fs::metadata(&dst).expect("meta").modified().expect("mtime"), old);
    }

    #[test]
    fn plan_order_is_stable_and_round_trips_through_disk() {
        let tmp = scenario("38500000", "-121500000");
        let src = tmp.path().join("export");
        for name in ["z_3_o.jpg", "m_2_o.png", "a_1_o.gif"] {
            fs::write(src.join(name), b"x").expect("photo");
        }
        let staging = tmp.path().join("staged");
        let first = prepare(&src, &staging, PlanOptions::default(), None).expect("first");
        let second = prepare(&src, &staging, PlanOptions::default(), None).expect("second");
        assert_eq!(first, second);

        let ids: Vec<&str> = first.actions.iter().map(|a| a.photo_id.as_str()).collect();
        assert_eq!(ids, vec!["9999999999", "1", "2", "3"]);

        let path = tmp.path().join("plan.json");
        save(&path, &first).expect("save");
        assert_eq!(load(&path).expect("load"), first);
    }

    #[test]
    fn staging_into_the_export_is_refused_and_originals_survive() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let photo = tmp.path().join("a_1_o.jpg");
        fs::write(&photo, b"original bytes").expect("photo");

        let err = prepare(tmp.path(), tmp.path(), PlanOptions::default(), None)
            .expect_err("same dir");
        assert!(format!("{err:#}").contains("refusing to overwrite"));

        let nested = tmp.path().join(".").join("");
        assert!(prepare(tmp.path(), &nested, PlanOptions::default(), None).is_err());
        assert_eq!(fs::read(&photo).expect("read"), b"original bytes");
    }

    #[test]
    fn stage_copy_onto_itself_fails_without_truncating() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let photo = tmp.path().join("a_1_o.jpg");
        fs::write(&photo, b"original bytes").expect("photo");

        assert!(stage_copy(&photo, &photo).is_err());
        assert_eq!(fs::read(&photo).expect("read"), b"original bytes");
    }

    #[test]
    fn albums_differing_only_in_case_are_one_plan_album() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("export");
        fs::create_dir_all(&src).expect("mkdir");
        fs::write(src.join("a_1_o.jpg"), b"x").expect("photo");
        fs::write(src.join("b_2_o.jpg"), b"x").expect("photo");
        fs::write(
            src.join("albums.json"),
            r#"{"albums":[{"title":"Trip 2020","photos":["1"]},{"title":"trip 2020","photos":["2"]}]}"#,
        )
        .expect("albums");

        let plan = prepare(&src, &tmp.path().join("staged"), PlanOptions::default(), None)
            .expect("prepare");
        assert_eq!(plan.metadata.album_count, 1);
        let summary = &plan.albums["trip 2020"];
        assert_eq!(summary.name, "Trip 2020");
        assert_eq!(summary.photo_count, 2);
    }

    #[test]
    fn empty_export_yields_empty_plan() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let plan = prepare(
            tmp.path(),
            &tmp.path().join("staged"),
            PlanOptions::default(),
            None,
        )
        .expect("prepare");
        assert!(plan.actions.is_empty());
        assert!(!tmp.path().join("staged").exists());
    }
}
