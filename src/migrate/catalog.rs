//! Planning-phase catalog: item id → album names, metadata record, media file.
//!
//! Iteration order is insertion order: ids first seen in the album index come
//! first (in index order), followed by ids first seen during the directory
//! scan (in filename order). That order becomes the action order of the plan.

use crate::migrate::album_index;
use crate::migrate::identity::{denylisted_ids, id_from_filename, is_denylisted};
use crate::migrate::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "mov", "mp4", "avi"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub albums: Vec<String>,
    pub metadata_path: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
}

impl CatalogEntry {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            albums: Vec::new(),
            metadata_path: None,
            media_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    positions: HashMap<String, usize>,
}

impl Catalog {
    /// Entry for `id`, created on first touch.
    pub fn entry_mut(&mut self, id: &str) -> &mut CatalogEntry {
        let pos = match self.positions.get(id) {
            Some(pos) => *pos,
            None => {
                self.entries.push(CatalogEntry::new(id));
                let pos = self.entries.len() - 1;
                self.positions.insert(id.to_string(), pos);
                pos
            }
        };
        &mut self.entries[pos]
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.positions.get(id).map(|pos| &self.entries[*pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids that have no media file and are not explained by the denylist.
    pub fn unmatched_ids(&self) -> Vec<String> {
        let denied = denylisted_ids();
        self.entries
            .iter()
            .filter(|entry| entry.media_path.is_none())
            .filter(|entry| !denied.contains(&entry.id))
            .map(|entry| entry.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogBuild {
    pub catalog: Catalog,
    pub memberships: usize,
    /// Media files that were skipped because no identifier could be derived.
    pub skipped_files: Vec<String>,
}

pub fn is_media_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}

/// Find the descriptive-metadata record for `id`: `photo_<id>_o.json`
/// first, then `photo_<id>.json`.
pub fn locate_metadata(source_dir: &Path, id: &str) -> Option<PathBuf> {
    [format!("photo_{id}_o.json"), format!("photo_{id}.json")]
        .into_iter()
        .map(|name| source_dir.join(name))
        .find(|path| path.is_file())
}

fn sorted_file_names(source_dir: &Path) -> Result<Vec<String>> {
    let read_dir = fs::read_dir(source_dir)
        .with_context(|| format!("failed to read {}", source_dir.display()))?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        // Follows symlinks so linked media is cataloged.
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => continue,
            Err(err) => {
                debug!(path = %entry.path().display(), error = %err, "skipping unreadable entry");
                continue;
            }
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!(name = ?raw, "skipping non-utf8 filename"),
        }
    }
    names.sort();
    Ok(names)
}

/// Join the album index, the media files and their metadata records of a
/// flat export directory into one catalog. Re-running over unchanged inputs
/// yields an identical catalog.
pub fn build(source_dir: &Path) -> Result<CatalogBuild> {
    let index = album_index::load(source_dir)?;
    let mut catalog = Catalog::default();
    let memberships = album_index::apply(&index, &mut catalog);
    let mut skipped_files = Vec::new();

    for filename in sorted_file_names(source_dir)? {
        if is_denylisted(&filename) {
            debug!(file = %filename, "skipping denylisted legacy filename");
            continue;
        }
        if !is_media_file(&filename) {
            continue;
        }

        let Some(id) = id_from_filename(&filename) else {
            warn::emit(
                WarnEvent::new("NO_IDENTIFIER", "catalog")
                    .file(&filename)
                    .reason("filename-has-no-id-group"),
            );
            skipped_files.push(filename);
            continue;
        };

        let metadata_path = locate_metadata(source_dir, &id);
        let entry = catalog.entry_mut(&id);
        entry.media_path = Some(source_dir.join(&filename));
        if metadata_path.is_some() {
            entry.metadata_path = metadata_path;
        }
    }

    Ok(CatalogBuild {
        catalog,
        memberships,
        skipped_files,
    })
}
