use crate::migrate::catalog::Catalog;
use crate::migrate::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const ALBUM_INDEX_FILE: &str = "albums.json";
pub const UNTITLED_ALBUM: &str = "Untitled";

/// Item ids that mean "unassigned" in the export, not a real photo.
const SENTINEL_IDS: &[&str] = &["0", ""];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumIndex {
    #[serde(default)]
    pub albums: Vec<AlbumRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub photos: Vec<RawItemId>,
}

/// Exports are inconsistent about quoting ids, so both shapes are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawItemId {
    Text(String),
    Number(u64),
}

impl RawItemId {
    pub fn normalized(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

pub fn is_sentinel_id(id: &str) -> bool {
    SENTINEL_IDS.contains(&id)
}

/// Keep alphanumerics, space, hyphen and underscore, then trim.
pub fn sanitize_album_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Grouping key for an album name: sanitized, then case-folded, so names
/// that differ only in punctuation or capitalization are one album.
pub fn album_key(name: &str) -> String {
    sanitize_album_name(name).to_lowercase()
}

/// Album name used as the grouping key for a raw title. Titles that are
/// missing or sanitize to nothing fall back to `Untitled`.
pub fn album_name_for_title(title: Option<&str>) -> String {
    let sanitized = sanitize_album_name(title.unwrap_or(UNTITLED_ALBUM));
    if sanitized.is_empty() {
        UNTITLED_ALBUM.to_string()
    } else {
        sanitized
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawAlbumIndex {
    #[serde(default)]
    albums: Vec<serde_json::Value>,
}

/// Decode records one at a time; a malformed record is warned and skipped so
/// the remaining albums still apply.
fn parse_index(raw: &str, path: &Path) -> AlbumIndex {
    let file = path.display().to_string();
    let parsed: RawAlbumIndex = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn::emit(
                WarnEvent::new("ALBUM_INDEX_INVALID", "album-index")
                    .file(&file)
                    .reason("photos-will-have-no-album-assignments")
                    .err(&err.to_string()),
            );
            return AlbumIndex::default();
        }
    };

    let mut albums = Vec::with_capacity(parsed.albums.len());
    for (position, value) in parsed.albums.into_iter().enumerate() {
        match serde_json::from_value::<AlbumRecord>(value) {
            Ok(record) => albums.push(record),
            Err(err) => warn::emit(
                WarnEvent::new("ALBUM_RECORD_INVALID", "album-index")
                    .item(&position.to_string())
                    .file(&file)
                    .err(&err.to_string()),
            ),
        }
    }
    AlbumIndex { albums }
}

/// Read the album index from `source_dir`. A missing or unreadable index is
/// not an error: photos then import without album assignment.
pub fn load(source_dir: &Path) -> Result<AlbumIndex> {
    let path = source_dir.join(ALBUM_INDEX_FILE);
    if !path.is_file() {
        warn::emit(
            WarnEvent::new("ALBUM_INDEX_MISSING", "album-index")
                .file(&path.display().to_string())
                .reason("photos-will-have-no-album-assignments"),
        );
        return Ok(AlbumIndex::default());
    }

    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_index(&raw, &path))
}

/// Record album membership for every referenced id, creating catalog entries
/// as needed. Returns the number of memberships recorded.
pub fn apply(index: &AlbumIndex, catalog: &mut Catalog) -> usize {
    let mut memberships = 0usize;
    for album in &index.albums {
        let name = album_name_for_title(album.title.as_deref());
        for raw_id in &album.photos {
            let id = raw_id.normalized();
            if is_sentinel_id(&id) {
                continue;
            }
            catalog.entry_mut(&id).albums.push(name.clone());
            memberships += 1;
        }
    }
    memberships
}
