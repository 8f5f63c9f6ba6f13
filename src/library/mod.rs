pub mod bridge;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const LIBRARY_SUFFIX: &str = ".photoslibrary";

/// Opaque handle to an item that the library imported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemHandle(pub String);

/// Opaque handle to an album in the library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumHandle(pub String);

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AlbumHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibraryIdentity {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// One settable attribute on an imported item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemAttribute {
    Title(String),
    Description(String),
    Keywords(Vec<String>),
    Location { latitude: f64, longitude: f64 },
}

impl ItemAttribute {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::Description(_) => "description",
            Self::Keywords(_) => "keywords",
            Self::Location { .. } => "location",
        }
    }
}

/// The stateful, non-transactional photo library the plan is replayed
/// against. Every call may fail independently; nothing is rolled back.
pub trait PhotoLibrary {
    fn identity(&mut self) -> Result<LibraryIdentity>;

    /// Import files. An empty result means the library rejected the files or
    /// treated them as duplicates.
    fn import(&mut self, paths: &[PathBuf], skip_duplicate_check: bool)
    -> Result<Vec<ItemHandle>>;

    fn album_by_name(&mut self, name: &str) -> Result<Option<AlbumHandle>>;

    fn create_album(&mut self, name: &str) -> Result<AlbumHandle>;

    fn add_to_album(&mut self, album: &AlbumHandle, items: &[ItemHandle]) -> Result<()>;

    fn set_attribute(&mut self, item: &ItemHandle, attribute: &ItemAttribute) -> Result<()>;
}

fn strip_library_suffix(name: &str) -> &str {
    name.strip_suffix(LIBRARY_SUFFIX).unwrap_or(name)
}

/// Case-insensitive library name comparison that ignores a trailing
/// `.photoslibrary` on either side.
pub fn library_name_matches(current: &str, expected: &str) -> bool {
    strip_library_suffix(current).to_lowercase() == strip_library_suffix(expected).to_lowercase()
}
