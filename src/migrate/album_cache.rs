use crate::library::{AlbumHandle, PhotoLibrary};
use crate::migrate::album_index::{album_key, sanitize_album_name};
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::info;

/// Memoizes album name → handle for one execution run. The first lookup of a
/// key asks the library for an existing album and creates one only when the
/// lookup comes back empty; every later lookup is served from memory.
#[derive(Debug, Default)]
pub struct AlbumResolver {
    resolved: HashMap<String, AlbumHandle>,
    created: usize,
    found: usize,
}

impl AlbumResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, library: &mut dyn PhotoLibrary, name: &str) -> Result<AlbumHandle> {
        let key = album_key(name);
        if let Some(handle) = self.resolved.get(&key) {
            return Ok(handle.clone());
        }

        let album_name = sanitize_album_name(name);
        let handle = match library
            .album_by_name(&album_name)
            .with_context(|| format!("album lookup failed for `{album_name}`"))?
        {
            Some(existing) => {
                self.found += 1;
                existing
            }
            None => {
                let created = library
                    .create_album(&album_name)
                    .with_context(|| format!("album creation failed for `{album_name}`"))?;
                info!(album = %album_name, handle = %created, "created album");
                self.created += 1;
                created
            }
        };

        self.resolved.insert(key, handle.clone());
        Ok(handle)
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn found(&self) -> usize {
        self.found
    }
}
