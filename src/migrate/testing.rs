use crate::library::{AlbumHandle, ItemAttribute, ItemHandle, LibraryIdentity, PhotoLibrary};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum ImportBehavior {
    Empty,
    Many(usize),
    Fail(String),
}

/// In-memory library that records every call made against it.
#[derive(Debug, Default)]
pub struct FakeLibrary {
    pub identity_name: String,
    /// Album name → handle already present before the run.
    pub existing_albums: HashMap<String, String>,
    pub created_albums: Vec<String>,
    pub album_lookups: usize,
    pub fail_album_create: bool,
    pub fail_album_add_for: HashSet<String>,
    pub fail_attributes: HashSet<&'static str>,
    /// Report an empty import for files imported earlier.
    pub dedupe_on_reimport: bool,
    pub behaviors: HashMap<String, ImportBehavior>,
    pub imports: Vec<(PathBuf, bool)>,
    pub album_adds: Vec<(AlbumHandle, ItemHandle)>,
    pub attributes_set: Vec<&'static str>,
    /// Counter behind the `item-N` handles returned by imports.
    pub next_item: usize,
}

impl FakeLibrary {
    pub fn behave(&mut self, filename: &str, behavior: ImportBehavior) {
        self.behaviors.insert(filename.to_string(), behavior);
    }

    fn album_name(&self, handle: &AlbumHandle) -> Option<String> {
        self.existing_albums
            .iter()
            .find(|(_, h)| **h == handle.0)
            .map(|(name, _)| name.clone())
    }

    fn new_item(&mut self) -> ItemHandle {
        self.next_item += 1;
        ItemHandle(format!("item-{}", self.next_item))
    }
}

impl PhotoLibrary for FakeLibrary {
    fn identity(&mut self) -> Result<LibraryIdentity> {
        Ok(LibraryIdentity {
            name: self.identity_name.clone(),
            version: "test".into(),
        })
    }

    fn import(&mut self, paths: &[PathBuf], skip_duplicate_check: bool) -> Result<Vec<ItemHandle>> {
        let mut out = Vec::new();
        for path in paths {
            let seen = self.imports.iter().any(|(p, _)| p == path);
            self.imports.push((path.clone(), skip_duplicate_check));
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.behaviors.get(&filename).cloned() {
                Some(ImportBehavior::Empty) => {}
                Some(ImportBehavior::Many(n)) => {
                    for _ in 0..n {
                        let item = self.new_item();
                        out.push(item);
                    }
                }
                Some(ImportBehavior::Fail(reason)) => anyhow::bail!(reason),
                None if seen && self.dedupe_on_reimport && !skip_duplicate_check => {}
                None => {
                    let item = self.new_item();
                    out.push(item);
                }
            }
        }
        Ok(out)
    }

    fn album_by_name(&mut self, name: &str) -> Result<Option<AlbumHandle>> {
        self.album_lookups += 1;
        Ok(self.existing_albums.get(name).cloned().map(AlbumHandle))
    }

    fn create_album(&mut self, name: &str) -> Result<AlbumHandle> {
        if self.fail_album_create {
            anyhow::bail!("album creation refused");
        }
        let handle = format!("album-{}", self.created_albums.len() + 1);
        self.created_albums.push(name.to_string());
        self.existing_albums.insert(name.to_string(), handle.clone());
        Ok(AlbumHandle(handle))
    }

    fn add_to_album(&mut self, album: &AlbumHandle, items: &[ItemHandle]) -> Result<()> {
        if let Some(name) = self.album_name(album) {
            if self.fail_album_add_for.contains(&name) {
                anyhow::bail!("cannot add to album `{name}`");
            }
        }
        for item in items {
            self.album_adds.push((album.clone(), item.clone()));
        }
        Ok(())
    }

    fn set_attribute(&mut self, _item: &ItemHandle, attribute: &ItemAttribute) -> Result<()> {
        let name = attribute.name();
        if self.fail_attributes.contains(name) {
            anyhow::bail!("cannot set {name}");
        }
        self.attributes_set.push(name);
        Ok(())
    }
}
