use crate::library::{AlbumHandle, ItemAttribute, ItemHandle, LibraryIdentity, PhotoLibrary};
use crate::migrate::util::run_command_with_optional_timeout;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Adapter that drives the photo library through an external bridge
/// executable, one process per operation, JSON on stdout.
#[derive(Debug, Clone)]
pub struct BridgeLibrary {
    bin: PathBuf,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AlbumReply {
    album: Option<String>,
}

fn ensure_executable_path(path: &Path) -> Result<()> {
    let meta = fs::metadata(path)
        .with_context(|| format!("library bridge path does not exist: {}", path.display()))?;
    if !meta.is_file() {
        anyhow::bail!("library bridge path is not a file: {}", path.display());
    }
    Ok(())
}

impl BridgeLibrary {
    pub fn new(bin: &Path, timeout_secs: Option<u64>) -> Result<Self> {
        ensure_executable_path(bin)?;
        Ok(Self {
            bin: bin.to_path_buf(),
            timeout_secs,
        })
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn run(&self, args: &[OsString]) -> Result<Output> {
        let rendered = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(bin = %self.bin.display(), args = %rendered, "library bridge call");

        let mut cmd = Command::new(&self.bin);
        cmd.args(args);
        let out = run_command_with_optional_timeout(&mut cmd, self.timeout_secs)
            .with_context(|| format!("failed to run `{} {rendered}`", self.bin.display()))?;
        if out.status.success() {
            return Ok(out);
        }
        anyhow::bail!(
            "library bridge failed: {rendered}\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&out.stdout).trim(),
            String::from_utf8_lossy(&out.stderr).trim()
        )
    }

    fn run_json<T: DeserializeOwned>(&self, args: &[OsString]) -> Result<T> {
        let out = self.run(args)?;
        serde_json::from_slice(&out.stdout).with_context(|| {
            format!(
                "invalid JSON from library bridge: {}",
                String::from_utf8_lossy(&out.stdout).trim()
            )
        })
    }
}

fn os(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

impl PhotoLibrary for BridgeLibrary {
    fn identity(&mut self) -> Result<LibraryIdentity> {
        self.run_json(&os(&["identity"]))
    }

    fn import(&mut self, paths: &[PathBuf], skip_duplicate_check: bool) -> Result<Vec<ItemHandle>> {
        let mut args = os(&["import"]);
        if skip_duplicate_check {
            args.push("--skip-duplicate-check".into());
        }
        args.extend(paths.iter().map(|p| p.as_os_str().to_owned()));
        self.run_json(&args)
    }

    fn album_by_name(&mut self, name: &str) -> Result<Option<AlbumHandle>> {
        let reply: AlbumReply = self.run_json(&os(&["album-find", name]))?;
        Ok(reply.album.map(AlbumHandle))
    }

    fn create_album(&mut self, name: &str) -> Result<AlbumHandle> {
        let reply: AlbumReply = self.run_json(&os(&["album-create", name]))?;
        reply
            .album
            .map(AlbumHandle)
            .with_context(|| format!("library bridge created no album for `{name}`"))
    }

    fn add_to_album(&mut self, album: &AlbumHandle, items: &[ItemHandle]) -> Result<()> {
        let mut args = os(&["album-add", album.0.as_str()]);
        args.extend(items.iter().map(|i| OsString::from(&i.0)));
        self.run(&args)?;
        Ok(())
    }

    fn set_attribute(&mut self, item: &ItemHandle, attribute: &ItemAttribute) -> Result<()> {
        let id = item.0.as_str();
        let args = match attribute {
            ItemAttribute::Title(text) => os(&["set-title", id, text.as_str()]),
            ItemAttribute::Description(text) => os(&["set-description", id, text.as_str()]),
            ItemAttribute::Keywords(words) => {
                let mut args = os(&["set-keywords", id]);
                args.extend(words.iter().map(OsString::from));
                args
            }
            ItemAttribute::Location {
                latitude,
                longitude,
            } => os(&[
                "set-location",
                id,
                latitude.to_string().as_str(),
                longitude.to_string().as_str(),
            ]),
        };
        self.run(&args)?;
        Ok(())
    }
}
