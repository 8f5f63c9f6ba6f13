use crate::migrate::translate::TranslatedMetadata;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    List(Vec<String>),
    Number(f64),
}

/// Ordered `tag name → value` request for one file.
pub type TagRequest = Vec<(&'static str, TagValue)>;

/// Writes a tag request into a file's metadata container in place.
pub trait MetadataWriter {
    fn set_tags(&mut self, path: &Path, tags: &TagRequest) -> Result<()>;
}

/// IPTC/XMP/EXIF tags that photo libraries read back on import.
pub fn tag_request(meta: &TranslatedMetadata) -> TagRequest {
    let mut tags = TagRequest::new();
    if let Some(title) = &meta.title {
        tags.push(("IPTC:ObjectName", TagValue::Text(title.clone())));
        tags.push(("XMP-dc:Title", TagValue::Text(title.clone())));
    }
    if let Some(description) = &meta.description {
        tags.push(("IPTC:Caption-Abstract", TagValue::Text(description.clone())));
        tags.push(("XMP-dc:Description", TagValue::Text(description.clone())));
    }
    if !meta.keywords.is_empty() {
        tags.push(("IPTC:Keywords", TagValue::List(meta.keywords.clone())));
        tags.push(("XMP-dc:Subject", TagValue::List(meta.keywords.clone())));
    }
    if let Some(date) = &meta.date_taken {
        tags.push(("DateTimeOriginal", TagValue::Text(date.clone())));
    }
    if let Some(point) = meta.location {
        tags.push(("GPSLatitude*", TagValue::Number(point.latitude)));
        tags.push(("GPSLongitude*", TagValue::Number(point.longitude)));
    }
    if let Some(rights) = &meta.rights {
        tags.push(("XMP-dc:Rights", TagValue::Text(rights.clone())));
    }
    tags
}

/// Command-line arguments for one exiftool invocation, file path excluded.
pub fn exiftool_args(tags: &TagRequest) -> Vec<String> {
    let mut args = vec!["-overwrite_original".to_string()];
    for (name, value) in tags {
        match value {
            TagValue::Text(text) => args.push(format!("-{name}={text}")),
            TagValue::Number(n) => args.push(format!("-{name}={n}")),
            TagValue::List(items) => {
                args.extend(items.iter().map(|item| format!("-{name}={item}")));
            }
        }
    }
    args
}

#[derive(Debug, Clone)]
pub struct ExifTool {
    bin: PathBuf,
}

impl ExifTool {
    /// Use `bin` when it exists, otherwise look `exiftool` up on PATH.
    pub fn resolve(bin: Option<&Path>) -> Result<Self> {
        if let Some(bin) = bin.filter(|b| b.exists()) {
            return Ok(Self {
                bin: bin.to_path_buf(),
            });
        }
        let found = which::which("exiftool").context("exiftool not found in EXIFTOOL_BIN or PATH")?;
        Ok(Self { bin: found })
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }
}

impl MetadataWriter for ExifTool {
    fn set_tags(&mut self, path: &Path, tags: &TagRequest) -> Result<()> {
        let output = Command::new(&self.bin)
            .args(exiftool_args(tags))
            .arg(path)
            .output()
            .with_context(|| format!("failed to run `{}`", self.bin.display()))?;

        if output.status.success() {
            return Ok(());
        }

        anyhow::bail!(
            "exiftool failed for {}\nstdout: {}\nstderr: {}",
            path.display(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}
