use crate::migrate::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Factor applied to integer-encoded coordinates in the `geo` list.
pub const GEO_SCALE: f64 = 1_000_000.0;

/// Per-item descriptive record as found in the export. Coordinate fields are
/// kept loosely typed so a malformed value only drops the location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub date_taken: Option<String>,
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub geo: Option<Value>,
    #[serde(default)]
    pub license: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagRecord {
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Target-side attribute set for one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslatedMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
}

impl TranslatedMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.keywords.is_empty()
            && self.date_taken.is_none()
            && self.location.is_none()
            && self.rights.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateOptions {
    /// Append the item's album names to its keywords.
    pub albums_as_keywords: bool,
    /// Drop repeated keywords, keeping first occurrence order.
    pub dedupe_keywords: bool,
}

pub fn load_record(path: &Path) -> Result<MetadataRecord> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(ToOwned::to_owned)
}

fn coordinate(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn direct_point(record: &MetadataRecord) -> Option<GeoPoint> {
    Some(GeoPoint {
        latitude: coordinate(record.latitude.as_ref())?,
        longitude: coordinate(record.longitude.as_ref())?,
    })
}

fn scaled_point(geo: &Value) -> Option<GeoPoint> {
    let first = match geo {
        Value::Array(items) => items.first()?,
        Value::Object(_) => geo,
        _ => return None,
    };
    Some(GeoPoint {
        latitude: coordinate(first.get("latitude"))? / GEO_SCALE,
        longitude: coordinate(first.get("longitude"))? / GEO_SCALE,
    })
}

/// Location of a record in decimal degrees. Direct decimal fields win over
/// the scaled `geo` list. Points outside the valid range are dropped.
pub fn location(record: &MetadataRecord, item: &str) -> Option<GeoPoint> {
    let point = direct_point(record).or_else(|| record.geo.as_ref().and_then(scaled_point))?;
    if point.in_range() {
        return Some(point);
    }
    warn::emit(
        WarnEvent::new("GEO_OUT_OF_RANGE", "translate")
            .item(item)
            .reason(&format!("lat={} lon={}", point.latitude, point.longitude)),
    );
    None
}

fn keywords(record: &MetadataRecord, albums: &[String], opts: TranslateOptions) -> Vec<String> {
    let mut out: Vec<String> = record
        .tags
        .iter()
        .filter_map(|t| non_empty(t.tag.as_deref()))
        .collect();
    if opts.albums_as_keywords {
        out.extend(albums.iter().filter(|a| !a.is_empty()).cloned());
    }
    if opts.dedupe_keywords {
        let mut seen = std::collections::HashSet::new();
        out.retain(|kw| seen.insert(kw.clone()));
    }
    out
}

pub fn translate(
    record: &MetadataRecord,
    item: &str,
    albums: &[String],
    opts: TranslateOptions,
) -> TranslatedMetadata {
    TranslatedMetadata {
        title: non_empty(record.name.as_deref()),
        description: non_empty(record.description.as_deref()),
        keywords: keywords(record, albums, opts),
        date_taken: non_empty(record.date_taken.as_deref()),
        location: location(record, item),
        rights: non_empty(record.license.as_deref()),
    }
}
