/// Separator between the prefix, identifier and suffix of an export filename.
pub const ID_SEPARATOR: char = '_';

/// Legacy export filenames whose second-to-last group collides with an
/// unrelated item. They never take part in file-scan identifier extraction.
pub const DENYLISTED_FILENAMES: &[&str] = &["r-035_1451016205_o.jpg"];

pub fn is_denylisted(filename: &str) -> bool {
    DENYLISTED_FILENAMES.contains(&filename)
}

/// Identifiers that the denylisted filenames would have produced. Catalog
/// entries carrying one of these ids are expected to lack media.
pub fn denylisted_ids() -> Vec<String> {
    DENYLISTED_FILENAMES
        .iter()
        .filter_map(|name| id_from_filename(name))
        .collect()
}

/// Derive the item identifier from `<prefix>_<id>_<suffix>.<ext>`.
///
/// The name is split from the right into at most three groups and the
/// second-to-last group is returned. A name without any separator, or whose
/// candidate group is empty, yields `None`.
pub fn id_from_filename(filename: &str) -> Option<String> {
    let mut groups = filename.rsplitn(3, ID_SEPARATOR);
    groups.next()?;
    let id = groups.next()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}
