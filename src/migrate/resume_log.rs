//! Append-only resume log: one tab-separated line per attempted action,
//! `{index}\t{filename}\t{OUTCOME}` plus an optional error detail field.
//!
//! The log is an audit trail. Execution never reads it back; the resume
//! offset passed by the operator is the only resumption input, so the two can
//! drift if an operator resumes from the wrong index.

use crate::error::MigrateError;
use crate::migrate::util::{single_line, truncate_with_ellipsis};
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const MAX_DETAIL_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Imported,
    Skipped,
    Error,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imported => "IMPORTED",
            Self::Skipped => "SKIPPED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IMPORTED" => Ok(Self::Imported),
            "SKIPPED" => Ok(Self::Skipped),
            "ERROR" => Ok(Self::Error),
            other => anyhow::bail!("unknown resume log outcome `{other}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub index: usize,
    pub filename: String,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl LogEntry {
    pub fn new(index: usize, filename: &str, outcome: Outcome) -> Self {
        Self {
            index,
            filename: filename.to_string(),
            outcome,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn render(&self) -> String {
        let mut line = format!(
            "{}\t{}\t{}",
            self.index,
            tab_safe(&self.filename),
            self.outcome
        );
        if let Some(detail) = &self.detail {
            line.push('\t');
            line.push_str(&truncate_with_ellipsis(
                &single_line(detail),
                MAX_DETAIL_CHARS,
            ));
        }
        line
    }

    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(4, '\t');
        let index = fields.next()?.trim().parse::<usize>().ok()?;
        let filename = fields.next()?.to_string();
        let outcome = fields.next()?.trim().parse::<Outcome>().ok()?;
        let detail = fields.next().map(ToOwned::to_owned);
        Some(Self {
            index,
            filename,
            outcome,
            detail,
        })
    }
}

/// Replace the characters that would break the line framing; everything
/// else in a filename is written as is.
fn tab_safe(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

/// Open handle on the resume log, holding an exclusive run lock for as long
/// as it lives.
#[derive(Debug)]
pub struct ResumeLog {
    path: PathBuf,
    file: File,
    _lock: File,
}

pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

impl ResumeLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let lock_file = lock_path(path);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_file)
            .with_context(|| format!("failed to open {}", lock_file.display()))?;
        if lock.try_lock_exclusive().is_err() {
            return Err(MigrateError::LogLocked(lock_file.display().to_string()).into());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let line = format!("{}\n", entry.render());
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.sync_data())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }
}

pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut out = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match LogEntry::parse(line) {
            Some(entry) => out.push(entry),
            None => debug!(line = lineno + 1, "ignoring malformed resume log line"),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub lines: usize,
    pub imported: usize,
    pub skipped: usize,
    pub errored: usize,
    pub highest_index: Option<usize>,
}

impl LogSummary {
    /// Offset just past the highest logged index.
    pub fn suggested_resume(&self) -> usize {
        self.highest_index.map_or(0, |i| i + 1)
    }
}

pub fn summarize(entries: &[LogEntry]) -> LogSummary {
    let mut out = LogSummary::default();
    for entry in entries {
        out.lines += 1;
        match entry.outcome {
            Outcome::Imported => out.imported += 1,
            Outcome::Skipped => out.skipped += 1,
            Outcome::Error => out.errored += 1,
        }
        out.highest_index = Some(out.highest_index.map_or(entry.index, |i| i.max(entry.index)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_three_or_four_fields() {
        assert_eq!(
            LogEntry::new(0, "a_1_o.jpg", Outcome::Skipped).render(),
            "0\ta_1_o.jpg\tSKIPPED"
        );
        assert_eq!(
            LogEntry::new(7, "b.jpg", Outcome::Error)
                .with_detail("bridge died\nexit 3")
                .render(),
            "7\tb.jpg\tERROR\tbridge died exit 3"
        );
    }

    #[test]
    fn parse_reads_back_rendered_lines() {
        let entry = LogEntry::new(12, "c.jpg", Outcome::Error).with_detail("staged file missing");
        assert_eq!(LogEntry::parse(&entry.render()), Some(entry));
        assert_eq!(LogEntry::parse("x\tc.jpg\tIMPORTED"), None);
        assert_eq!(LogEntry::parse("1\tc.jpg\tDONE"), None);
    }

    #[test]
    fn filenames_keep_their_spacing() {
        let entry = LogEntry::new(3, "my  photo_1_o.jpg", Outcome::Imported);
        assert_eq!(entry.render(), "3\tmy  photo_1_o.jpg\tIMPORTED");
        assert_eq!(LogEntry::parse(&entry.render()), Some(entry));

        let odd = LogEntry::new(4, "tab\there_2_o.jpg", Outcome::Skipped);
        assert_eq!(odd.render(), "4\ttab here_2_o.jpg\tSKIPPED");
    }

    #[test]
    fn append_never_rewrites_existing_lines() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("import_resume.txt");
        fs::write(&path, "0\told.jpg\tIMPORTED\n").expect("seed");

        let mut log = ResumeLog::open(&path).expect("open");
        log.append(&LogEntry::new(1, "new.jpg", Outcome::Skipped))
            .expect("append");
        drop(log);

        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw, "0\told.jpg\tIMPORTED\n1\tnew.jpg\tSKIPPED\n");
    }

    #[test]
    fn second_open_is_refused_while_locked() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("log.txt");
        let _held = ResumeLog::open(&path).expect("first open");
        let err = ResumeLog::open(&path).expect_err("second open");
        assert!(err.downcast_ref::<MigrateError>().is_some());
    }

    #[test]
    fn summary_counts_outcomes_and_suggests_next_offset() {
        let entries = vec![
            LogEntry::new(0, "a", Outcome::Imported),
            LogEntry::new(1, "b", Outcome::Skipped),
            LogEntry::new(2, "c", Outcome::Error).with_detail("x"),
            LogEntry::new(0, "a", Outcome::Skipped),
        ];
        let summary = summarize(&entries);
        assert_eq!(summary.lines, 4);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.suggested_resume(), 3);
        assert_eq!(summarize(&[]).suggested_resume(), 0);
    }
}
