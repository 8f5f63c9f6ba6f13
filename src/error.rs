use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("import of action #{index} returned {count} items; expected exactly one")]
    ImportCountMismatch { index: usize, count: usize },
    #[error("resume offset {offset} is past the end of a plan with {len} actions")]
    ResumeOffsetOutOfRange { offset: usize, len: usize },
    #[error("expected library `{expected}` but `{found}` is open")]
    LibraryMismatch { expected: String, found: String },
    #[error("another import run holds the resume log lock: {0}")]
    LogLocked(String),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
}
