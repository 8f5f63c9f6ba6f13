use std::env;
use std::path::PathBuf;

const DEFAULT_STAGING_DIR: &str = "flickr_staged";
const DEFAULT_RESUME_LOG: &str = "import_resume.txt";

#[derive(Debug, Clone)]
pub struct MigratePaths {
    pub staging_dir: PathBuf,
    pub resume_log: PathBuf,
    /// Explicit exiftool binary; PATH lookup applies when unset.
    pub exiftool_bin: Option<PathBuf>,
    pub bridge_bin: Option<PathBuf>,
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    env_path(var).unwrap_or(fallback)
}

/// Working paths relative to the current directory unless overridden.
pub fn resolve_paths() -> MigratePaths {
    MigratePaths {
        staging_dir: env_or_default_path(
            "PHOTO_MIGRATE_STAGING_DIR",
            PathBuf::from(DEFAULT_STAGING_DIR),
        ),
        resume_log: env_or_default_path(
            "PHOTO_MIGRATE_RESUME_LOG",
            PathBuf::from(DEFAULT_RESUME_LOG),
        ),
        exiftool_bin: env_path("EXIFTOOL_BIN"),
        bridge_bin: env_path("PHOTO_LIBRARY_BRIDGE_BIN"),
    }
}
