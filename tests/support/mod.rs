#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FAKE_BRIDGE: &str = r#"#!/usr/bin/env bash
echo "$*" >> "$BRIDGE_CALLS"
case "$1" in
  identity) echo '{"name":"FlickrArchive.photoslibrary","version":"9.0"}' ;;
  import)
    shift
    [[ "$1" == "--skip-duplicate-check" ]] && shift
    base="$(basename "$1")"
    case "$base" in
      *dup*) echo '[]' ;;
      *boom*) echo 'import exploded' >&2; exit 1 ;;
      *) echo "[\"item-${base%%.*}\"]" ;;
    esac
    ;;
  album-find) echo '{"album":null}' ;;
  album-create) echo "{\"album\":\"alb-$2\"}" ;;
  *) ;;
esac
"#;

pub const FAKE_EXIFTOOL: &str = r#"#!/usr/bin/env bash
echo "$*" >> "$EXIFTOOL_CALLS"
"#;

pub struct Workspace {
    pub tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("export")).expect("mkdir export");
        Self { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn export(&self) -> PathBuf {
        self.root().join("export")
    }

    pub fn staged(&self) -> PathBuf {
        self.root().join("staged")
    }

    pub fn plan(&self) -> PathBuf {
        self.root().join("plan.json")
    }

    pub fn log(&self) -> PathBuf {
        self.root().join("import_resume.txt")
    }

    pub fn calls(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    pub fn media(&self, name: &str) {
        fs::write(self.export().join(name), b"fake image bytes").expect("write media");
    }

    pub fn export_file(&self, name: &str, body: &str) {
        fs::write(self.export().join(name), body).expect("write export file");
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, body).expect("write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path).expect("metadata").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).expect("chmod");
        }
        path
    }

    /// Command with HOME, config and working directory pinned to the temp dir.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("photo-migrate");
        cmd.current_dir(self.root())
            .env("HOME", self.root())
            .env("PHOTO_MIGRATE_CONFIG_PATH", self.root().join("no-config.toml"))
            .env_remove("PHOTO_LIBRARY_BRIDGE_BIN")
            .env_remove("EXIFTOOL_BIN")
            .env_remove("RUST_LOG")
            .env("BRIDGE_CALLS", self.calls("bridge_calls.txt"))
            .env("EXIFTOOL_CALLS", self.calls("exiftool_calls.txt"));
        cmd
    }

    pub fn prep_without_embedding(&self) {
        self.cmd()
            .arg("prep")
            .arg(self.export())
            .arg(self.plan())
            .arg(self.staged())
            .arg("--no-embed")
            .assert()
            .success();
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.read(&self.log()).lines().map(ToOwned::to_owned).collect()
    }
}
