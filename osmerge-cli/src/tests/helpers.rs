//! Scratch directories holding JSON Lines inputs for CLI tests.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use tempfile::TempDir;

#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write_records<T: Serialize>(&self, name: &str, records: &[T]) -> Utf8PathBuf {
        let mut payload = String::new();
        for record in records {
            payload.push_str(&serde_json::to_string(record).expect("serialise record"));
            payload.push('\n');
        }
        self.write_text(name, &payload)
    }

    pub(super) fn write_text(&self, name: &str, text: &str) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, text).expect("write input file");
        path
    }
}

pub(super) fn read_records<T: DeserializeOwned>(path: &Utf8Path) -> Vec<T> {
    let text = fs::read_to_string(path).expect("read output file");
    text.lines()
        .map(|line| serde_json::from_str(line).expect("decode output line"))
        .collect()
}
