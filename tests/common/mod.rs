//! Shared helpers for the integration suite: a scratch source tree plus
//! archive read-back utilities.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A scratch project tree with an isolated cache directory.
pub struct TestRepo {
    _root: TempDir,
    pub src: PathBuf,
    pub out: PathBuf,
    pub cache: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let src = root.path().join("proj");
        let out = root.path().join("out");
        let cache = root.path().join("cache");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&out).unwrap();
        Self {
            _root: root,
            src,
            out,
            cache,
        }
    }

    /// Write a file under the source tree, creating parent directories.
    pub fn write(&self, rel: &str, body: &str) {
        let path = self.src.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, body).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.src.join(rel)).unwrap();
    }

    /// A sourcepack command preconfigured with the source dir and the
    /// isolated cache.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sourcepack").expect("binary builds");
        cmd.arg(&self.src).arg("--tmp-dir").arg(&self.cache);
        cmd
    }
}

/// Entry names of an archive, in stored order.
pub fn entry_names(zip_path: &Path) -> Vec<String> {
    let file = fs::File::open(zip_path).expect("open archive");
    let mut archive = zip::ZipArchive::new(file).expect("read archive");
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Read one archive entry as text.
pub fn read_entry(zip_path: &Path, name: &str) -> String {
    let file = fs::File::open(zip_path).expect("open archive");
    let mut archive = zip::ZipArchive::new(file).expect("read archive");
    let mut entry = archive.by_name(name).expect("entry exists");
    let mut body = String::new();
    entry.read_to_string(&mut body).expect("utf-8 entry");
    body
}
