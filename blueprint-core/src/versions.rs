//! Content-hash versioning.
//!
//! Every time a tracked file is written with content the project has never
//! seen, a copy lands in
//!
//! ```text
//! versions/2025-01-31/3-07-09-PM-app.html/sandbox/app.html
//! ```
//!
//! and `<path> <sha256>` is appended to the ledger (`hashes.txt`). A hash is
//! recorded once for the whole project, whatever path it was first seen at.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::browser_log::ERROR_LOG_FILE;

pub const DEFAULT_VERSIONS_DIR: &str = "versions";
pub const DEFAULT_LEDGER: &str = "hashes.txt";

/// Paths containing any of these are never versioned.
pub const IGNORED_PATTERNS: [&str; 9] = [
    "node_modules/",
    ".git/",
    ".claude/",
    "target/",
    "tools/",
    "package.json",
    "package-lock.json",
    "Cargo.lock",
    ERROR_LOG_FILE,
];

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("{} is outside the versioned root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
    #[error("refusing to version {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("ledger {}: {source}", .path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("backup {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Collaborator told about every file right before it is written.
pub trait BackupSink: Send + Sync {
    /// Returns whether a backup was made.
    fn check_and_backup(&self, path: &Path, content: &[u8]) -> Result<bool, VersionError>;
}

/// Sink that never backs anything up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackup;

impl BackupSink for NoBackup {
    fn check_and_backup(&self, _path: &Path, _content: &[u8]) -> Result<bool, VersionError> {
        Ok(false)
    }
}

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[derive(Debug)]
pub struct Versioner {
    root: PathBuf,
    versions_dir: PathBuf,
    ledger: PathBuf,
    ignored: Vec<String>,
    lock: Mutex<()>,
}

impl Versioner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut versioner = Self {
            versions_dir: root.join(DEFAULT_VERSIONS_DIR),
            ledger: root.join(DEFAULT_LEDGER),
            root,
            ignored: Vec::new(),
            lock: Mutex::new(()),
        };
        versioner.refresh_ignored();
        versioner
    }

    /// Backup directory, relative to the root.
    pub fn versions_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.versions_dir = self.root.join(dir);
        self.refresh_ignored();
        self
    }

    /// Ledger file, relative to the root.
    pub fn ledger<P: AsRef<Path>>(mut self, file: P) -> Self {
        self.ledger = self.root.join(file);
        self.refresh_ignored();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger
    }

    fn refresh_ignored(&mut self) {
        let mut ignored: Vec<String> = IGNORED_PATTERNS.iter().map(|p| p.to_string()).collect();
        if let Some(dir) = self.relative(&self.versions_dir) {
            ignored.push(format!("{dir}/"));
        }
        if let Some(ledger) = self.relative(&self.ledger) {
            ignored.push(ledger);
        }
        self.ignored = ignored;
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.ignored.iter().any(|p| rel_path.contains(p.as_str()))
    }

    /// `path` relative to the root, with `/` separators. Absolute paths must
    /// live under the root.
    fn normalize(&self, path: &Path) -> Result<PathBuf, VersionError> {
        let rel = if path.is_absolute() || path.starts_with(&self.root) {
            path.strip_prefix(&self.root)
                .map_err(|_| VersionError::OutsideRoot {
                    path: path.to_path_buf(),
                    root: self.root.clone(),
                })?
                .to_path_buf()
        } else {
            path.to_path_buf()
        };

        let mut clean = PathBuf::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                _ => return Err(VersionError::InvalidPath(path.to_path_buf())),
            }
        }
        if clean.as_os_str().is_empty() {
            return Err(VersionError::InvalidPath(path.to_path_buf()));
        }
        Ok(clean)
    }

    /// [`BackupSink::check_and_backup`] with an explicit clock.
    pub fn check_and_backup_at(
        &self,
        path: &Path,
        content: &[u8],
        now: NaiveDateTime,
    ) -> Result<bool, VersionError> {
        let rel = self.normalize(path)?;
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if self.is_ignored(&rel_str) {
            debug!(path = %rel_str, "Ignored by versioning");
            return Ok(false);
        }

        let hash = sha256_hex(content);

        // the ledger check and append happen under one lock
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.ledger_contains(&hash)? {
            return Ok(false);
        }
        self.append_ledger(&rel_str, &hash)?;

        let backup = self.backup_path(&rel, now);
        if let Some(parent) = backup.parent() {
            std::fs::create_dir_all(parent).map_err(|source| VersionError::Backup {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&backup, content).map_err(|source| VersionError::Backup {
            path: backup.clone(),
            source,
        })?;

        info!(path = %rel_str, backup = %backup.display(), "Backed up new version");
        Ok(true)
    }

    fn ledger_contains(&self, hash: &str) -> Result<bool, VersionError> {
        let data = match std::fs::read_to_string(&self.ledger) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(VersionError::Ledger {
                    path: self.ledger.clone(),
                    source,
                });
            }
        };

        Ok(data
            .lines()
            .filter_map(|line| line.rsplit_once(' '))
            .any(|(_, recorded)| recorded.trim() == hash))
    }

    fn append_ledger(&self, rel_path: &str, hash: &str) -> Result<(), VersionError> {
        let ledger_err = |source| VersionError::Ledger {
            path: self.ledger.clone(),
            source,
        };
        if let Some(parent) = self.ledger.parent() {
            std::fs::create_dir_all(parent).map_err(ledger_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger)
            .map_err(ledger_err)?;
        writeln!(file, "{rel_path} {hash}").map_err(ledger_err)
    }

    /// `versions/<date>/<H-MM-SS-AM>-<basename>/<rel_path>`
    pub fn backup_path(&self, rel_path: &Path, now: NaiveDateTime) -> PathBuf {
        let basename = rel_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = format!("{}-{}", now.format("%-I-%M-%S-%p"), basename);

        self.versions_dir
            .join(now.format("%Y-%m-%d").to_string())
            .join(folder)
            .join(rel_path)
    }
}

impl BackupSink for Versioner {
    fn check_and_backup(&self, path: &Path, content: &[u8]) -> Result<bool, VersionError> {
        self.check_and_backup_at(path, content, Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_backup_path_uses_twelve_hour_clock() {
        let v = Versioner::new("/project");
        let path = v.backup_path(Path::new("sandbox/app.html"), at(15, 7, 9));
        assert_eq!(
            path,
            PathBuf::from("/project/versions/2025-01-31/3-07-09-PM-app.html/sandbox/app.html")
        );

        let midnight = v.backup_path(Path::new("blueprint.txt"), at(0, 0, 5));
        assert!(midnight.ends_with("2025-01-31/12-00-05-AM-blueprint.txt/blueprint.txt"));
    }

    #[test]
    fn test_new_content_is_backed_up_once() {
        let dir = TempDir::new().unwrap();
        let v = Versioner::new(dir.path());

        assert!(v.check_and_backup_at(Path::new("sandbox/app.html"), b"<p>1</p>", at(9, 0, 0)).unwrap());
        assert!(!v.check_and_backup_at(Path::new("sandbox/app.html"), b"<p>1</p>", at(9, 0, 1)).unwrap());
        // same content under another path is still a known hash
        assert!(!v.check_and_backup_at(Path::new("sandbox/copy.html"), b"<p>1</p>", at(9, 0, 2)).unwrap());
        assert!(v.check_and_backup_at(Path::new("sandbox/app.html"), b"<p>2</p>", at(9, 0, 3)).unwrap());

        let ledger = std::fs::read_to_string(dir.path().join("hashes.txt")).unwrap();
        assert_eq!(ledger.lines().count(), 2);
        assert!(ledger.starts_with(&format!("sandbox/app.html {}", sha256_hex(b"<p>1</p>"))));

        let backup = dir
            .path()
            .join("versions/2025-01-31/9-00-00-AM-app.html/sandbox/app.html");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "<p>1</p>");
    }

    #[test]
    fn test_absolute_paths_under_root() {
        let dir = TempDir::new().unwrap();
        let v = Versioner::new(dir.path());
        let file = dir.path().join("blueprint.txt");

        assert!(v.check_and_backup_at(&file, b"page:x", at(10, 0, 0)).unwrap());
        assert!(matches!(
            v.check_and_backup_at(Path::new("/elsewhere/a.txt"), b"x", at(10, 0, 0)),
            Err(VersionError::OutsideRoot { .. })
        ));
        assert!(matches!(
            v.check_and_backup_at(Path::new("../a.txt"), b"x", at(10, 0, 0)),
            Err(VersionError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_ignored_paths() {
        let dir = TempDir::new().unwrap();
        let v = Versioner::new(dir.path()).versions_dir("history").ledger("ledger.txt");

        for path in ["history/x.html", "ledger.txt", "node_modules/a.js", ".git/HEAD", ".claude/settings.json", "sandbox/browser-errors.jsonl"] {
            assert!(!v.check_and_backup_at(Path::new(path), path.as_bytes(), at(1, 0, 0)).unwrap());
        }
        assert!(!dir.path().join("ledger.txt").exists());
    }

    #[test]
    fn test_shared_versioner_backs_up_concurrent_writes_once() {
        use std::sync::{Arc, Barrier};

        let dir = TempDir::new().unwrap();
        let versioner = Arc::new(Versioner::new(dir.path()));

        for round in 0..20 {
            let callers = 4;
            let barrier = Arc::new(Barrier::new(callers));
            let content = format!("<p>round {round}</p>");
            let handles: Vec<_> = (0..callers)
                .map(|_| {
                    let versioner = Arc::clone(&versioner);
                    let barrier = Arc::clone(&barrier);
                    let content = content.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        versioner
                            .check_and_backup_at(Path::new("sandbox/app.html"), content.as_bytes(), at(9, 0, 0))
                            .unwrap()
                    })
                })
                .collect();

            let made: usize = handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum();
            assert_eq!(made, 1, "round {round}");
        }

        let ledger = std::fs::read_to_string(versioner.ledger_path()).unwrap();
        assert_eq!(ledger.lines().count(), 20);
    }

    #[test]
    fn test_no_backup() {
        assert!(!NoBackup.check_and_backup(Path::new("a"), b"a").unwrap());
    }
}
