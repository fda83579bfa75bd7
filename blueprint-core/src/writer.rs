//! Persisting compiled pages.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::compiler::{is_valid_page_name, CompiledPage};
use crate::versions::{BackupSink, NoBackup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Html,
    Css,
    Js,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Html, ArtifactKind::Css, ArtifactKind::Js];

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Html => "html",
            ArtifactKind::Css => "css",
            ArtifactKind::Js => "js",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactKind::Html => "HTML",
            ArtifactKind::Css => "CSS",
            ArtifactKind::Js => "JS",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_file_bytes: usize,
    pub max_files: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_000_000,
            max_files: 40,
        }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("page name `{0}` would write outside the output directory")]
    InvalidPageName(String),
    #[error("{} is {size} bytes, over the {limit} byte limit", .path.display())]
    TooLarge {
        path: PathBuf,
        size: usize,
        limit: usize,
    },
    #[error("file limit of {limit} reached in {}: {current} files present", .dir.display())]
    QuotaExceeded {
        dir: PathBuf,
        current: usize,
        limit: usize,
    },
    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub page_name: String,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<ArtifactKind>,
    pub backed_up: Vec<PathBuf>,
}

/// Writes files into one output directory, enforcing [`Limits`] and telling a
/// [`BackupSink`] about every write first.
#[derive(Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    limits: Limits,
    backup: Arc<dyn BackupSink>,
}

impl fmt::Debug for OutputWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputWriter")
            .field("output_dir", &self.output_dir)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl OutputWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            limits: Limits::default(),
            backup: Arc::new(NoBackup),
        }
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn backup(mut self, sink: Arc<dyn BackupSink>) -> Self {
        self.backup = sink;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn current_limits(&self) -> Limits {
        self.limits
    }

    pub fn artifact_path(&self, page_name: &str, kind: ArtifactKind) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", page_name, kind.extension()))
    }

    /// Visible (non-dot) entries directly inside `dir`. A missing directory
    /// holds nothing.
    fn visible_files(dir: &Path) -> Result<usize, WriteError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(WriteError::Io {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        Ok(entries
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .count())
    }

    /// Size and file-count checks for a set of pending writes. Nothing is
    /// touched on disk.
    pub fn check_quota(&self, pending: &[(PathBuf, usize)]) -> Result<(), WriteError> {
        for (path, size) in pending {
            self.check_size(path, *size)?;
        }

        let mut dirs: Vec<&Path> = pending.iter().filter_map(|(p, _)| p.parent()).collect();
        dirs.sort();
        dirs.dedup();

        for dir in dirs {
            let new_files = pending
                .iter()
                .filter(|(p, _)| p.parent() == Some(dir) && !p.exists())
                .count();
            if new_files == 0 {
                continue;
            }
            let current = Self::visible_files(dir)?;
            if current + new_files > self.limits.max_files {
                return Err(WriteError::QuotaExceeded {
                    dir: dir.to_path_buf(),
                    current,
                    limit: self.limits.max_files,
                });
            }
        }

        Ok(())
    }

    pub fn check_size(&self, path: &Path, size: usize) -> Result<(), WriteError> {
        if size > self.limits.max_file_bytes {
            return Err(WriteError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.limits.max_file_bytes,
            });
        }
        Ok(())
    }

    /// Back up, then write. Quota must already have been checked. Backup
    /// failures only warn.
    pub(crate) fn persist(&self, path: &Path, content: &str) -> Result<bool, WriteError> {
        let backed_up = match self.backup.check_and_backup(path, content.as_bytes()) {
            Ok(made) => made,
            Err(e) => {
                warn!(path = %path.display(), "Backup failed: {e}");
                false
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| WriteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Wrote file");
        Ok(backed_up)
    }

    /// Write one file with the full quota and backup sequence.
    pub fn write_file(&self, path: &Path, content: &str) -> Result<bool, WriteError> {
        self.check_quota(&[(path.to_path_buf(), content.len())])?;
        self.persist(path, content)
    }

    /// Write `<page>.html|.css|.js`, skipping streams that are empty or only
    /// whitespace. All limits are checked before the first write.
    pub fn write_page(&self, page: &CompiledPage) -> Result<WriteReport, WriteError> {
        if !is_valid_page_name(&page.page_name) {
            return Err(WriteError::InvalidPageName(page.page_name.clone()));
        }

        let mut report = WriteReport {
            page_name: page.page_name.clone(),
            ..Default::default()
        };

        let mut pending = Vec::new();
        for kind in ArtifactKind::ALL {
            let content = page.stream(kind);
            if content.trim().is_empty() {
                warn!(page = %page.page_name, "Skipped {kind} (no content)");
                report.skipped.push(kind);
            } else {
                pending.push((self.artifact_path(&page.page_name, kind), content));
            }
        }

        let sizes: Vec<(PathBuf, usize)> = pending
            .iter()
            .map(|(path, content)| (path.clone(), content.len()))
            .collect();
        self.check_quota(&sizes)?;

        for (path, content) in pending {
            if self.persist(&path, content)? {
                report.backed_up.push(path.clone());
            }
            report.written.push(path);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn page(html: &str, css: &str, js: &str) -> CompiledPage {
        CompiledPage {
            page_name: "demo".into(),
            html: html.into(),
            css: css.into(),
            js: js.into(),
            diagnostics: Vec::new(),
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<PathBuf>>);

    impl BackupSink for Recorder {
        fn check_and_backup(
            &self,
            path: &Path,
            _content: &[u8],
        ) -> Result<bool, crate::versions::VersionError> {
            let mut seen = self.0.lock().unwrap();
            // the file must not exist yet on first sight
            assert!(!path.exists() || seen.contains(&path.to_path_buf()));
            seen.push(path.to_path_buf());
            Ok(true)
        }
    }

    #[test]
    fn test_skips_whitespace_streams() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());

        let report = writer.write_page(&page("<p>hi</p>", "  \n", "")).unwrap();
        assert_eq!(report.written, vec![dir.path().join("demo.html")]);
        assert_eq!(report.skipped, vec![ArtifactKind::Css, ArtifactKind::Js]);
        assert!(!dir.path().join("demo.css").exists());
    }

    #[test]
    fn test_backup_before_write() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let writer = OutputWriter::new(dir.path()).backup(recorder.clone());

        let report = writer.write_page(&page("<p>x</p>", "p{}", "//x")).unwrap();
        assert_eq!(report.backed_up.len(), 3);
        assert_eq!(recorder.0.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_page_names_outside_output_dir() {
        let base = TempDir::new().unwrap();
        let out = base.path().join("out");
        let writer = OutputWriter::new(&out);

        let mut escaping = page("<p>x</p>", "", "");
        escaping.page_name = "../escaped".into();
        assert!(matches!(
            writer.write_page(&escaping),
            Err(WriteError::InvalidPageName(name)) if name == "../escaped"
        ));
        assert!(!base.path().join("escaped.html").exists());
    }

    #[test]
    fn test_oversized_output_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path()).limits(Limits {
            max_file_bytes: 8,
            max_files: 40,
        });

        let err = writer.write_page(&page("<p>o</p>", "p { color: red; }", "")).unwrap_err();
        assert!(matches!(err, WriteError::TooLarge { size: 17, .. }));
        assert!(!dir.path().join("demo.html").exists());
    }

    #[test]
    fn test_file_quota_counts_only_new_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("other.html"), "x").unwrap();
        std::fs::write(dir.path().join(".hidden"), "x").unwrap();
        let writer = OutputWriter::new(dir.path()).limits(Limits {
            max_file_bytes: 1000,
            max_files: 2,
        });

        let err = writer.write_page(&page("<p>a</p>", "p{}", "")).unwrap_err();
        assert!(matches!(err, WriteError::QuotaExceeded { current: 1, limit: 2, .. }));

        // overwriting an existing file needs no new slot
        assert!(writer.write_file(&dir.path().join("other.html"), "y").is_ok());
        assert!(writer.write_file(&dir.path().join("second.html"), "z").is_ok());
        assert!(writer.write_file(&dir.path().join("third.html"), "z").is_err());
    }
}
