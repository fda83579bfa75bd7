use anyhow::Result;
use blueprint_core::{BackupSink, Versioner};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const BACKUP_DEBOUNCE: Duration = Duration::from_secs(2);

/// Backs up every file that changes under the watched directories, including
/// edits made outside this process. Stops when dropped.
pub struct BackupWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

impl BackupWatcher {
    pub fn start(versioner: Arc<Versioner>, dirs: &[PathBuf]) -> Result<Self> {
        let sink = versioner.clone();
        let mut debouncer = new_debouncer(BACKUP_DEBOUNCE, move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    for event in events {
                        backup_changed(sink.as_ref(), &event.path);
                    }
                }
                Err(e) => warn!("Backup watcher error: {e}"),
            }
        })?;

        for dir in dirs {
            debouncer
                .watcher()
                .watch(dir, notify::RecursiveMode::Recursive)?;
            info!(dir = %dir.display(), "Backing up changes");
        }

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

fn backup_changed(sink: &dyn BackupSink, path: &Path) {
    if !path.is_file() {
        return;
    }
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), "Skipping unreadable file: {e}");
            return;
        }
    };
    match sink.check_and_backup(path, &content) {
        Ok(true) => info!(path = %path.display(), "Saved new version"),
        Ok(false) => {}
        Err(e) => warn!(path = %path.display(), "Backup failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_changed_skips_duplicates() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("page.html");
        std::fs::write(&file, "<p>v1</p>").unwrap();
        let versioner = Versioner::new(dir.path());

        backup_changed(&versioner, &file);
        backup_changed(&versioner, &file);

        let ledger = std::fs::read_to_string(versioner.ledger_path()).unwrap();
        assert_eq!(ledger.lines().count(), 1);
    }

    #[test]
    fn test_backup_changed_ignores_directories() {
        let dir = TempDir::new().unwrap();
        let versioner = Versioner::new(dir.path());
        backup_changed(&versioner, dir.path());
        assert!(!versioner.ledger_path().exists());
    }
}
