use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

pub const SOURCE_EXTENSION: &str = "txt";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("source directory {} not found", .0.display())]
    MissingDir(PathBuf),
    #[error("could not read source directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Finds blueprint sources (`*.txt`) directly inside one directory.
pub struct BlueprintScanner {
    source_dir: PathBuf,
}

impl BlueprintScanner {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source_dir: path.as_ref().to_path_buf(),
        }
    }

    /// Source files sorted by name.
    pub fn scan(&self) -> Result<Vec<PathBuf>, ScanError> {
        if !self.source_dir.is_dir() {
            return Err(ScanError::MissingDir(self.source_dir.clone()));
        }
        debug!(dir = %self.source_dir.display(), "Scanning for blueprints");

        let mut sources = Vec::new();
        for entry in WalkDir::new(&self.source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.path().is_file() && is_source(entry.path()) {
                sources.push(entry.into_path());
            }
        }

        Ok(sources)
    }

    /// Path for a blueprint given as `name` or `name.txt`.
    pub fn resolve(&self, name: &str) -> PathBuf {
        if name.ends_with(".txt") {
            self.source_dir.join(name)
        } else {
            self.source_dir.join(format!("{name}.{SOURCE_EXTENSION}"))
        }
    }
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == SOURCE_EXTENSION)
        .unwrap_or(false)
}
