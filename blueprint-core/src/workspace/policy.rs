use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Base-directory files that may be written outside the sandbox.
pub const ALLOWED_BASE_FILES: [&str; 1] = ["blueprint.txt"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid path `{0}`: parent directory references are not allowed")]
    Traversal(String),
    #[error("invalid path `{0}`: absolute paths are not allowed")]
    Absolute(String),
    #[error("empty path")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Base,
    Sandbox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub location: Location,
}

/// Decides where a requested file name may be read from or written to.
pub trait PathPolicy: Send + Sync {
    /// Any file inside the project, for reading and listing.
    fn resolve_read(&self, requested: &str) -> Result<PathBuf, PolicyError>;

    /// Write target for `requested`.
    fn resolve_write(&self, requested: &str) -> Result<ResolvedPath, PolicyError>;

    /// Base files only the dedicated blueprint write may replace wholesale.
    fn is_base_file(&self, requested: &str) -> bool;
}

/// Writes go to the sandbox unless the name is an allow-listed base file.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    base: PathBuf,
    sandbox: PathBuf,
    base_files: Vec<String>,
}

impl SandboxPolicy {
    pub fn new<B: AsRef<Path>, S: AsRef<Path>>(base: B, sandbox: S) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            sandbox: sandbox.as_ref().to_path_buf(),
            base_files: ALLOWED_BASE_FILES.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn base_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_files = files.into_iter().map(Into::into).collect();
        self
    }

    fn sandbox_prefix(&self) -> Option<String> {
        let name = self.sandbox.file_name()?.to_string_lossy();
        Some(format!("{name}/"))
    }

    /// Strip a leading `sandbox/` so both spellings name the same file.
    fn normalize<'a>(&self, requested: &'a str) -> &'a str {
        match self.sandbox_prefix() {
            Some(prefix) => requested.strip_prefix(prefix.as_str()).unwrap_or(requested),
            None => requested,
        }
    }
}

/// Reject anything that could leave the directory it is joined to.
pub fn check_relative(requested: &str) -> Result<&Path, PolicyError> {
    if requested.trim().is_empty() {
        return Err(PolicyError::Empty);
    }
    let path = Path::new(requested);
    if path.is_absolute() || requested.starts_with('/') || requested.starts_with('\\') {
        return Err(PolicyError::Absolute(requested.to_string()));
    }
    if requested.contains("..")
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(PolicyError::Traversal(requested.to_string()));
    }
    Ok(path)
}

impl PathPolicy for SandboxPolicy {
    fn resolve_read(&self, requested: &str) -> Result<PathBuf, PolicyError> {
        Ok(self.base.join(check_relative(requested)?))
    }

    fn resolve_write(&self, requested: &str) -> Result<ResolvedPath, PolicyError> {
        let name = self.normalize(requested);
        let path = check_relative(name)?;
        if self.is_base_file(name) {
            return Ok(ResolvedPath {
                path: self.base.join(path),
                location: Location::Base,
            });
        }
        Ok(ResolvedPath {
            path: self.sandbox.join(path),
            location: Location::Sandbox,
        })
    }

    fn is_base_file(&self, requested: &str) -> bool {
        self.base_files.iter().any(|f| f == requested)
    }
}
