//! Batch compilation of a blueprint directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::compiler::{CompileError, CompileOptions, CompiledPage, Compiler};
use crate::parser::ParseMode;
use crate::registry::{PackError, Registry, RegistryBuilder, TemplatePack};
use crate::scanner::{BlueprintScanner, ScanError};
use crate::versions::{BackupSink, NoBackup};
use crate::writer::{Limits, OutputWriter, WriteError, WriteReport};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source directory not specified")]
    MissingSourceDir,
    #[error("blueprint file not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("template pack: {0}")]
    Pack(#[from] PackError),
}

pub struct ProjectBuilder {
    source_dir: Option<PathBuf>,
    output_dir: PathBuf,
    templates: Option<PathBuf>,
    registry: Option<Registry>,
    options: CompileOptions,
    limits: Limits,
    backup: Arc<dyn BackupSink>,
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            source_dir: None,
            output_dir: PathBuf::from("./sandbox"),
            templates: None,
            registry: None,
            options: CompileOptions::default(),
            limits: Limits::default(),
            backup: Arc::new(NoBackup),
        }
    }

    // Required configuration
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    /// Template pack layered over the built-ins.
    pub fn templates<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.templates = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the built-in registry entirely.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn mode(mut self, mode: ParseMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn telemetry(mut self, endpoint: Option<String>) -> Self {
        self.options.telemetry = endpoint;
        self
    }

    pub fn body_script<S: Into<String>>(mut self, script: S) -> Self {
        self.options.body_scripts.push(script.into());
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn backup(mut self, sink: Arc<dyn BackupSink>) -> Self {
        self.backup = sink;
        self
    }

    pub fn build(self) -> Result<Project, BuildError> {
        let source_dir = self.source_dir.ok_or(BuildError::MissingSourceDir)?;

        let registry = match (self.registry, self.templates) {
            (Some(registry), _) => registry,
            (None, Some(dir)) => TemplatePack::load(dir)?
                .apply(RegistryBuilder::with_builtins())?
                .build(),
            (None, None) => Registry::builtin(),
        };

        let writer = OutputWriter::new(&self.output_dir)
            .limits(self.limits)
            .backup(self.backup);

        Ok(Project {
            source_dir,
            registry,
            options: self.options,
            writer,
        })
    }
}

/// Result of building one source file.
#[derive(Debug)]
pub struct UnitReport {
    pub source: PathBuf,
    pub page: CompiledPage,
    pub write: WriteReport,
}

#[derive(Debug)]
pub struct UnitOutcome {
    pub source: PathBuf,
    pub result: Result<UnitReport, BuildError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub units: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.units.iter().filter(|u| u.result.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

pub struct Project {
    source_dir: PathBuf,
    registry: Registry,
    options: CompileOptions,
    writer: OutputWriter,
}

impl Project {
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        self.writer.output_dir()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.registry).with_options(self.options.clone())
    }

    pub fn scanner(&self) -> BlueprintScanner {
        BlueprintScanner::new(&self.source_dir)
    }

    /// Compile and write one source file.
    pub fn build_path(&self, path: &Path) -> Result<UnitReport, BuildError> {
        if !path.is_file() {
            return Err(BuildError::SourceNotFound(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path).map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let page = self
            .compiler()
            .compile(&source)
            .map_err(|source| BuildError::Compile {
                path: path.to_path_buf(),
                source,
            })?;
        let write = self.writer.write_page(&page)?;

        info!(
            source = %path.display(),
            page = %page.page_name,
            written = write.written.len(),
            "Compiled blueprint"
        );

        Ok(UnitReport {
            source: path.to_path_buf(),
            page,
            write,
        })
    }

    /// Build a blueprint by name (`landing` or `landing.txt`).
    pub fn build_one(&self, name: &str) -> Result<UnitReport, BuildError> {
        self.build_path(&self.scanner().resolve(name))
    }

    /// Build every source in the source directory. A failing file does not
    /// stop the rest.
    pub fn build_all(&self) -> Result<BatchReport, BuildError> {
        let sources = self.scanner().scan()?;
        Ok(self.build_paths(sources))
    }

    pub fn build_paths<I: IntoIterator<Item = PathBuf>>(&self, sources: I) -> BatchReport {
        let mut report = BatchReport::default();
        for source in sources {
            let result = self.build_path(&source);
            if let Err(e) = &result {
                error!(source = %source.display(), "Build failed: {e}");
            }
            report.units.push(UnitOutcome { source, result });
        }
        report
    }
}
