pub mod browser_log;
pub mod build;
pub mod compiler;
pub mod config;
pub mod params;
pub mod parser;
pub mod registry;
pub mod scanner;
pub mod telemetry;
pub mod versions;
pub mod workspace;
pub mod writer;

// Re-export main types
pub use build::{BatchReport, BuildError, Project, ProjectBuilder, UnitOutcome, UnitReport};
pub use compiler::{CompileError, CompileOptions, CompiledPage, Compiler, Diagnostic};
pub use params::{ParamValue, Params};
pub use parser::{Directive, ParseMode, ParseWarning};
pub use registry::{Registry, RegistryBuilder, TemplatePack};
pub use versions::{BackupSink, NoBackup, Versioner};
pub use workspace::{Workspace, WorkspaceError};
pub use writer::{ArtifactKind, Limits, OutputWriter, WriteError};
