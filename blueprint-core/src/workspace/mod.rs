//! File operations over a project directory, for an external agent.
//!
//! ```text
//! <base>/
//!   blueprint.txt      allow-listed base file
//!   blueprints/*.txt   sources
//!   sandbox/           every other write lands here
//! ```
//!
//! Each operation returns the text shown to the agent. Writes run the same
//! sequence as compiled output: limits first, then the backup sink, then
//! the write.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::browser_log::{self, ErrorFilter, ERROR_LOG_FILE};
use crate::build::{BuildError, Project, UnitOutcome};
use crate::params::Params;
use crate::parser::base_key;
use crate::registry::builtin::UNIVERSAL_PARAMS;
use crate::registry::{Namespace, TemplateRef};
use crate::scanner::ScanError;
use crate::writer::WriteError;

pub mod policy;
pub mod search;
pub mod tools;

pub use policy::{Location, PathPolicy, PolicyError, ResolvedPath, SandboxPolicy};
pub use search::{SearchMatch, SearchOptions};

pub const BLUEPRINT_FILE: &str = "blueprint.txt";
const GENERATED_PREVIEW_CHARS: usize = 800;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("cannot overwrite {0}; write it with the blueprint mode instead")]
    Protected(String),
    #[error("could not find the given text in {0}")]
    SegmentNotFound(String),
    #[error("{0} is required")]
    MissingArgument(&'static str),
    #[error("generation failed:\n{0}")]
    GenerateFailed(String),
    #[error("unknown {kind} `{value}`")]
    Unknown { kind: &'static str, value: String },
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WorkspaceError + '_ {
    move |source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sorted entry names, directories suffixed with `/`.
fn dir_entries(dir: &Path) -> Result<Vec<String>, WorkspaceError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let mut name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

pub struct Workspace {
    base: PathBuf,
    project: Project,
    policy: Box<dyn PathPolicy>,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(base: P, project: Project) -> Self {
        let base = base.as_ref().to_path_buf();
        let policy = SandboxPolicy::new(&base, project.output_dir());
        Self {
            base,
            project,
            policy: Box::new(policy),
        }
    }

    pub fn with_policy<P: PathPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    // Reading

    pub fn read_file(&self, name: &str) -> Result<String, WorkspaceError> {
        let path = self.policy.resolve_read(name)?;
        let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;

        let listing = match path.parent() {
            Some(dir) => dir_entries(dir)?,
            None => Vec::new(),
        };
        Ok(format!(
            "{content}\nFiles in directory: {} ({} total)",
            listing.join(", "),
            listing.len()
        ))
    }

    /// Reference for every registered template, plus the directive syntax.
    pub fn read_index(&self) -> String {
        let registry = self.project.registry();
        let mut out = String::from(INDEX_HEADER);

        for (title, namespace) in [
            ("Blueprints", Namespace::Blueprints),
            ("Components", Namespace::Components),
            ("Flows", Namespace::Flows),
        ] {
            out.push_str(&format!("\n{title}:\n"));
            for key in registry.keys(namespace) {
                let Some(template) = registry.get(namespace, &key) else {
                    continue;
                };
                out.push_str(&format!("  {key}\n"));
                if !template.summary().is_empty() {
                    out.push_str(&format!("      {}\n", template.summary()));
                }
                if !template.params().is_empty() {
                    out.push_str(&format!("      params: {}\n", template.params().join(", ")));
                }
            }
        }

        out.push_str(&format!(
            "\nUniversal parameters: {}\n",
            UNIVERSAL_PARAMS.join(", ")
        ));
        out
    }

    /// Start of the first generated HTML page in the sandbox.
    pub fn read_generated(&self) -> Result<String, WorkspaceError> {
        let sandbox = self.project.output_dir();
        let html_file = dir_entries(sandbox)?
            .into_iter()
            .find(|name| name.ends_with(".html"))
            .unwrap_or_else(|| "app.html".to_string());

        let path = sandbox.join(&html_file);
        let html = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        let preview: String = html.chars().take(GENERATED_PREVIEW_CHARS).collect();

        Ok(format!(
            "Generated {html_file} (first {GENERATED_PREVIEW_CHARS} chars):\n{preview}..."
        ))
    }

    /// Browser errors the collector logged for pages in the sandbox, as a
    /// JSON summary. `clear_old` prunes the log first.
    pub fn read_errors(&self, filter: &ErrorFilter, clear_old: bool) -> Result<String, WorkspaceError> {
        let log = self.project.output_dir().join(ERROR_LOG_FILE);
        if clear_old {
            browser_log::prune_file(&log, Utc::now()).map_err(io_error(&log))?;
        }

        let content = match std::fs::read_to_string(&log) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok("No errors logged yet.".to_string());
            }
            Err(e) => return Err(io_error(&log)(e)),
        };

        let summary = browser_log::summarize(&content, filter);
        Ok(serde_json::to_string_pretty(&summary)?)
    }

    // Searching

    pub fn search_file(
        &self,
        name: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<String, WorkspaceError> {
        if query.is_empty() {
            return Err(WorkspaceError::MissingArgument("query"));
        }
        let path = self.policy.resolve_read(name)?;
        let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        let matches = search::search(&content, query, options);
        Ok(search::format_matches(&matches, query, name))
    }

    fn component(&self, key: &str) -> Option<TemplateRef<'_>> {
        let registry = self.project.registry();
        registry
            .get(Namespace::Components, key)
            .or_else(|| registry.resolve(Namespace::Components, key, base_key(key)))
    }

    /// Declared parameters, summary and exact-line variants of a component.
    pub fn describe_component(&self, key: &str) -> String {
        let Some(template) = self.component(key) else {
            return format!("Component \"{key}\" not found");
        };

        let mut out = format!("Component \"{key}\" parameters:\n\n");
        if template.params().is_empty() {
            out.push_str("No parameters found.\n");
        } else {
            out.push_str(&format!("Available parameters: {}\n", template.params().join(", ")));
        }
        if !template.summary().is_empty() {
            out.push_str(&format!("\n{}\n", template.summary()));
        }

        let base = base_key(key);
        let variants: Vec<String> = self
            .project
            .registry()
            .keys(Namespace::Components)
            .into_iter()
            .filter(|k| base_key(k) == base && k != base)
            .collect();
        if !variants.is_empty() {
            out.push_str("\nExact-line variants:\n");
            for variant in variants {
                out.push_str(&format!("  {variant}\n"));
            }
        }
        out
    }

    /// What a component renders with no parameters at all.
    pub fn component_example(&self, key: &str) -> String {
        let Some(TemplateRef::Component(template)) = self.component(key) else {
            return format!("Component \"{key}\" not found");
        };

        let params = Params::new();
        let mut out = format!("Default output for \"{key}\":\n");
        for (label, fragment) in [
            ("HTML", &template.html),
            ("CSS", &template.css),
            ("JS", &template.js),
        ] {
            match fragment.render(&params) {
                Ok(text) if text.trim().is_empty() => {}
                Ok(text) => out.push_str(&format!("\n{label}:\n{}\n", text.trim_end())),
                Err(e) => out.push_str(&format!("\n{label}: failed to render: {e}\n")),
            }
        }
        out
    }

    /// Every template declaring `param`.
    pub fn find_parameter(&self, param: &str) -> String {
        let users = self.templates_using(param);
        if users.is_empty() {
            return format!("Parameter \"{param}\" is not used by any template");
        }
        let mut out = format!("Parameter \"{param}\" usage:\n\n");
        for (namespace, key) in users {
            out.push_str(&format!("  {key} ({namespace})\n"));
        }
        out
    }

    pub fn universal_parameters(&self) -> String {
        let mut out = String::from("Universal parameters:\n\n");
        for param in UNIVERSAL_PARAMS {
            let users: Vec<String> = self
                .templates_using(param)
                .into_iter()
                .map(|(_, key)| key)
                .collect();
            if !users.is_empty() {
                out.push_str(&format!("{param}:\n  {}\n\n", users.join(", ")));
            }
        }
        out
    }

    fn templates_using(&self, param: &str) -> Vec<(Namespace, String)> {
        let registry = self.project.registry();
        let mut users = Vec::new();
        for namespace in [Namespace::Blueprints, Namespace::Components, Namespace::Flows] {
            for key in registry.keys(namespace) {
                let declared = registry
                    .get(namespace, &key)
                    .map(|t| t.params().iter().any(|p| p == param))
                    .unwrap_or(false);
                if declared {
                    users.push((namespace, key));
                }
            }
        }
        users
    }

    // Writing

    fn guarded_write(&self, target: &ResolvedPath, content: &str) -> Result<bool, WorkspaceError> {
        let writer = self.project.writer();
        let backed_up = match target.location {
            Location::Sandbox => writer.write_file(&target.path, content)?,
            Location::Base => {
                writer.check_size(&target.path, content.len())?;
                writer.persist(&target.path, content)?
            }
        };
        Ok(backed_up)
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    pub fn write_overwrite(&self, name: &str, content: &str) -> Result<String, WorkspaceError> {
        let target = self.policy.resolve_write(name)?;
        if target.location == Location::Base || self.policy.is_base_file(name) {
            return Err(WorkspaceError::Protected(name.to_string()));
        }
        let backed_up = self.guarded_write(&target, content)?;

        let sandbox = self.project.output_dir();
        let files = dir_entries(sandbox)?;
        let limit = self.project.writer().current_limits().max_files;
        Ok(format!(
            "Written to {}{}\n{}/{} files in sandbox: {}",
            self.display_path(&target.path),
            if backed_up { " (new version saved)" } else { "" },
            files.len(),
            limit,
            files.join(", ")
        ))
    }

    /// Replace the first occurrence of `old` with `new`.
    pub fn write_segment(&self, name: &str, old: &str, new: &str) -> Result<String, WorkspaceError> {
        if old.is_empty() {
            return Err(WorkspaceError::MissingArgument("old_str"));
        }
        let target = self.policy.resolve_write(name)?;
        let content = std::fs::read_to_string(&target.path).map_err(io_error(&target.path))?;
        if !content.contains(old) {
            return Err(WorkspaceError::SegmentNotFound(name.to_string()));
        }

        let updated = content.replacen(old, new, 1);
        self.guarded_write(&target, &updated)?;

        let shown = self.display_path(&target.path);
        Ok(match target.location {
            Location::Base => format!("Updated segment in {shown}"),
            Location::Sandbox => format!("Updated segment in {shown} (sandbox)"),
        })
    }

    pub fn write_blueprint(&self, content: &str) -> Result<String, WorkspaceError> {
        if content.trim().is_empty() {
            return Err(WorkspaceError::MissingArgument("content"));
        }
        let target = self.policy.resolve_write(BLUEPRINT_FILE)?;
        self.guarded_write(&target, content)?;
        info!(path = %target.path.display(), "Blueprint written");
        Ok(format!("Blueprint written to {}", self.display_path(&target.path)))
    }

    // Executing

    /// Build `blueprint.txt` and every source in the blueprint directory.
    pub fn generate(&self) -> Result<String, WorkspaceError> {
        let mut sources = Vec::new();
        let root_blueprint = self.base.join(BLUEPRINT_FILE);
        if root_blueprint.is_file() {
            sources.push(root_blueprint);
        }
        if self.project.source_dir().is_dir() {
            sources.extend(self.project.scanner().scan()?);
        }
        if sources.is_empty() {
            return Ok("No blueprint sources found".to_string());
        }

        let report = self.project.build_paths(sources);
        let lines: Vec<String> = report.units.iter().map(|u| self.describe_unit(u)).collect();
        let text = lines.join("\n");

        if report.is_success() {
            Ok(text)
        } else {
            Err(WorkspaceError::GenerateFailed(text))
        }
    }

    fn describe_unit(&self, unit: &UnitOutcome) -> String {
        let source = self.display_path(&unit.source);
        match &unit.result {
            Ok(report) => {
                let mut line = format!("{source}:");
                for path in &report.write.written {
                    line.push_str(&format!(" generated {}", self.display_path(path)));
                }
                for kind in &report.write.skipped {
                    line.push_str(&format!(" skipped {kind}"));
                }
                for diagnostic in &report.page.diagnostics {
                    line.push_str(&format!("\n  warning: {diagnostic}"));
                }
                line
            }
            Err(e) => format!("{source}: error: {e}"),
        }
    }

    pub fn list(&self, directory: &str) -> Result<String, WorkspaceError> {
        let dir = self.policy.resolve_read(directory)?;
        let files = dir_entries(&dir)?;
        Ok(format!(
            "Files in {directory}: {} ({} total)",
            files.join(", "),
            files.len()
        ))
    }
}

const INDEX_HEADER: &str = "Blueprint reference

A blueprint source has one directive per line:

  page:<name>;
  blueprint:<key>[; param=value]*;
  <component-key>[; param=value | param=[v1,v2,...]]*;
  flow:<name>;

1. Start with a blueprint: line; it wraps the page.
2. Component lines are inserted between the blueprint's start and end, in order.
3. flow: lines add behavior to the page script.

The blueprint's theme carries over to components that do not set their own.
Output goes to <page>.html, <page>.css and <page>.js in the sandbox.
";
