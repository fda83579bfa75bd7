//! Blueprint source → HTML/CSS/JS streams.
//!
//! The assembler walks the source once per phase:
//!
//! 1. `page:` names the output (default `app`).
//! 2. The first `blueprint:` line opens the page: its `start` half, CSS and
//!    JS go first.
//! 3. Every line, in order, is tried against components (HTML, CSS, JS) and
//!    flows (JS). A line may hit both.
//! 4. The blueprint's `end` half closes the page.
//!
//! Nothing that fails to resolve aborts the compile. It is recorded as a
//! [`Diagnostic`] on the [`CompiledPage`] instead.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::params::{cascade, Params};
use crate::parser::{self, ParseError, ParseMode, ParseOutcome, ParseWarning};
use crate::registry::builtin::MAX_REPEAT_COUNT;
use crate::registry::{Fragment, Registry};
use crate::telemetry::{error_logging_script, splice_before_body_close};
use crate::writer::ArtifactKind;

pub const DEFAULT_PAGE_NAME: &str = "app";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },
}

/// Something the compiler skipped or tolerated. Line numbers are 1-based and
/// count blank lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    NoBlueprint,
    UnresolvedBlueprint { line: usize, key: String },
    Unresolved { line: usize, key: String },
    MalformedParameter { line: usize, warning: ParseWarning },
    UnknownParameter { line: usize, key: String, param: String },
    RenderFailed { line: usize, key: String, error: String },
    InvalidPageName { line: usize, name: String },
    CountClamped { line: usize, key: String, requested: usize, max: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoBlueprint => write!(f, "no blueprint: line, page has no wrapper"),
            Diagnostic::UnresolvedBlueprint { line, key } => {
                write!(f, "line {line}: blueprint `{key}` not found")
            }
            Diagnostic::Unresolved { line, key } => {
                write!(f, "line {line}: `{key}` is not a known component or flow")
            }
            Diagnostic::MalformedParameter { line, warning } => write!(f, "line {line}: {warning}"),
            Diagnostic::UnknownParameter { line, key, param } => {
                write!(f, "line {line}: `{key}` does not use parameter `{param}`")
            }
            Diagnostic::RenderFailed { line, key, error } => {
                write!(f, "line {line}: `{key}` failed to render: {error}")
            }
            Diagnostic::CountClamped { line, key, requested, max } => {
                write!(f, "line {line}: `{key}` count {requested} is over the maximum, using {max}")
            }
            Diagnostic::InvalidPageName { line, name } => {
                write!(f, "line {line}: page name `{name}` is not a plain file name, using `{DEFAULT_PAGE_NAME}`")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub mode: ParseMode,
    /// Collector endpoint for the browser error script. `None` disables it.
    pub telemetry: Option<String>,
    /// Extra scripts spliced before `</body>`, after the error script.
    pub body_scripts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledPage {
    pub page_name: String,
    pub html: String,
    pub css: String,
    pub js: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledPage {
    pub fn stream(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Html => &self.html,
            ArtifactKind::Css => &self.css,
            ArtifactKind::Js => &self.js,
        }
    }
}

/// What a source line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRole {
    Page,
    Blueprint { resolved: bool },
    Body { component: bool, flow: bool },
}

#[derive(Debug, Clone)]
pub struct LineReport {
    pub line: usize,
    pub outcome: ParseOutcome,
    pub role: LineRole,
}

/// Whether `name` can be used as a file stem directly inside the output
/// directory.
pub fn is_valid_page_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', ':'])
        && !name.chars().any(char::is_control)
}

/// Line number and text of the first non-empty `page:` declaration.
fn declared_page_name(source: &str) -> Option<(usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .find(|(_, line)| line.starts_with("page:"))
        .and_then(|(number, line)| {
            let (_, rest) = line.split_once(':')?;
            Some((number, rest.split(';').next().unwrap_or_default().trim()))
        })
        .filter(|(_, name)| !name.is_empty())
}

/// Name of the page a source compiles to.
///
/// Taken from the first `page:` line: the text after the first `:` up to the
/// first `;`. Falls back to `app`, also when the name would leave the output
/// directory.
pub fn page_name(source: &str) -> String {
    declared_page_name(source)
        .map(|(_, name)| name)
        .filter(|name| is_valid_page_name(name))
        .unwrap_or(DEFAULT_PAGE_NAME)
        .to_string()
}

struct SourceLine {
    number: usize,
    outcome: ParseOutcome,
}

pub struct Compiler<'r> {
    registry: &'r Registry,
    options: CompileOptions,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    fn parse_source(&self, source: &str) -> Result<Vec<SourceLine>, CompileError> {
        let mut lines = Vec::new();
        for (i, text) in source.lines().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            let number = i + 1;
            let outcome = parser::parse(text, self.options.mode)
                .map_err(|source| CompileError::Parse { line: number, source })?;
            lines.push(SourceLine { number, outcome });
        }
        Ok(lines)
    }

    /// Compile one blueprint source. Only strict-mode parse failures are
    /// errors.
    pub fn compile(&self, source: &str) -> Result<CompiledPage, CompileError> {
        let lines = self.parse_source(source)?;
        let page_name = page_name(source);
        let mut diagnostics = Vec::new();

        if let Some((line, name)) =
            declared_page_name(source).filter(|(_, name)| !is_valid_page_name(name))
        {
            diagnostics.push(Diagnostic::InvalidPageName {
                line,
                name: name.to_string(),
            });
        }

        for line in &lines {
            for warning in &line.outcome.warnings {
                diagnostics.push(Diagnostic::MalformedParameter {
                    line: line.number,
                    warning: warning.clone(),
                });
            }
        }

        let mut html = String::new();
        let mut css = String::new();
        let mut js = String::new();

        let blueprint_line = lines.iter().find(|l| l.outcome.directive.is_blueprint());
        let mut blueprint_params = Params::new();
        let mut blueprint = None;

        match blueprint_line {
            Some(line) => {
                let directive = &line.outcome.directive;
                blueprint_params = directive.params.clone();
                blueprint_params.insert("output", page_name.as_str());

                match self.registry.blueprint(&directive.raw, &directive.base_key) {
                    Some(template) => {
                        debug!(key = %directive.base_key, "Opening blueprint");
                        let mut renderer = Renderer {
                            line: line.number,
                            key: &directive.base_key,
                            params: &blueprint_params,
                            diagnostics: &mut diagnostics,
                        };
                        renderer.render(&template.start, &mut html);
                        renderer.render(&template.css, &mut css);
                        renderer.render(&template.js, &mut js);
                        blueprint = Some((line.number, &directive.base_key, template));
                    }
                    None => diagnostics.push(Diagnostic::UnresolvedBlueprint {
                        line: line.number,
                        key: directive.base_key.clone(),
                    }),
                }
            }
            None => diagnostics.push(Diagnostic::NoBlueprint),
        }

        for line in &lines {
            let directive = &line.outcome.directive;
            let merged = cascade(&blueprint_params, &directive.params);

            let component = self.registry.component(&directive.raw, &directive.base_key);
            if let Some(template) = component {
                debug!(key = %directive.base_key, "Adding component");
                if !template.params.is_empty() {
                    for param in directive.params.keys() {
                        if !template.params.iter().any(|p| p == param) {
                            diagnostics.push(Diagnostic::UnknownParameter {
                                line: line.number,
                                key: directive.base_key.clone(),
                                param: param.to_string(),
                            });
                        }
                    }
                }
                if template.params.iter().any(|p| p == "count") {
                    if let Some(requested) =
                        merged.number("count").filter(|n| *n > MAX_REPEAT_COUNT)
                    {
                        diagnostics.push(Diagnostic::CountClamped {
                            line: line.number,
                            key: directive.base_key.clone(),
                            requested,
                            max: MAX_REPEAT_COUNT,
                        });
                    }
                }
                let mut renderer = Renderer {
                    line: line.number,
                    key: &directive.base_key,
                    params: &merged,
                    diagnostics: &mut diagnostics,
                };
                renderer.render(&template.html, &mut html);
                renderer.render(&template.css, &mut css);
                renderer.render(&template.js, &mut js);
            }

            let flow = self.registry.flow(&directive.raw, &directive.base_key);
            if let Some(template) = flow {
                debug!(key = %directive.base_key, "Adding flow");
                Renderer {
                    line: line.number,
                    key: &directive.base_key,
                    params: &directive.params,
                    diagnostics: &mut diagnostics,
                }
                .render(&template.js, &mut js);
            }

            let structural = directive.is_page() || directive.is_blueprint();
            if component.is_none() && flow.is_none() && !structural {
                diagnostics.push(Diagnostic::Unresolved {
                    line: line.number,
                    key: directive.base_key.clone(),
                });
            }
        }

        if let Some((line, key, template)) = blueprint {
            Renderer {
                line,
                key,
                params: &blueprint_params,
                diagnostics: &mut diagnostics,
            }
            .render(&template.end, &mut html);
        }

        let html = self.instrument(&page_name, html);

        for diagnostic in &diagnostics {
            warn!(page = %page_name, "{diagnostic}");
        }

        Ok(CompiledPage {
            page_name,
            html,
            css,
            js,
            diagnostics,
        })
    }

    fn instrument(&self, page_name: &str, html: String) -> String {
        let mut scripts = String::new();
        if let Some(endpoint) = &self.options.telemetry {
            scripts.push_str(&error_logging_script(page_name, endpoint));
        }
        for script in &self.options.body_scripts {
            scripts.push_str(script);
        }
        if scripts.is_empty() {
            return html;
        }
        splice_before_body_close(&html, &scripts).unwrap_or(html)
    }

    /// Per-line resolution without rendering anything.
    pub fn explain(&self, source: &str) -> Result<Vec<LineReport>, CompileError> {
        let lines = self.parse_source(source)?;
        let first_blueprint = lines
            .iter()
            .find(|l| l.outcome.directive.is_blueprint())
            .map(|l| l.number);

        Ok(lines
            .into_iter()
            .map(|line| {
                let directive = &line.outcome.directive;
                let role = if directive.is_page() {
                    LineRole::Page
                } else if directive.is_blueprint() && Some(line.number) == first_blueprint {
                    LineRole::Blueprint {
                        resolved: self
                            .registry
                            .blueprint(&directive.raw, &directive.base_key)
                            .is_some(),
                    }
                } else {
                    LineRole::Body {
                        component: self
                            .registry
                            .component(&directive.raw, &directive.base_key)
                            .is_some(),
                        flow: self
                            .registry
                            .flow(&directive.raw, &directive.base_key)
                            .is_some(),
                    }
                };
                LineReport {
                    line: line.number,
                    outcome: line.outcome,
                    role,
                }
            })
            .collect())
    }
}

struct Renderer<'a> {
    line: usize,
    key: &'a str,
    params: &'a Params,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Renderer<'_> {
    fn render(&mut self, fragment: &Fragment, out: &mut String) {
        match fragment.render(self.params) {
            Ok(text) => out.push_str(&text),
            Err(e) => self.diagnostics.push(Diagnostic::RenderFailed {
                line: self.line,
                key: self.key.to_string(),
                error: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BlueprintTemplate, ComponentTemplate, FlowTemplate, RegistryBuilder};

    fn fixture() -> Registry {
        RegistryBuilder::new()
            .blueprint(
                "blueprint:plain",
                BlueprintTemplate {
                    start: Fragment::computed(|p| format!("<body data-out=\"{}\">", p.text_or("output", "?"))),
                    end: Fragment::literal("</body>"),
                    css: Fragment::literal("/*bp*/"),
                    js: Fragment::literal("//bp\n"),
                    ..Default::default()
                },
            )
            .component(
                "box",
                ComponentTemplate {
                    params: vec!["label".into(), "theme".into()],
                    html: Fragment::computed(|p| {
                        format!("[{}:{}]", p.text_or("label", "box"), p.text_or("theme", "none"))
                    }),
                    css: Fragment::literal(".box{}"),
                    js: Fragment::literal("//box\n"),
                    ..Default::default()
                },
            )
            .flow(
                "box",
                FlowTemplate {
                    js: Fragment::literal("//box-flow\n"),
                    ..Default::default()
                },
            )
            .flow(
                "flow:ping",
                FlowTemplate {
                    js: Fragment::literal("//ping\n"),
                    ..Default::default()
                },
            )
            .build()
    }

    #[test]
    fn test_page_name() {
        assert_eq!(page_name("page:demo;\nblueprint:x"), "demo");
        assert_eq!(page_name("  page: landing ; theme=dark"), "landing");
        assert_eq!(page_name("blueprint:x"), "app");
        assert_eq!(page_name("page:;"), "app");
        assert_eq!(page_name(""), "app");
        assert_eq!(page_name("page:../up;"), "app");
        assert_eq!(page_name("page:/tmp/abs;"), "app");
        assert_eq!(page_name("page:C:\\x;"), "app");
        assert_eq!(page_name("page:.hidden;"), "app");
    }

    #[test]
    fn test_unsafe_page_name_is_reported() {
        let registry = fixture();
        let page = Compiler::new(&registry)
            .compile("\npage:../../etc/x;\nblueprint:plain\n")
            .unwrap();

        assert_eq!(page.page_name, "app");
        assert_eq!(
            page.diagnostics,
            vec![Diagnostic::InvalidPageName {
                line: 2,
                name: "../../etc/x".into()
            }]
        );
    }

    #[test]
    fn test_wrapping_order_and_streams() {
        let registry = fixture();
        let source = "page:demo;\nblueprint:plain; theme=dark\nflow:ping\nbox; label=A\n";
        let page = Compiler::new(&registry).compile(source).unwrap();

        assert_eq!(page.page_name, "demo");
        assert_eq!(page.html, "<body data-out=\"demo\">[A:dark]</body>");
        assert_eq!(page.css, "/*bp*/.box{}");
        // flow JS and component JS interleave in source order
        assert_eq!(page.js, "//bp\n//ping\n//box\n//box-flow\n");
        assert!(page.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_lines_are_diagnostics() {
        let registry = fixture();
        let source = "blueprint:plain\nmystery:thing; a=1\nbox; label=B\n";
        let page = Compiler::new(&registry).compile(source).unwrap();

        assert_eq!(page.html, "<body data-out=\"app\">[B:none]</body>");
        assert_eq!(
            page.diagnostics,
            vec![Diagnostic::Unresolved {
                line: 2,
                key: "mystery:thing".into()
            }]
        );
    }

    #[test]
    fn test_missing_and_unresolved_blueprint() {
        let registry = fixture();

        let page = Compiler::new(&registry).compile("box\n").unwrap();
        assert_eq!(page.html, "[box:none]");
        assert_eq!(page.diagnostics, vec![Diagnostic::NoBlueprint]);

        let page = Compiler::new(&registry).compile("blueprint:nope\n").unwrap();
        assert!(page.html.is_empty());
        assert!(matches!(
            page.diagnostics.as_slice(),
            [Diagnostic::UnresolvedBlueprint { line: 1, .. }]
        ));
    }

    #[test]
    fn test_unknown_parameter_skips_cascaded_theme() {
        let registry = fixture();
        let source = "blueprint:plain; theme=dark\nbox; label=A; size=xl\n";
        let page = Compiler::new(&registry).compile(source).unwrap();

        assert_eq!(
            page.diagnostics,
            vec![Diagnostic::UnknownParameter {
                line: 2,
                key: "box".into(),
                param: "size".into()
            }]
        );
    }

    #[test]
    fn test_strict_mode_rejects_malformed_segments() {
        let registry = fixture();
        let source = "blueprint:plain\nbox; label\n";

        let lenient = Compiler::new(&registry).compile(source).unwrap();
        assert!(matches!(
            lenient.diagnostics.as_slice(),
            [Diagnostic::MalformedParameter { line: 2, .. }]
        ));

        let strict = Compiler::new(&registry).with_options(CompileOptions {
            mode: ParseMode::Strict,
            ..Default::default()
        });
        assert!(matches!(
            strict.compile(source),
            Err(CompileError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_instrumentation_and_body_scripts() {
        let registry = fixture();
        let compiler = Compiler::new(&registry).with_options(CompileOptions {
            telemetry: Some("http://collector/log".into()),
            body_scripts: vec!["<script>reload()</script>".into()],
            ..Default::default()
        });
        let page = compiler.compile("page:x\nblueprint:plain\n").unwrap();

        let error_script = page.html.find("const PAGE_NAME = 'x.html';").unwrap();
        let reload = page.html.find("<script>reload()</script>").unwrap();
        let close = page.html.find("</body>").unwrap();
        assert!(error_script < reload && reload < close);
    }

    #[test]
    fn test_repeat_count_is_clamped() {
        let registry = Registry::builtin();
        let page = Compiler::new(&registry)
            .compile("blueprint:test/blank;\nsteps; count=4000000000;\n")
            .unwrap();

        assert_eq!(page.html.matches("class=\"step-item\"").count(), MAX_REPEAT_COUNT);
        assert_eq!(
            page.diagnostics,
            vec![Diagnostic::CountClamped {
                line: 2,
                key: "steps".into(),
                requested: 4_000_000_000,
                max: MAX_REPEAT_COUNT
            }]
        );
    }

    #[test]
    fn test_empty_source() {
        let registry = fixture();
        let page = Compiler::new(&registry).compile("\n  \n").unwrap();
        assert!(page.html.is_empty() && page.css.is_empty() && page.js.is_empty());
        assert_eq!(page.page_name, "app");
    }

    #[test]
    fn test_explain_roles() {
        let registry = fixture();
        let source = "page:demo\nblueprint:plain\nbox\nflow:ping\nghost\n";
        let report = Compiler::new(&registry).explain(source).unwrap();

        let roles: Vec<_> = report.iter().map(|r| r.role.clone()).collect();
        assert_eq!(
            roles,
            vec![
                LineRole::Page,
                LineRole::Blueprint { resolved: true },
                LineRole::Body { component: true, flow: true },
                LineRole::Body { component: false, flow: true },
                LineRole::Body { component: false, flow: false },
            ]
        );
    }
}
