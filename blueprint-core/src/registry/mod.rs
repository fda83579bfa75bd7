//! Template registry.
//!
//! Three namespaces (blueprints, components, flows), each indexed by base key
//! and then by exact line signature:
//!
//! ```text
//! "separator:text" ─┬─ default            → parametric separator
//!                   └─ exact
//!                      "separator:text; content=\"OR CONTINUE WITH EMAIL\"" → fixed markup
//! ```
//!
//! A [`Registry`] is built once through [`RegistryBuilder`] and never changes
//! afterwards; the compiler only borrows it.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::params::Params;
use crate::parser::{base_key, signature};

pub mod builtin;
pub mod pack;

pub use pack::{PackError, TemplatePack};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{name}` failed to render: {source}")]
    Tera {
        name: String,
        #[source]
        source: tera::Error,
    },
}

pub type RenderFn = dyn Fn(&Params) -> Result<String, RenderError> + Send + Sync;

/// One HTML/CSS/JS field of a template.
#[derive(Clone)]
pub enum Fragment {
    Literal(Cow<'static, str>),
    Computed(Arc<RenderFn>),
}

impl Fragment {
    pub fn empty() -> Self {
        Fragment::Literal(Cow::Borrowed(""))
    }

    pub fn literal<S: Into<Cow<'static, str>>>(text: S) -> Self {
        Fragment::Literal(text.into())
    }

    /// Infallible parametric fragment.
    pub fn computed<F>(render: F) -> Self
    where
        F: Fn(&Params) -> String + Send + Sync + 'static,
    {
        Fragment::Computed(Arc::new(move |params| Ok(render(params))))
    }

    pub fn try_computed<F>(render: F) -> Self
    where
        F: Fn(&Params) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Fragment::Computed(Arc::new(render))
    }

    pub fn render(&self, params: &Params) -> Result<Cow<'_, str>, RenderError> {
        match self {
            Fragment::Literal(text) => Ok(Cow::Borrowed(text.as_ref())),
            Fragment::Computed(render) => render(params).map(Cow::Owned),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Fragment::Computed(_))
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Fragment::empty()
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Literal(text) => f.debug_tuple("Literal").field(&text.len()).finish(),
            Fragment::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Page skeleton: components are inserted between `start` and `end`.
#[derive(Debug, Clone, Default)]
pub struct BlueprintTemplate {
    pub summary: String,
    pub params: Vec<String>,
    pub start: Fragment,
    pub end: Fragment,
    pub css: Fragment,
    pub js: Fragment,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentTemplate {
    pub summary: String,
    pub params: Vec<String>,
    pub html: Fragment,
    pub css: Fragment,
    pub js: Fragment,
}

#[derive(Debug, Clone, Default)]
pub struct FlowTemplate {
    pub summary: String,
    pub params: Vec<String>,
    pub js: Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Blueprints,
    Components,
    Flows,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Blueprints => write!(f, "blueprint"),
            Namespace::Components => write!(f, "component"),
            Namespace::Flows => write!(f, "flow"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TemplateRef<'a> {
    Blueprint(&'a BlueprintTemplate),
    Component(&'a ComponentTemplate),
    Flow(&'a FlowTemplate),
}

impl TemplateRef<'_> {
    pub fn summary(&self) -> &str {
        match self {
            TemplateRef::Blueprint(t) => &t.summary,
            TemplateRef::Component(t) => &t.summary,
            TemplateRef::Flow(t) => &t.summary,
        }
    }

    pub fn params(&self) -> &[String] {
        match self {
            TemplateRef::Blueprint(t) => &t.params,
            TemplateRef::Component(t) => &t.params,
            TemplateRef::Flow(t) => &t.params,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    default: Option<T>,
    exact: BTreeMap<String, T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            default: None,
            exact: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Index<T> {
    slots: HashMap<String, Slot<T>>,
}

impl<T> Default for Index<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<T> Index<T> {
    fn insert(&mut self, key: &str, template: T) {
        let base = base_key(key).to_string();
        let sig = signature(key);
        let slot = self.slots.entry(base.clone()).or_default();
        if sig == base {
            slot.default = Some(template);
        } else {
            slot.exact.insert(sig, template);
        }
    }

    fn resolve(&self, line: &str, base: &str) -> Option<&T> {
        let slot = self.slots.get(base)?;
        slot.exact.get(&signature(line)).or(slot.default.as_ref())
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for (base, slot) in &self.slots {
            if slot.default.is_some() {
                keys.push(base.clone());
            }
            keys.extend(slot.exact.keys().cloned());
        }
        keys.sort();
        keys
    }

    fn get_key(&self, key: &str) -> Option<&T> {
        let slot = self.slots.get(base_key(key))?;
        let sig = signature(key);
        if sig == base_key(key) {
            slot.default.as_ref()
        } else {
            slot.exact.get(&sig)
        }
    }

    fn len(&self) -> usize {
        self.slots
            .values()
            .map(|s| s.exact.len() + usize::from(s.default.is_some()))
            .sum()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry key `{0}` is empty")]
    EmptyKey(String),
    #[error("blueprint key `{0}` must start with `blueprint:`")]
    InvalidBlueprintKey(String),
}

/// Immutable template library.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    blueprints: Index<BlueprintTemplate>,
    components: Index<ComponentTemplate>,
    flows: Index<FlowTemplate>,
}

impl Registry {
    /// The templates that ship with the compiler.
    pub fn builtin() -> Self {
        RegistryBuilder::with_builtins().build()
    }

    pub fn blueprint(&self, line: &str, base: &str) -> Option<&BlueprintTemplate> {
        self.blueprints.resolve(line, base)
    }

    pub fn component(&self, line: &str, base: &str) -> Option<&ComponentTemplate> {
        self.components.resolve(line, base)
    }

    pub fn flow(&self, line: &str, base: &str) -> Option<&FlowTemplate> {
        self.flows.resolve(line, base)
    }

    /// Exact line signature first, then base key.
    pub fn resolve(&self, namespace: Namespace, line: &str, base: &str) -> Option<TemplateRef<'_>> {
        match namespace {
            Namespace::Blueprints => self.blueprint(line, base).map(TemplateRef::Blueprint),
            Namespace::Components => self.component(line, base).map(TemplateRef::Component),
            Namespace::Flows => self.flow(line, base).map(TemplateRef::Flow),
        }
    }

    /// Look up a template by the key it was registered under.
    pub fn get(&self, namespace: Namespace, key: &str) -> Option<TemplateRef<'_>> {
        match namespace {
            Namespace::Blueprints => self.blueprints.get_key(key).map(TemplateRef::Blueprint),
            Namespace::Components => self.components.get_key(key).map(TemplateRef::Component),
            Namespace::Flows => self.flows.get_key(key).map(TemplateRef::Flow),
        }
    }

    /// Registered keys, sorted.
    pub fn keys(&self, namespace: Namespace) -> Vec<String> {
        match namespace {
            Namespace::Blueprints => self.blueprints.keys(),
            Namespace::Components => self.components.keys(),
            Namespace::Flows => self.flows.keys(),
        }
    }

    pub fn len(&self) -> usize {
        self.blueprints.len() + self.components.len() + self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects templates, then freezes them into a [`Registry`].
///
/// Registering the same key twice replaces the earlier template, which is how
/// template packs override built-ins.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        builtin::register(Self::new())
    }

    pub fn blueprint(mut self, key: &str, template: BlueprintTemplate) -> Self {
        self.registry.blueprints.insert(key, template);
        self
    }

    pub fn component(mut self, key: &str, template: ComponentTemplate) -> Self {
        self.registry.components.insert(key, template);
        self
    }

    pub fn flow(mut self, key: &str, template: FlowTemplate) -> Self {
        self.registry.flows.insert(key, template);
        self
    }

    /// Like the plain registration methods, but rejects keys that could never
    /// match a directive. Used for templates loaded from disk.
    pub fn try_blueprint(self, key: &str, template: BlueprintTemplate) -> Result<Self, RegistryError> {
        check_key(key)?;
        if !base_key(key).starts_with("blueprint:") {
            return Err(RegistryError::InvalidBlueprintKey(key.to_string()));
        }
        Ok(self.blueprint(key, template))
    }

    pub fn try_component(self, key: &str, template: ComponentTemplate) -> Result<Self, RegistryError> {
        check_key(key)?;
        Ok(self.component(key, template))
    }

    pub fn try_flow(self, key: &str, template: FlowTemplate) -> Result<Self, RegistryError> {
        check_key(key)?;
        Ok(self.flow(key, template))
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}

fn check_key(key: &str) -> Result<(), RegistryError> {
    if base_key(key).is_empty() {
        return Err(RegistryError::EmptyKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
