//! Template packs loaded from disk.
//!
//! A pack is a directory with a `registry.toml` manifest:
//!
//! ```toml
//! [[components]]
//! key = "banner"
//! summary = "Full-width announcement bar"
//! params = ["text", "theme"]
//! html = "banner.html.tera"
//! css = "banner.css"
//! ```
//!
//! Field values are paths relative to the pack directory. Files ending in
//! `.tera` render through tera with the directive parameters as context;
//! anything else is used verbatim.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use super::{
    BlueprintTemplate, ComponentTemplate, FlowTemplate, Fragment, RegistryBuilder, RegistryError,
    RenderError,
};

pub const MANIFEST_NAME: &str = "registry.toml";

#[derive(Debug, Error)]
pub enum PackError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("template error: {0}")]
    Tera(#[from] tera::Error),
    #[error("`{key}` refers to missing file {}", .path.display())]
    MissingFile { key: String, path: PathBuf },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    blueprints: Vec<BlueprintEntry>,
    #[serde(default)]
    components: Vec<ComponentEntry>,
    #[serde(default)]
    flows: Vec<FlowEntry>,
}

#[derive(Debug, Deserialize)]
struct BlueprintEntry {
    key: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    params: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    css: Option<String>,
    js: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComponentEntry {
    key: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    params: Vec<String>,
    html: Option<String>,
    css: Option<String>,
    js: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlowEntry {
    key: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    params: Vec<String>,
    js: Option<String>,
}

/// Templates read from a pack directory, ready to be layered over a
/// [`RegistryBuilder`].
#[derive(Debug, Default)]
pub struct TemplatePack {
    root: PathBuf,
    blueprints: Vec<(String, BlueprintTemplate)>,
    components: Vec<(String, ComponentTemplate)>,
    flows: Vec<(String, FlowTemplate)>,
}

impl TemplatePack {
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, PackError> {
        let root = dir.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_NAME);
        let data = std::fs::read_to_string(&manifest_path).map_err(|source| PackError::Io {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: Manifest = toml::from_str(&data).map_err(|source| PackError::Manifest {
            path: manifest_path,
            source,
        })?;

        let tera = Arc::new(load_tera(&root)?);
        let loader = FieldLoader {
            root: &root,
            tera: &tera,
        };

        let mut pack = TemplatePack {
            root: root.clone(),
            ..Default::default()
        };

        for entry in manifest.blueprints {
            let template = BlueprintTemplate {
                start: loader.fragment(&entry.key, entry.start.as_deref())?,
                end: loader.fragment(&entry.key, entry.end.as_deref())?,
                css: loader.fragment(&entry.key, entry.css.as_deref())?,
                js: loader.fragment(&entry.key, entry.js.as_deref())?,
                summary: entry.summary,
                params: entry.params,
            };
            pack.blueprints.push((entry.key, template));
        }

        for entry in manifest.components {
            let template = ComponentTemplate {
                html: loader.fragment(&entry.key, entry.html.as_deref())?,
                css: loader.fragment(&entry.key, entry.css.as_deref())?,
                js: loader.fragment(&entry.key, entry.js.as_deref())?,
                summary: entry.summary,
                params: entry.params,
            };
            pack.components.push((entry.key, template));
        }

        for entry in manifest.flows {
            let template = FlowTemplate {
                js: loader.fragment(&entry.key, entry.js.as_deref())?,
                summary: entry.summary,
                params: entry.params,
            };
            pack.flows.push((entry.key, template));
        }

        debug!(
            root = %pack.root.display(),
            templates = pack.len(),
            "Loaded template pack"
        );

        Ok(pack)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.blueprints.len() + self.components.len() + self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register every pack template, replacing built-ins with the same key.
    pub fn apply(self, builder: RegistryBuilder) -> Result<RegistryBuilder, PackError> {
        let mut builder = builder;
        for (key, template) in self.blueprints {
            builder = builder.try_blueprint(&key, template)?;
        }
        for (key, template) in self.components {
            builder = builder.try_component(&key, template)?;
        }
        for (key, template) in self.flows {
            builder = builder.try_flow(&key, template)?;
        }
        Ok(builder)
    }
}

/// Every `.tera` file under the pack, named by its path relative to the root
/// so templates can `{% include %}` each other.
fn load_tera(root: &Path) -> Result<Tera, PackError> {
    let files: Vec<(PathBuf, Option<String>)> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_tera(e.path()))
        .filter_map(|e| {
            let name = template_name(root, e.path())?;
            Some((e.path().to_path_buf(), Some(name)))
        })
        .collect();

    let mut tera = Tera::default();
    tera.add_template_files(files)?;
    Ok(tera)
}

fn is_tera(path: &Path) -> bool {
    path.extension().map(|ext| ext == "tera").unwrap_or(false)
}

fn template_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

struct FieldLoader<'a> {
    root: &'a Path,
    tera: &'a Arc<Tera>,
}

impl FieldLoader<'_> {
    fn fragment(&self, key: &str, file: Option<&str>) -> Result<Fragment, PackError> {
        let Some(file) = file else {
            return Ok(Fragment::empty());
        };

        let path = self.root.join(file);
        if !path.is_file() {
            return Err(PackError::MissingFile {
                key: key.to_string(),
                path,
            });
        }

        if is_tera(&path) {
            let name = template_name(self.root, &path).unwrap_or_else(|| file.to_string());
            let tera = Arc::clone(self.tera);
            return Ok(Fragment::try_computed(move |params| {
                let context = Context::from_serialize(params).map_err(|source| RenderError::Tera {
                    name: name.clone(),
                    source,
                })?;
                tera.render(&name, &context)
                    .map_err(|source| RenderError::Tera {
                        name: name.clone(),
                        source,
                    })
            }));
        }

        let text = std::fs::read_to_string(&path).map_err(|source| PackError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Fragment::literal(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;
    use crate::registry::Namespace;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn sample_pack() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            MANIFEST_NAME,
            r#"
[[components]]
key = "banner"
summary = "Announcement bar"
params = ["text"]
html = "banner/banner.html.tera"
css = "banner/banner.css"

[[components]]
key = "hero"
html = "hero.html"

[[flows]]
key = "flow:wave"
js = "wave.js"
"#,
        );
        write(
            dir.path(),
            "banner/banner.html.tera",
            r#"<div class="banner">{{ text | default(value="Hello") }}</div>"#,
        );
        write(dir.path(), "banner/banner.css", ".banner { color: red; }");
        write(dir.path(), "hero.html", "<h1>pack hero</h1>");
        write(dir.path(), "wave.js", "console.log('wave');");
        dir
    }

    #[test]
    fn test_load_and_render_pack() {
        let dir = sample_pack();
        let pack = TemplatePack::load(dir.path()).unwrap();
        assert_eq!(pack.len(), 3);

        let registry = pack.apply(RegistryBuilder::with_builtins()).unwrap().build();
        let banner = registry.component("banner", "banner").unwrap();
        assert!(banner.html.is_computed());

        let mut params = Params::new();
        params.insert("text", "Sale");
        assert_eq!(
            banner.html.render(&params).unwrap(),
            r#"<div class="banner">Sale</div>"#
        );
        assert_eq!(
            banner.html.render(&Params::new()).unwrap(),
            r#"<div class="banner">Hello</div>"#
        );
        assert!(registry.get(Namespace::Flows, "flow:wave").is_some());
    }

    #[test]
    fn test_pack_overrides_builtin() {
        let dir = sample_pack();
        let registry = TemplatePack::load(dir.path())
            .unwrap()
            .apply(RegistryBuilder::with_builtins())
            .unwrap()
            .build();

        let hero = registry.component("hero", "hero").unwrap();
        assert_eq!(hero.html.render(&Params::new()).unwrap(), "<h1>pack hero</h1>");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            MANIFEST_NAME,
            "[[components]]\nkey = \"ghost\"\nhtml = \"ghost.html\"\n",
        );

        let err = TemplatePack::load(dir.path()).unwrap_err();
        assert!(matches!(err, PackError::MissingFile { ref key, .. } if key == "ghost"));
    }

    #[test]
    fn test_bad_blueprint_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            MANIFEST_NAME,
            "[[blueprints]]\nkey = \"landing\"\n",
        );

        let pack = TemplatePack::load(dir.path()).unwrap();
        let err = pack.apply(RegistryBuilder::new()).unwrap_err();
        assert!(matches!(err, PackError::Registry(RegistryError::InvalidBlueprintKey(_))));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            TemplatePack::load(dir.path()),
            Err(PackError::Io { .. })
        ));
    }
}
