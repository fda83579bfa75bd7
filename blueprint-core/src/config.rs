use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::telemetry::DEFAULT_ENDPOINT;
use crate::versions::{DEFAULT_LEDGER, DEFAULT_VERSIONS_DIR};
use crate::writer::Limits;

pub const DEFAULT_CONFIG_FILE: &str = "./blueprint.toml";

/// Contents of `blueprint.toml`. Every section is optional. The CLI layers
/// it with the environment and flags before deserializing.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,
    pub telemetry: TelemetryConfig,
    pub limits: Limits,
    pub versions: VersionsConfig,
    pub server: ServerConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory holding `*.txt` blueprint sources
    pub source: PathBuf,
    /// Where compiled pages go
    pub output: PathBuf,
    /// Optional template pack directory
    pub templates: Option<PathBuf>,
    /// Treat malformed parameters as errors
    pub strict: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("./blueprints"),
            output: PathBuf::from("./sandbox"),
            templates: None,
            strict: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Endpoint to instrument pages with, if enabled.
    pub fn endpoint(&self) -> Option<String> {
        self.enabled.then(|| self.endpoint.clone())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VersionsConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub ledger: PathBuf,
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(DEFAULT_VERSIONS_DIR),
            ledger: PathBuf::from(DEFAULT_LEDGER),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Port of the browser error collector
    pub collector_port: u16,
    pub open: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            collector_port: 3002,
            open: false,
        }
    }
}
