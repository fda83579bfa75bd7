use anyhow::{Context, Result};
use blueprint_core::config::{Config, DEFAULT_CONFIG_FILE};
use clap::{Arg, ArgAction, ArgMatches, Command};
use config::{Config as ConfigBuilder, Environment, File, FileFormat, Map};
use std::path::Path;

pub const ENV_PREFIX: &str = "BLUEPRINT";

/// `-c/--config` and the build-related overrides shared by every subcommand.
pub fn add_config_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .default_value(DEFAULT_CONFIG_FILE),
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("DIR")
                .help("Directory containing blueprint sources [default: ./blueprints]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for compiled pages [default: ./sandbox]"),
        )
        .arg(
            Arg::new("templates")
                .long("templates")
                .value_name("DIR")
                .help("Template pack layered over the built-in templates"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Treat malformed parameters as errors")
                .action(ArgAction::SetTrue),
        )
}

/// Load configuration with cascading precedence:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (`BLUEPRINT_*`, `__` between nested keys)
/// 3. Configuration file
/// 4. Defaults (lowest priority)
pub fn load_config(args: &ArgMatches) -> Result<Config> {
    load_with_env(args, None)
}

/// Same as [`load_config`], reading the environment from `env` when given.
pub fn load_with_env(args: &ArgMatches, env: Option<Map<String, String>>) -> Result<Config> {
    let config_file = args
        .get_one::<String>("config")
        .cloned()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let mut builder =
        ConfigBuilder::builder().add_source(ConfigBuilder::try_from(&Config::default())?);

    if Path::new(&config_file).exists() {
        builder = builder.add_source(File::new(&config_file, FileFormat::Toml));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    for (arg, key) in [
        ("source", "build.source"),
        ("output", "build.output"),
        ("templates", "build.templates"),
        ("host", "server.host"),
    ] {
        // Only override with CLI args that are actually defined for this command
        if let Some(value) = args.try_get_one::<String>(arg).unwrap_or(None) {
            builder = builder.set_override(key, value.as_str())?;
        }
    }
    for (arg, key) in [("port", "server.port"), ("collector-port", "server.collector_port")] {
        if let Some(port) = args.try_get_one::<u16>(arg).unwrap_or(None) {
            builder = builder.set_override(key, i64::from(*port))?;
        }
    }
    if flag(args, "strict") {
        builder = builder.set_override("build.strict", true)?;
    }
    if flag(args, "no-telemetry") {
        builder = builder.set_override("telemetry.enabled", false)?;
    }
    if flag(args, "no-versions") {
        builder = builder.set_override("versions.enabled", false)?;
    }
    if flag(args, "open") {
        builder = builder.set_override("server.open", true)?;
    }

    builder
        .build()?
        .try_deserialize()
        .with_context(|| format!("invalid configuration (file: {config_file})"))
}

fn flag(args: &ArgMatches, id: &str) -> bool {
    matches!(args.try_get_one::<bool>(id), Ok(Some(&true)))
}
