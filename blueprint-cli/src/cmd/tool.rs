use anyhow::{Context, Result};
use blueprint_core::workspace::tools::{self, TOOL_NAMES};
use blueprint_core::Workspace;
use blueprint_dev_server::{CollectorConfig, ErrorCollector};
use clap::{ArgMatches, Command};
use tracing::{info, warn};

use super::{add_output_flags, backup_watcher, project_builder, shared_versioner};
use crate::config::{add_config_args, load_config};

pub fn make_subcommand() -> Command {
    add_output_flags(add_config_args(Command::new("tool")))
        .about("Serve workspace tools as JSON lines on stdin/stdout")
        .long_about(
            "Reads one request per line, {\"name\": ..., \"arguments\": {...}}, and \
             answers each with {\"content\": [{\"type\": \"text\", \"text\": ...}], \"isError\": ...}. \
             Tools: read, search, write, execute, read_errors. While it runs, browser errors \
             from the generated pages are collected for read_errors.",
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let base = std::env::current_dir().context("could not read the working directory")?;

    std::fs::create_dir_all(&config.build.output).with_context(|| {
        format!("could not create {}", config.build.output.display())
    })?;

    let versioner = shared_versioner(&config)?;
    let project = project_builder(&config, versioner.as_ref()).build()?;
    let _watcher = backup_watcher(&config, versioner.as_ref())?;

    if config.telemetry.enabled {
        let collector = ErrorCollector::new(CollectorConfig::for_output(
            &config.server.host,
            config.server.collector_port,
            &config.build.output,
        ));
        tokio::spawn(async move {
            // another blueprint process may already be collecting on this port
            if let Err(e) = collector.run().await {
                warn!("Error collector not started: {e}");
            }
        });
    }

    let workspace = Workspace::new(&base, project);
    info!(base = %base.display(), tools = ?TOOL_NAMES, "Tool server ready");

    tokio::task::block_in_place(|| {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        tools::serve(&workspace, stdin.lock(), stdout.lock())
    })?;

    Ok(())
}
