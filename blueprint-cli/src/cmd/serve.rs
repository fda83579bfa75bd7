use anyhow::{Context, Result};
use blueprint_core::config::Config;
use blueprint_core::scanner::SOURCE_EXTENSION;
use blueprint_core::{Project, Versioner};
use blueprint_dev_server::{DevServer, DevServerConfig};
use clap::{Arg, ArgAction, ArgMatches, Command};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{add_output_flags, backup_watcher, print_report, project_builder, shared_versioner};
use crate::config::{add_config_args, load_config};

pub fn make_subcommand() -> Command {
    add_output_flags(add_config_args(Command::new("serve")))
        .about("Build, serve with live reload, and rebuild on changes")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on [default: 3000]")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to [default: 127.0.0.1]"),
        )
        .arg(
            Arg::new("collector-port")
                .long("collector-port")
                .value_name("PORT")
                .help("Port of the browser error collector [default: 3002]")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(ArgAction::SetTrue),
        )
}

/// Compiled pages carry the dev server reload script.
fn dev_project(
    config: &Config,
    versioner: Option<&Arc<Versioner>>,
    reload_script: &str,
) -> Result<Project> {
    Ok(project_builder(config, versioner)
        .body_script(reload_script)
        .build()?)
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let output_dir = config.build.output.clone();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("could not create {}", output_dir.display()))?;

    let server = DevServer::new(DevServerConfig::from_config(&config));
    let reload_script = server.reload_script();

    let versioner = shared_versioner(&config)?;
    let project = dev_project(&config, versioner.as_ref(), &reload_script)?;
    match project.build_all() {
        Ok(report) => print_report(&report),
        Err(e) => warn!("Initial build failed: {e}"),
    }

    let _backups = backup_watcher(&config, versioner.as_ref())?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Dev server error: {e}");
        }
    });

    let config_file = args
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_default();
    let rebuilds = Rebuilds {
        config,
        versioner,
        reload_script,
    };
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_source_files(rebuilds, config_file, project).await {
            error!("Source watcher error: {e}");
        }
    });

    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

/// What a full rebuild needs to make a fresh project.
struct Rebuilds {
    config: Config,
    versioner: Option<Arc<Versioner>>,
    reload_script: String,
}

impl Rebuilds {
    fn project(&self) -> Result<Project> {
        dev_project(&self.config, self.versioner.as_ref(), &self.reload_script)
    }
}

fn is_blueprint_source(path: &Path, source_dir: &Path) -> bool {
    path.parent() == Some(source_dir)
        && path
            .extension()
            .map(|ext| ext == SOURCE_EXTENSION)
            .unwrap_or(false)
}

/// Rebuild a changed source on its own; a changed template pack or config
/// file rebuilds everything with a fresh project.
async fn watch_source_files(rebuilds: Rebuilds, config_file: PathBuf, mut project: Project) -> Result<()> {
    let source_dir = rebuilds.config.build.source.clone();
    let templates = rebuilds.config.build.templates.clone();

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for event in events {
                    let _ = tx.blocking_send(event.path);
                }
            }
        },
    )?;

    debouncer
        .watcher()
        .watch(&source_dir, notify::RecursiveMode::NonRecursive)?;
    info!(dir = %source_dir.display(), "Watching blueprint sources");

    if let Some(dir) = templates.as_ref().filter(|dir| dir.exists()) {
        debouncer
            .watcher()
            .watch(dir, notify::RecursiveMode::Recursive)?;
        info!(dir = %dir.display(), "Watching template pack");
    }

    if config_file.exists() {
        debouncer
            .watcher()
            .watch(&config_file, notify::RecursiveMode::NonRecursive)?;
        info!(file = %config_file.display(), "Watching config file");
    }

    let abs_source_dir = source_dir.canonicalize().unwrap_or_else(|_| source_dir.clone());

    while let Some(path) = rx.recv().await {
        let abs_path = path.canonicalize().unwrap_or_else(|_| path.clone());

        if is_blueprint_source(&abs_path, &abs_source_dir) {
            if !abs_path.exists() {
                continue;
            }
            info!(path = %path.display(), "Blueprint changed");
            match project.build_path(&abs_path) {
                Ok(unit) => {
                    for diagnostic in &unit.page.diagnostics {
                        println!("  warning: {diagnostic}");
                    }
                    println!("Rebuilt {}", unit.page.page_name);
                }
                Err(e) => error!("Build error: {e}"),
            }
            continue;
        }

        if abs_path.starts_with(&abs_source_dir) {
            continue;
        }

        info!(path = %path.display(), "Templates or config changed, rebuilding everything");
        match rebuilds.project().and_then(|fresh| Ok((fresh.build_all()?, fresh))) {
            Ok((report, fresh)) => {
                print_report(&report);
                project = fresh;
            }
            Err(e) => error!("Build error: {e}"),
        }
    }

    Ok(())
}
