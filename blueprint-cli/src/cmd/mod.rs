pub mod build;
pub mod check;
pub mod serve;
pub mod tool;

use anyhow::{Context, Result};
use blueprint_core::config::Config;
use blueprint_core::{BatchReport, ParseMode, ProjectBuilder, Versioner};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;

use crate::watch::BackupWatcher;

pub fn add_output_flags(command: Command) -> Command {
    command
        .arg(
            Arg::new("no-telemetry")
                .long("no-telemetry")
                .help("Do not add the browser error reporting script")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-versions")
                .long("no-versions")
                .help("Do not keep backup copies of written files")
                .action(ArgAction::SetTrue),
        )
}

/// Backups are rooted at the working directory.
fn versioner(config: &Config) -> Result<Versioner> {
    let root = std::env::current_dir().context("could not read the working directory")?;
    Ok(Versioner::new(root)
        .versions_dir(&config.versions.dir)
        .ledger(&config.versions.ledger))
}

/// The one versioner of a command run, if versioning is on. Every writer and
/// watcher of the run must share it so the ledger has a single lock.
pub fn shared_versioner(config: &Config) -> Result<Option<Arc<Versioner>>> {
    if !config.versions.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(versioner(config)?)))
}

/// Project settings shared by every subcommand that compiles.
pub fn project_builder(config: &Config, versioner: Option<&Arc<Versioner>>) -> ProjectBuilder {
    let mode = if config.build.strict {
        ParseMode::Strict
    } else {
        ParseMode::Lenient
    };

    let mut builder = ProjectBuilder::new()
        .source_dir(&config.build.source)
        .output_dir(&config.build.output)
        .mode(mode)
        .telemetry(config.telemetry.endpoint())
        .limits(config.limits);

    if let Some(templates) = &config.build.templates {
        builder = builder.templates(templates);
    }
    if let Some(versioner) = versioner {
        builder = builder.backup(versioner.clone());
    }

    builder
}

/// Start backing up the watched directories with the run's versioner.
pub fn backup_watcher(config: &Config, versioner: Option<&Arc<Versioner>>) -> Result<Option<BackupWatcher>> {
    versioner
        .map(|versioner| BackupWatcher::start(Arc::clone(versioner), &watched_dirs(config)))
        .transpose()
}

/// Directories whose files are backed up while a long-running command is up.
pub fn watched_dirs(config: &Config) -> Vec<PathBuf> {
    [&config.build.source, &config.build.output]
        .into_iter()
        .filter(|dir| dir.is_dir())
        .cloned()
        .collect()
}

pub fn print_report(report: &BatchReport) {
    for unit in &report.units {
        match &unit.result {
            Ok(built) => {
                let files: Vec<String> = built
                    .write
                    .written
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                println!("{} -> {}", unit.source.display(), files.join(", "));
                for kind in &built.write.skipped {
                    println!("  skipped {kind} (no content)");
                }
                for diagnostic in &built.page.diagnostics {
                    println!("  warning: {diagnostic}");
                }
            }
            Err(e) => println!("{}: error: {e}", unit.source.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::BackupSink;
    use tempfile::TempDir;

    #[test]
    fn test_writer_and_watcher_share_one_ledger() {
        let dir = TempDir::new().unwrap();
        let sources = dir.path().join("blueprints");
        std::fs::create_dir_all(&sources).unwrap();
        std::fs::write(sources.join("demo.txt"), "page:demo;\nblueprint:test/blank;\n").unwrap();

        let mut config = Config::default();
        config.build.source = sources;
        config.build.output = dir.path().join("sandbox");
        config.telemetry.enabled = false;

        let versioner = Arc::new(Versioner::new(dir.path()));
        let project = project_builder(&config, Some(&versioner)).build().unwrap();
        let built = project.build_one("demo").unwrap();
        assert_eq!(built.write.backed_up.len(), 2);

        // the watcher sees the same files right after they are written
        for path in &built.write.written {
            let content = std::fs::read(path).unwrap();
            assert!(!versioner.check_and_backup(path, &content).unwrap());
        }

        let ledger = std::fs::read_to_string(versioner.ledger_path()).unwrap();
        assert_eq!(ledger.lines().count(), 2);
    }

    #[test]
    fn test_no_versioner_when_disabled() {
        let mut config = Config::default();
        config.versions.enabled = false;
        assert!(shared_versioner(&config).unwrap().is_none());
        assert!(backup_watcher(&config, None).unwrap().is_none());
    }
}
