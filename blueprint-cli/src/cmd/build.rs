use anyhow::{bail, Result};
use blueprint_core::{BatchReport, UnitOutcome};
use clap::{Arg, ArgMatches, Command};

use super::{add_output_flags, print_report, project_builder, shared_versioner};
use crate::config::{add_config_args, load_config};

pub fn make_subcommand() -> Command {
    add_output_flags(add_config_args(Command::new("build")))
        .about("Compile blueprint sources into HTML, CSS and JS")
        .arg(
            Arg::new("name")
                .value_name("NAME")
                .help("Blueprint to build (`landing` or `landing.txt`); every source when omitted"),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let versioner = shared_versioner(&config)?;
    let project = project_builder(&config, versioner.as_ref()).build()?;

    let report = match args.get_one::<String>("name") {
        Some(name) => BatchReport {
            units: vec![UnitOutcome {
                source: project.scanner().resolve(name),
                result: project.build_one(name),
            }],
        },
        None => project.build_all()?,
    };

    print_report(&report);

    if !report.is_success() {
        bail!("{} of {} blueprints failed", report.failed(), report.units.len());
    }
    println!(
        "Built {} blueprint(s) into {}",
        report.units.len(),
        project.output_dir().display()
    );

    Ok(())
}
