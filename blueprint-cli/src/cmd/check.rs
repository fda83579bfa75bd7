use anyhow::{Context, Result};
use blueprint_core::compiler::LineRole;
use clap::{Arg, ArgMatches, Command};

use super::project_builder;
use crate::config::{add_config_args, load_config};

pub fn make_subcommand() -> Command {
    add_config_args(Command::new("check"))
        .about("Show how each line of a blueprint resolves, without writing anything")
        .arg(
            Arg::new("name")
                .value_name("NAME")
                .help("Blueprint to check (`landing` or `landing.txt`)")
                .required(true),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let project = project_builder(&config, None).telemetry(None).build()?;

    let Some(name) = args.get_one::<String>("name") else {
        return Ok(());
    };
    let path = project.scanner().resolve(name);
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("could not read {}", path.display()))?;

    let compiler = project.compiler();
    for report in compiler.explain(&source)? {
        let directive = &report.outcome.directive;
        let role = match report.role {
            LineRole::Page => "page",
            LineRole::Blueprint { resolved: true } => "blueprint",
            LineRole::Body { component: true, flow: true } => "comp+flow",
            LineRole::Body { component: true, .. } => "component",
            LineRole::Body { flow: true, .. } => "flow",
            LineRole::Blueprint { resolved: false } | LineRole::Body { .. } => "unresolved",
        };

        let params = if directive.params.is_empty() {
            String::new()
        } else {
            format!(" {}", serde_json::to_string(&directive.params)?)
        };
        println!("{:>4}  {role:<10}  {}{params}", report.line, directive.base_key);
    }

    let page = compiler.compile(&source)?;
    println!();
    println!(
        "Page `{}`: {} bytes HTML, {} bytes CSS, {} bytes JS",
        page.page_name,
        page.html.len(),
        page.css.len(),
        page.js.len()
    );
    if page.diagnostics.is_empty() {
        println!("No problems found");
    }
    for diagnostic in &page.diagnostics {
        println!("warning: {diagnostic}");
    }

    Ok(())
}
