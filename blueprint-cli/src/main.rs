use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

mod cmd;
mod config;
mod watch;

fn cli() -> Command {
    Command::new("blueprint")
        .about("Compile blueprint directives into HTML, CSS and JS pages")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More log output (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(cmd::build::make_subcommand())
        .subcommand(cmd::serve::make_subcommand())
        .subcommand(cmd::tool::make_subcommand())
        .subcommand(cmd::check::make_subcommand())
}

/// Logs go to stderr so stdout stays clean for results and the tool protocol.
fn init_tracing(args: &ArgMatches) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let verbose = args.get_count("verbose");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 if args.get_flag("quiet") => EnvFilter::new("error"),
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose >= 2),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(&matches);

    match matches.subcommand() {
        Some(("build", args)) => cmd::build::execute(args),
        Some(("serve", args)) => cmd::serve::execute(args).await,
        Some(("tool", args)) => cmd::tool::execute(args).await,
        Some(("check", args)) => cmd::check::execute(args),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_global_verbosity() {
        let matches = cli()
            .try_get_matches_from(["blueprint", "build", "-vv", "landing"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "build");
        assert_eq!(args.get_count("verbose"), 2);
        assert_eq!(args.get_one::<String>("name").map(String::as_str), Some("landing"));
    }
}
