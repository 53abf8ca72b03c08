mod resolve;
mod run;

use anyhow::Result;
use clap::{Arg, ArgAction, Command};

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "lisa";
    pub const BIN_NAME: &str = "lisa";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Estimates which transcription factors and chromatin regulators influence a set of genes.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Increase logging output; repeat for debug messages"),
        )
        .subcommand(run::cli::create_run_cli())
        .subcommand(resolve::cli::create_resolve_cli())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_target(false)
        .init();
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    let verbosity = matches.get_count("verbose");
    init_logging(verbosity);

    match matches.subcommand() {
        //
        // RUN
        //
        Some((run::cli::RUN_CMD, matches)) => {
            run::handlers::run_lisa(matches, verbosity > 0)?;
        }

        //
        // RESOLVE
        //
        Some((resolve::cli::RESOLVE_CMD, matches)) => {
            resolve::handlers::run_resolve(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }
}
