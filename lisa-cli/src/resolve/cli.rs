use clap::{Arg, ArgAction, Command};

use lisa_assays::config::{BASIC_RP_MAP, DATASET_VERSION};

pub const RESOLVE_CMD: &str = "resolve";

pub fn create_resolve_cli() -> Command {
    Command::new(RESOLVE_CMD)
        .about("Fetch an RP map into the cache and print its local path")
        .arg(
            Arg::new("species")
                .required(true)
                .value_parser(["hg38", "mm10"])
                .help("Genome of the RP map"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .short('n')
                .default_value(BASIC_RP_MAP)
                .help("RP map style, e.g. basic or enhanced_10K"),
        )
        .arg(
            Arg::new("dataset-version")
                .long("dataset-version")
                .default_value(DATASET_VERSION)
                .help("Dataset version"),
        )
        .arg(
            Arg::new("cache-folder")
                .long("cache-folder")
                .short('f')
                .help("Cache folder path"),
        )
        .arg(
            Arg::new("remote-template")
                .long("remote-template")
                .help("URL template with {species}, {version} and {name} placeholders"),
        )
        .arg(
            Arg::new("no-fallback")
                .long("no-fallback")
                .action(ArgAction::SetTrue)
                .help("Fail instead of falling back to the basic map"),
        )
}
