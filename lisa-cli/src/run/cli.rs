use clap::{Arg, ArgAction, Command, value_parser};

pub const RUN_CMD: &str = "run";
pub const DEFAULT_OUT_PREFIX: &str = "lisa";
pub const RESULTS_SUFFIX: &str = ".lisa.tsv";
pub const METADATA_SUFFIX: &str = ".metadata.json";

pub fn create_run_cli() -> Command {
    Command::new(RUN_CMD)
        .about("Rank regulatory factors by their influence on a gene set")
        .arg(
            Arg::new("species")
                .required(true)
                .value_parser(["hg38", "mm10"])
                .help("Genome of the query genes"),
        )
        .arg(
            Arg::new("query")
                .required(true)
                .help("File with one gene symbol or RefSeq id per line"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .short('d')
                .required(true)
                .help("Directory holding the gene catalog, RP map rows and profiles of the species"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file overriding the default configuration"),
        )
        .arg(
            Arg::new("assays")
                .long("assays")
                .short('a')
                .value_delimiter(',')
                .num_args(1..)
                .help("Assays to run, e.g. Direct,DNase,H3K27ac"),
        )
        .arg(
            Arg::new("isd-method")
                .long("isd-method")
                .value_parser(["chipseq", "motifs"])
                .help("Factor binding technology used for in-silico deletion"),
        )
        .arg(
            Arg::new("cores")
                .long("cores")
                .short('p')
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64))
                .help("Worker threads; -1 uses every core but one"),
        )
        .arg(
            Arg::new("num-datasets-selected")
                .long("num-datasets-selected")
                .value_parser(value_parser!(usize))
                .help("Accessibility samples kept by the selection model"),
        )
        .arg(
            Arg::new("background-list")
                .long("background-list")
                .short('b')
                .help("File of background genes; switches to the provided background strategy"),
        )
        .arg(
            Arg::new("num-background-genes")
                .long("num-background-genes")
                .value_parser(value_parser!(usize))
                .help("Size of the random background"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .help("Seed of the random background"),
        )
        .arg(
            Arg::new("rp-map")
                .long("rp-map")
                .help("Regulatory-potential map style, e.g. basic or enhanced_10K"),
        )
        .arg(
            Arg::new("cache-folder")
                .long("cache-folder")
                .short('f')
                .help("Cache folder for downloaded RP maps"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .default_value(DEFAULT_OUT_PREFIX)
                .help("Prefix of the output files"),
        )
        .arg(
            Arg::new("top-n")
                .long("top-n")
                .value_parser(value_parser!(usize))
                .help("Only write the best N rows"),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .action(ArgAction::SetTrue)
                .help("Hide progress bars in verbose mode"),
        )
}
