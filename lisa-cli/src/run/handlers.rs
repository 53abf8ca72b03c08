use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use lisa_assays::LisaRun;
use lisa_assays::background::BackgroundStrategy;
use lisa_assays::config::LisaConfig;
use lisa_assays::loader::{build_resolver, load_data};
use lisa_core::RunLog;
use lisa_core::utils::{get_dynamic_reader, is_skippable};

use super::cli::{METADATA_SUFFIX, RESULTS_SUFFIX};

///
/// Read a gene list: whitespace or comma separated names, `#` comments
/// and blank lines skipped. Gzip'd files are read transparently.
///
pub fn read_gene_list(path: &Path) -> Result<Vec<String>> {
    let reader = get_dynamic_reader(path)
        .with_context(|| format!("Could not open gene list {}", path.display()))?;

    let mut genes = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        genes.extend(
            line.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
        );
    }
    Ok(genes)
}

///
/// Assemble the configuration of a run: built-in defaults, then the TOML
/// file given with `--config`, then the remaining command-line options.
///
pub fn build_config(matches: &ArgMatches) -> Result<LisaConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => LisaConfig::try_from(Path::new(path))
            .with_context(|| format!("Could not read configuration {}", path))?,
        None => LisaConfig::default(),
    };

    if let Some(assays) = matches.get_many::<String>("assays") {
        config.lisa.assays = assays.cloned().collect();
    }
    if let Some(method) = matches.get_one::<String>("isd-method") {
        config.lisa.isd_method = method.parse()?;
    }
    if let Some(cores) = matches.get_one::<i64>("cores") {
        config.lisa.cores = *cores;
    }
    if let Some(n) = matches.get_one::<usize>("num-datasets-selected") {
        config.lisa.num_datasets_selected = *n;
    }
    if let Some(rp_map) = matches.get_one::<String>("rp-map") {
        config.lisa.rp_map = rp_map.clone();
    }
    if matches.contains_id("background-list") {
        config.predict.background_strategy = BackgroundStrategy::Provided;
    }
    if let Some(n) = matches.get_one::<usize>("num-background-genes") {
        config.predict.num_background_genes = *n;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.predict.seed = *seed;
    }
    if let Some(folder) = matches.get_one::<String>("cache-folder") {
        config.cache.folder = Some(PathBuf::from(folder));
    }

    config.validate()?;
    Ok(config)
}

/// Execute `lisa run`.
pub fn run_lisa(matches: &ArgMatches, verbose: bool) -> Result<()> {
    let species = matches
        .get_one::<String>("species")
        .expect("A species is required");
    let query_file = matches
        .get_one::<String>("query")
        .expect("A query gene list is required");
    let data_dir = matches
        .get_one::<String>("data-dir")
        .expect("A data directory is required");
    let prefix = matches
        .get_one::<String>("output")
        .expect("The output prefix has a default");
    let top_n = matches
        .get_one::<usize>("top-n")
        .copied()
        .unwrap_or(usize::MAX);
    let show_progress = verbose && !matches.get_flag("no-progress");

    let config = build_config(matches)?;

    let query = read_gene_list(Path::new(query_file))?;
    let background = match matches.get_one::<String>("background-list") {
        Some(path) => read_gene_list(Path::new(path))?,
        None => Vec::new(),
    };

    let resolver = build_resolver(&config.cache).context("Could not set up the RP map cache")?;
    let mut log = RunLog::new();
    let data = load_data(&resolver, &config, species, Path::new(data_dir), &mut log)
        .with_context(|| format!("Could not load {} data from {}", species, data_dir))?;

    let mut run = LisaRun::new(&config, &data)?
        .with_log(log)
        .with_progress(show_progress);
    let (results, metadata) = run.predict(&query, &background)?;

    if let Some(failed) = &metadata.failed_assay {
        log::warn!("Assay {} failed: {}", failed.assay, failed.reason);
    }

    let results_path = format!("{}{}", prefix, RESULTS_SUFFIX);
    results
        .write_delimited(&results_path, top_n)
        .with_context(|| format!("Could not write {}", results_path))?;

    let metadata_path = format!("{}{}", prefix, METADATA_SUFFIX);
    std::fs::write(&metadata_path, metadata.to_json()?)
        .with_context(|| format!("Could not write {}", metadata_path))?;

    info!("Results written to {} and {}", results_path, metadata_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    use crate::run::cli::create_run_cli;

    fn parse(args: &[&str]) -> ArgMatches {
        let mut full = vec!["run", "hg38", "genes.txt", "--data-dir", "data"];
        full.extend_from_slice(args);
        create_run_cli().try_get_matches_from(full).unwrap()
    }

    #[rstest]
    fn test_read_gene_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# query").unwrap();
        writeln!(file, "GATA1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "MYC, SPI1  TP53").unwrap();

        let genes = read_gene_list(file.path()).unwrap();
        assert_eq!(genes, vec!["GATA1", "MYC", "SPI1", "TP53"]);
    }

    #[rstest]
    fn test_defaults_without_overrides() {
        let config = build_config(&parse(&[])).unwrap();
        assert_eq!(config, LisaConfig::default());
    }

    #[rstest]
    fn test_cli_overrides() {
        let matches = parse(&[
            "--assays",
            "Direct,DNase",
            "--cores",
            "-1",
            "--seed",
            "7",
            "--rp-map",
            "enhanced_10K",
            "--background-list",
            "bg.txt",
        ]);
        let config = build_config(&matches).unwrap();

        assert_eq!(config.lisa.assays, vec!["Direct", "DNase"]);
        assert_eq!(config.lisa.cores, -1);
        assert_eq!(config.lisa.rp_map, "enhanced_10K");
        assert_eq!(config.predict.seed, 7);
        assert_eq!(config.predict.background_strategy, BackgroundStrategy::Provided);
    }

    #[rstest]
    fn test_cli_overrides_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[lisa]\ncores = 4\nnum_datasets_selected = 5\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = build_config(&parse(&["--config", &path, "--cores", "2"])).unwrap();
        assert_eq!(config.lisa.cores, 2);
        assert_eq!(config.lisa.num_datasets_selected, 5);
    }

    #[rstest]
    fn test_invalid_assay_rejected() {
        assert!(build_config(&parse(&["--assays", "Direct,Unknown"])).is_err());
    }
}
