use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::warn;

use lisa_cache::{Resolution, ResourceResolver, ResourceSpec};

/// Execute `lisa resolve`.
pub fn run_resolve(matches: &ArgMatches) -> Result<()> {
    let species = matches
        .get_one::<String>("species")
        .expect("A species is required");
    let name = matches
        .get_one::<String>("name")
        .expect("The RP map name has a default");
    let version = matches
        .get_one::<String>("dataset-version")
        .expect("The dataset version has a default");

    let mut builder = ResourceResolver::builder();
    if let Some(folder) = matches.get_one::<String>("cache-folder") {
        builder = builder.with_cache_folder(PathBuf::from(folder));
    }
    if let Some(template) = matches.get_one::<String>("remote-template") {
        builder = builder.with_remote_template(template.clone());
    }
    let resolver = builder.finish().context("Could not set up the RP map cache")?;

    let spec = ResourceSpec::new(species, version, name);
    if matches.get_flag("no-fallback") {
        let path = resolver
            .resolve_exact(&spec)
            .with_context(|| format!("Could not fetch {}", spec))?;
        println!("{}", path.display());
        return Ok(());
    }

    let path = match resolver.resolve(&spec) {
        Resolution::Fallback {
            path,
            requested,
            reason,
        } => {
            warn!(
                "Could not fetch {} ({}). Using the \"{}\" map instead.",
                requested, reason, resolver.default_name
            );
            path
        }
        resolution => resolution
            .into_result()
            .with_context(|| format!("Could not resolve {}", spec))?,
    };

    println!("{}", path.display());
    Ok(())
}
