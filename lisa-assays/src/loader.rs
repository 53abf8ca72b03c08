//! Resolving and loading the data of a run.
use std::path::Path;

use lisa_cache::errors::ResolverError;
use lisa_cache::{ResourceResolver, ResourceResolverBuilder, ResourceSpec, Transport};
use lisa_core::RunLog;
use lisa_core::io::load_lisa_data;
use lisa_core::models::LisaData;

use crate::config::{CacheParams, LisaConfig};
use crate::errors::Result;

/// Resolver configured from the cache section, fetching over HTTP.
pub fn build_resolver(cache: &CacheParams) -> std::result::Result<ResourceResolver, ResolverError> {
    let mut builder = ResourceResolverBuilder::new().with_default_name(cache.default_rp_map.clone());
    if let Some(folder) = &cache.folder {
        builder = builder.with_cache_folder(folder.clone());
    }
    if let Some(template) = &cache.remote_template {
        builder = builder.with_remote_template(template.clone());
    }
    builder.finish()
}

/// The RP map a configuration asks for.
pub fn rp_map_spec(config: &LisaConfig, species: &str) -> ResourceSpec {
    ResourceSpec::new(species, &config.lisa.dataset_version, &config.lisa.rp_map)
}

///
/// Resolve the RP map through `resolver` and load the species data
/// directory, with the technologies the configured assays need.
///
pub fn load_data<T: Transport>(
    resolver: &ResourceResolver<T>,
    config: &LisaConfig,
    species: &str,
    data_dir: &Path,
    log: &mut RunLog,
) -> Result<LisaData> {
    log.section("Loading data", |log| -> Result<LisaData> {
        let rp_map_path = resolver.resolve_logged(&rp_map_spec(config, species), log)?;
        log.append(&format!("RP map: {}", rp_map_path.display()));

        let technologies = config.required_technologies()?;
        let data = load_lisa_data(species, data_dir, &rp_map_path, &technologies)?;
        log.append(&format!(
            "Loaded {} genes x {} regions for {} technologies",
            data.num_genes(),
            data.num_regions(),
            technologies.len()
        ));
        Ok(data)
    })
}
