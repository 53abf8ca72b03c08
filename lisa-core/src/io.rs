//! Readers for the on-disk data of a species.
//!
//! A data directory holds:
//! - `genes.tsv`: `location<TAB>symbol[<TAB>alias,alias,..]`
//! - `rp_map_rows.txt`: one gene location per line, the row order of every RP map
//! - `<technology>_metadata.tsv`: header line with an `id` column and at least `factor`
//! - `<technology>_profiles.tsv`: `sample_id<TAB>region_index<TAB>value`
//! - `<technology>_rp.mtx` (optional): precomputed genes x samples RP matrix
//!
//! Every file may also be gzip'd (`.gz`). RP maps themselves are Matrix Market
//! files resolved through the cache.
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::path::Path;

use sprs::CsMat;

use crate::consts::ID_COLUMN;
use crate::errors::{CoreError, Result};
use crate::models::{
    FactorMetadata, FactorRecord, Gene, GeneSet, LisaData, RaggedProfiles, TechnologyData,
    Technology,
};
use crate::utils::{find_data_file, get_dynamic_reader, is_skippable};

pub const GENES_FILE: &str = "genes.tsv";
pub const RP_MAP_ROWS_FILE: &str = "rp_map_rows.txt";

fn parse_error(path: &Path, line: usize, reason: &str) -> CoreError {
    CoreError::ParseError {
        file: path.display().to_string(),
        line: line + 1,
        reason: reason.to_string(),
    }
}

pub fn read_gene_catalog(path: &Path) -> Result<GeneSet> {
    let reader = get_dynamic_reader(path)?;
    let mut genes = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }

        let mut fields = line.split('\t');
        let (Some(location), Some(symbol)) = (fields.next(), fields.next()) else {
            return Err(parse_error(path, line_num, "expected location and symbol"));
        };

        let aliases = fields
            .next()
            .map(|a| {
                a.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        genes.push(Gene {
            location: location.trim().to_string(),
            symbol: symbol.trim().to_string(),
            aliases,
        });
    }

    GeneSet::new(genes)
}

pub fn read_rp_map_rows(path: &Path) -> Result<Vec<String>> {
    let reader = get_dynamic_reader(path)?;
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !is_skippable(&line) {
            rows.push(line.trim().to_string());
        }
    }
    Ok(rows)
}

pub fn read_factor_metadata(path: &Path) -> Result<FactorMetadata> {
    let reader = get_dynamic_reader(path)?;
    let mut lines = reader.lines().enumerate();

    let header: Vec<String> = match lines.next() {
        Some((_, line)) => line?.split('\t').map(|h| h.trim().to_string()).collect(),
        None => return Ok(FactorMetadata::default()),
    };
    let id_col = header
        .iter()
        .position(|h| h == ID_COLUMN)
        .ok_or_else(|| CoreError::MissingColumn(ID_COLUMN.to_string(), path.display().to_string()))?;

    let mut records = Vec::new();
    for (line_num, line) in lines {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header.len() {
            return Err(parse_error(
                path,
                line_num,
                &format!("expected {} fields, got {}", header.len(), fields.len()),
            ));
        }

        let attributes: BTreeMap<String, String> = header
            .iter()
            .zip(fields.iter())
            .enumerate()
            .filter(|(i, _)| *i != id_col)
            .map(|(_, (h, v))| (h.clone(), v.trim().to_string()))
            .collect();

        records.push(FactorRecord {
            id: fields[id_col].trim().to_string(),
            attributes,
        });
    }

    FactorMetadata::new(records)
}

pub fn read_ragged_profiles(path: &Path) -> Result<RaggedProfiles> {
    let reader = get_dynamic_reader(path)?;
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut profiles = RaggedProfiles::default();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(parse_error(path, line_num, "expected sample, region and value"));
        }
        let region: usize = fields[1]
            .trim()
            .parse()
            .map_err(|_| parse_error(path, line_num, "region index is not an integer"))?;
        let value: f64 = fields[2]
            .trim()
            .parse()
            .map_err(|_| parse_error(path, line_num, "value is not a number"))?;

        let sample = fields[0].trim();
        let col = *positions.entry(sample.to_string()).or_insert_with(|| {
            profiles.sample_ids.push(sample.to_string());
            profiles.indices.push(Vec::new());
            profiles.values.push(Vec::new());
            profiles.sample_ids.len() - 1
        });
        profiles.indices[col].push(region);
        profiles.values[col].push(value);
    }

    Ok(profiles)
}

/// Read a Matrix Market file into CSR storage.
pub fn read_matrix(path: &Path) -> Result<CsMat<f64>> {
    let triplets = sprs::io::read_matrix_market::<f64, usize, _>(path)
        .map_err(|e| CoreError::MatrixRead(path.display().to_string(), e.to_string()))?;
    Ok(triplets.to_csr())
}

fn missing_file(dir: &Path, name: &str) -> CoreError {
    CoreError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{} not found in {}", name, dir.display()),
    ))
}

pub fn read_technology(dir: &Path, technology: Technology) -> Result<TechnologyData> {
    let metadata_name = format!("{}_metadata.tsv", technology);
    let profiles_name = format!("{}_profiles.tsv", technology);

    let metadata_path =
        find_data_file(dir, &metadata_name).ok_or_else(|| missing_file(dir, &metadata_name))?;
    let profiles_path =
        find_data_file(dir, &profiles_name).ok_or_else(|| missing_file(dir, &profiles_name))?;

    let rp_matrix = match find_data_file(dir, &format!("{}_rp.mtx", technology)) {
        Some(path) => Some(read_matrix(&path)?),
        None => None,
    };

    Ok(TechnologyData {
        metadata: read_factor_metadata(&metadata_path)?,
        profiles: read_ragged_profiles(&profiles_path)?,
        rp_matrix,
    })
}

///
/// Load everything a run needs from a species data directory.
///
/// # Arguments
/// - species: genome assembly name, e.g. `hg38`
/// - dir: the species data directory
/// - rp_map: path to the resolved RP map (Matrix Market)
/// - technologies: technologies to load
pub fn load_lisa_data(
    species: &str,
    dir: &Path,
    rp_map: &Path,
    technologies: &[Technology],
) -> Result<LisaData> {
    let genes_path = find_data_file(dir, GENES_FILE).ok_or_else(|| missing_file(dir, GENES_FILE))?;
    let rows_path =
        find_data_file(dir, RP_MAP_ROWS_FILE).ok_or_else(|| missing_file(dir, RP_MAP_ROWS_FILE))?;

    let mut data = LisaData::new(
        species,
        read_gene_catalog(&genes_path)?,
        read_rp_map_rows(&rows_path)?,
        read_matrix(rp_map)?,
    )?;

    for &technology in technologies {
        data = data.with_technology(technology, read_technology(dir, technology)?)?;
    }

    Ok(data)
}
