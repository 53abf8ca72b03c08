//! Query and background gene sets, as rows of the RP map.
use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use lisa_core::RunLog;
use lisa_core::models::{GeneCatalog, LisaData};

use crate::errors::{PipelineError, Result};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundStrategy {
    /// Uniform sample of the non-query genes.
    Random,
    /// A user supplied list.
    Provided,
}

/// Genes of a query or background set: RP map rows plus their symbols.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneRows {
    pub rows: Vec<usize>,
    pub symbols: Vec<String>,
}

impl GeneRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

///
/// Match user supplied names through the gene catalog and keep the ones
/// present in the RP map. Names that match nothing, or match a gene the RP
/// map lacks, are reported in `log`.
///
pub fn match_to_rows<S: AsRef<str>>(data: &LisaData, names: &[S], what: &str, log: &mut RunLog) -> GeneRows {
    let matched = data.genes.match_user_provided_genes(names);
    let row_lookup = data.row_lookup();

    let mut genes = GeneRows::default();
    for gene in matched.genes() {
        if let Some(&row) = row_lookup.get(gene.location.as_str()) {
            genes.rows.push(row);
            genes.symbols.push(gene.symbol.clone());
        }
    }

    let distinct: HashSet<String> = names
        .iter()
        .map(|name| name.as_ref().trim().to_lowercase())
        .collect();
    let dropped = distinct
        .iter()
        .filter(|name| {
            data.genes
                .find(name)
                .is_none_or(|gene| !row_lookup.contains_key(gene.location.as_str()))
        })
        .count();
    if dropped > 0 {
        log.warn(&format!(
            "{} of {} {} genes could not be matched to the RP map",
            dropped,
            distinct.len(),
            what
        ));
    }

    genes
}

///
/// Match the query and check its size against `[min, max]`.
///
pub fn match_query<S: AsRef<str>>(
    data: &LisaData,
    names: &[S],
    min: usize,
    max: usize,
    log: &mut RunLog,
) -> Result<GeneRows> {
    let query = match_to_rows(data, names, "query", log);
    if query.len() < min || query.len() > max {
        return Err(PipelineError::InvalidQuery(format!(
            "{} genes matched, between {} and {} are required",
            query.len(),
            min,
            max
        )));
    }
    log.append(&format!("Matched {} query genes", query.len()));
    Ok(query)
}

///
/// Seeded uniform sample of `num_genes` RP map rows outside the query. The
/// sample is clipped to the number of available genes and returned in row
/// order.
///
pub fn random_background(data: &LisaData, query: &GeneRows, num_genes: usize, seed: u64) -> GeneRows {
    let excluded: HashSet<usize> = query.rows.iter().copied().collect();
    let candidates: Vec<usize> = (0..data.num_genes())
        .filter(|row| !excluded.contains(row))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let amount = num_genes.min(candidates.len());
    let mut rows: Vec<usize> = sample(&mut rng, candidates.len(), amount)
        .into_iter()
        .map(|i| candidates[i])
        .collect();
    rows.sort_unstable();

    let symbols = symbols_for_rows(data, &rows);
    GeneRows { rows, symbols }
}

///
/// User supplied background with the query genes removed.
///
pub fn provided_background<S: AsRef<str>>(
    data: &LisaData,
    query: &GeneRows,
    names: &[S],
    log: &mut RunLog,
) -> Result<GeneRows> {
    let matched = match_to_rows(data, names, "background", log);
    let excluded: HashSet<usize> = query.rows.iter().copied().collect();

    let (rows, symbols): (Vec<usize>, Vec<String>) = matched
        .rows
        .into_iter()
        .zip(matched.symbols)
        .filter(|(row, _)| !excluded.contains(row))
        .unzip();

    if rows.is_empty() {
        return Err(PipelineError::InvalidBackground(
            "no background genes left after matching and removing query genes".to_string(),
        ));
    }
    Ok(GeneRows { rows, symbols })
}

/// Catalog symbol of every row, the location when the catalog lacks it.
fn symbols_for_rows(data: &LisaData, rows: &[usize]) -> Vec<String> {
    rows.iter()
        .map(|&row| {
            let location = &data.rp_map_locs[row];
            data.genes
                .find(location)
                .map(|gene| gene.symbol.clone())
                .unwrap_or_else(|| location.clone())
        })
        .collect()
}
