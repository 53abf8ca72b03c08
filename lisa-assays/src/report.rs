//! Merging assay outputs into the results table, and run metadata.
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use lisa_core::consts::RANK_COLUMN;
use lisa_core::models::FactorMetadata;
use lisa_core::runlog::LogEntry;
use lisa_core::{FactorAlignment, Position, ResultsTable, TableError, Value};

use crate::assays::{AssayResult, FACTOR_ACC_Z_SCORES};
use crate::stats::cauchy_combination;

pub const SAMPLE_ID_COLUMN: &str = "sample_id";
pub const SUMMARY_P_VALUE_COLUMN: &str = "summary_p_value";

pub fn p_value_column(assay: &str) -> String {
    format!("{}_p_value", assay)
}

/// Column holding an auxiliary per-factor statistic of an assay.
pub fn aux_column(assay: &str, key: &str) -> String {
    match key {
        FACTOR_ACC_Z_SCORES => format!("{}_factor_accessibility_z_score", assay),
        _ => format!("{}_{}", assay, key),
    }
}

/// Column of a metadata attribute, prefixed with `metadata_` while it clashes with a generated column.
fn attribute_column(attribute: &str, reserved: &HashSet<String>) -> String {
    let mut name = attribute.to_string();
    while reserved.contains(&name) {
        name = format!("metadata_{}", name);
    }
    name
}

///
/// Build the results table of a run.
///
/// One row per factor dataset in `metadata`: `sample_id`, the metadata
/// attributes (`factor` first, the rest alphabetical), a p-value column per
/// assay, the assays' per-factor statistics looked up by factor label through
/// `alignment`, and `summary_p_value`. Missing values are `NA`. Rows are
/// sorted by `summary_p_value` and ranked. Attributes named like a generated
/// column get a `metadata_` prefix.
///
pub fn format_results(
    metadata: &FactorMetadata,
    alignment: &FactorAlignment,
    results: &[AssayResult],
) -> Result<ResultsTable, TableError> {
    let ids = metadata.ids();
    let factors = metadata.factors();

    let mut table = ResultsTable::default();
    table.add_column(
        SAMPLE_ID_COLUMN,
        ids.iter().map(|id| Value::from(id.as_str())).collect(),
        Position::End,
    )?;

    let mut reserved: HashSet<String> = [SAMPLE_ID_COLUMN, RANK_COLUMN, SUMMARY_P_VALUE_COLUMN]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for result in results {
        reserved.insert(p_value_column(&result.assay));
        reserved.extend(result.aux.keys().map(|key| aux_column(&result.assay, key)));
    }

    for attribute in metadata.attribute_names() {
        let values = metadata
            .records()
            .iter()
            .map(|record| record.attributes.get(&attribute).cloned().into())
            .collect();
        let column = attribute_column(&attribute, &reserved);
        table.add_column(&column, values, Position::End)?;
        reserved.insert(column);
    }

    let mut p_value_columns = Vec::with_capacity(results.len());
    for result in results {
        let column = p_value_column(&result.assay);
        let values = ids
            .iter()
            .map(|id| result.p_values.get(id).copied().into())
            .collect();
        table.add_column(&column, values, Position::End)?;
        p_value_columns.push(column);
    }

    for result in results {
        for (key, statistics) in result.aux.iter() {
            let by_factor = alignment.label_values(statistics);
            let values = factors
                .iter()
                .map(|factor| by_factor.get(factor).copied().into())
                .collect();
            table.add_column(&aux_column(&result.assay, key), values, Position::End)?;
        }
    }

    let p_value_cols = p_value_columns
        .iter()
        .map(|name| table.get_colnum(name))
        .collect::<Result<Vec<_>, _>>()?;
    let summary: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| {
            let p_values: Vec<f64> = p_value_cols.iter().filter_map(|&col| row[col].as_f64()).collect();
            cauchy_combination(&p_values).into()
        })
        .collect();
    table.add_column(SUMMARY_P_VALUE_COLUMN, summary, Position::End)?;

    table.sort_by(SUMMARY_P_VALUE_COLUMN, true)?;
    Ok(table)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAssay {
    pub assay: String,
    pub reason: String,
}

/// Everything about a run besides its results table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetadata {
    pub species: String,
    pub query_symbols: Vec<String>,
    pub background_symbols: Vec<String>,
    pub assays: Vec<String>,
    pub selected_datasets: BTreeMap<String, Vec<String>>,
    pub failed_assay: Option<FailedAssay>,
    /// Assay -> model name -> hyperparameters.
    pub hyperparameters: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    pub workers: usize,
    pub log: Vec<LogEntry>,
}

impl RunMetadata {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
