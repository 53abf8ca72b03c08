use std::collections::BTreeMap;

use rayon::prelude::*;

use lisa_core::RunLog;
use lisa_core::models::{FactorMetadata, Technology};
use lisa_core::sparse::dense_column;

use super::{Assay, AssayKind, AssayResult, SharedResources};
use crate::errors::AssayError;
use crate::stats::mann_whitney_greater;

///
/// Scores every factor dataset by the regulatory potential of its binding
/// sites: the dataset's RP for query genes is tested against the RP for
/// background genes.
///
pub struct DirectBindingAssay<'a> {
    technology: Technology,
    metadata: &'a FactorMetadata,
    resources: &'a SharedResources<'a>,
}

impl<'a> DirectBindingAssay<'a> {
    pub fn new(
        technology: Technology,
        metadata: &'a FactorMetadata,
        resources: &'a SharedResources<'a>,
    ) -> Self {
        DirectBindingAssay {
            technology,
            metadata,
            resources,
        }
    }
}

impl Assay for DirectBindingAssay<'_> {
    fn kind(&self) -> AssayKind {
        AssayKind::Direct
    }

    fn run(&self, query: &[usize], background: &[usize], log: &mut RunLog) -> Result<AssayResult, AssayError> {
        let resources = self.resources;
        let rp_matrix = resources
            .data
            .sample_rp_matrix(self.technology, resources.generate_rp_matrix)?;
        let columns = resources.factor_columns()?;

        log.append(&format!(
            "Calculating {} peak-RP p-values for {} datasets",
            self.technology,
            self.metadata.len()
        ));

        let bar = resources.progress_bar(columns.len(), "Direct");
        let p_values: BTreeMap<String, f64> = resources.pool.install(|| {
            columns
                .par_iter()
                .map(|(id, col)| -> Result<(String, f64), AssayError> {
                    let query_rp = dense_column(&rp_matrix, *col, query)?;
                    let background_rp = dense_column(&rp_matrix, *col, background)?;
                    bar.inc(1);
                    Ok((id.clone(), mann_whitney_greater(&query_rp, &background_rp)))
                })
                .collect::<Result<BTreeMap<String, f64>, AssayError>>()
        })?;
        bar.finish_and_clear();

        Ok(AssayResult {
            assay: self.kind().name().to_string(),
            p_values,
            ..Default::default()
        })
    }
}
