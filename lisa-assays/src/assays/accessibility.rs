use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};

use lisa_core::models::{FactorMetadata, RaggedProfiles, Technology};
use lisa_core::sparse::{select_columns, select_rows};
use lisa_core::{RunLog, ShapeError};

use super::{Assay, AssayKind, AssayResult, SharedResources, dense_block};
use crate::errors::AssayError;
use crate::models::{
    ChromatinModel, FittedChromatinModel, LogisticChromatinModel, SelectionModel,
    TwoStageSelectionModel,
};
use crate::stats::{mann_whitney_greater, z_scores};

/// Key of the per-factor accessibility z-scores in [AssayResult::aux].
pub const FACTOR_ACC_Z_SCORES: &str = "factor_acc_z_scores";

///
/// Models the chromatin landscape around the query genes from a handful of
/// accessibility profiles, then measures each factor's influence by
/// in-silico deletion: accessibility at the factor's binding sites is
/// removed and the drop in model score is compared between query and
/// background genes.
///
pub struct AccessibilityAssay<'a, S = TwoStageSelectionModel, C = LogisticChromatinModel> {
    technology: Technology,
    metadata: &'a FactorMetadata,
    resources: &'a SharedResources<'a>,
    selection_model: S,
    chromatin_model: C,
}

impl<'a, S: SelectionModel, C: ChromatinModel> AccessibilityAssay<'a, S, C> {
    pub fn new(
        technology: Technology,
        metadata: &'a FactorMetadata,
        resources: &'a SharedResources<'a>,
        selection_model: S,
        chromatin_model: C,
    ) -> Self {
        AccessibilityAssay {
            technology,
            metadata,
            resources,
            selection_model,
            chromatin_model,
        }
    }

    fn sample_names(&self, profiles: &RaggedProfiles, cols: &[usize]) -> Vec<String> {
        cols.iter()
            .map(|&col| {
                let id = profiles
                    .sample_ids
                    .get(col)
                    .cloned()
                    .unwrap_or_else(|| col.to_string());
                match self.metadata.get(&id) {
                    Some(record) => format!("{} ({})", id, record.factor()),
                    None => id,
                }
            })
            .collect()
    }

    /// Mean accessibility RP of every aligned factor gene over the selected samples, z-scored.
    fn factor_accessibility(&self, rp_matrix: &CsMat<f64>, selected: &[usize]) -> Result<Vec<f64>, ShapeError> {
        let factor_rows = self.resources.alignment.selected_rows();
        if factor_rows.is_empty() || selected.is_empty() {
            return Ok(vec![0.0; factor_rows.len()]);
        }
        let means = dense_block(rp_matrix, &factor_rows, selected)?
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(factor_rows.len()));
        Ok(z_scores(&means.to_vec()))
    }
}

///
/// Accessibility peaks (regions x selected samples) falling into the
/// regions bound by one factor dataset.
///
fn bound_peaks(peaks: &CsMat<f64>, bound: &[bool]) -> CsMat<f64> {
    let mut triplets = TriMat::new(peaks.shape());
    for (region, row) in peaks.outer_iterator().enumerate() {
        if bound.get(region).copied().unwrap_or(false) {
            for (col, &value) in row.iter() {
                triplets.add_triplet(region, col, value);
            }
        }
    }
    triplets.to_csr()
}

///
/// In-silico deletion for one factor dataset. Returns the p-value of the
/// score drop being larger for query genes than for background genes.
///
fn isd_p_value<F: FittedChromatinModel>(
    fitted: &F,
    features: ArrayView2<f64>,
    baseline: &Array1<f64>,
    gene_rp_map: &CsMat<f64>,
    peaks: &CsMat<f64>,
    bound: &[bool],
    num_query: usize,
) -> Result<f64, AssayError> {
    let deleted_rp: CsMat<f64> = gene_rp_map * &bound_peaks(peaks, bound);
    if deleted_rp.shape() != features.dim() {
        return Err(ShapeError::RowCountMismatch {
            expected: features.nrows(),
            got: deleted_rp.rows(),
        }
        .into());
    }

    let knocked_out: Array2<f64> = &features - &deleted_rp.to_dense();
    let effect = baseline - &fitted.score(knocked_out.view());

    let effect = effect.to_vec();
    Ok(mann_whitney_greater(&effect[..num_query], &effect[num_query..]))
}

impl<S: SelectionModel, C: ChromatinModel> Assay for AccessibilityAssay<'_, S, C> {
    fn kind(&self) -> AssayKind {
        AssayKind::Accessibility(self.technology)
    }

    fn run(&self, query: &[usize], background: &[usize], log: &mut RunLog) -> Result<AssayResult, AssayError> {
        let resources = self.resources;
        let data = resources.data;
        let accessibility = data.technology(self.technology)?;

        let genes: Vec<usize> = query.iter().chain(background).copied().collect();
        let labels: Vec<bool> = (0..genes.len()).map(|i| i < query.len()).collect();

        let rp_matrix = data.sample_rp_matrix(self.technology, resources.generate_rp_matrix)?;
        let all_samples: Vec<usize> = (0..rp_matrix.cols()).collect();
        let features = dense_block(&rp_matrix, &genes, &all_samples)?;

        let selected = log.section(&format!("Modeling {} landscape", self.technology), |log| {
            let selected = self.selection_model.select(features.view(), &labels)?;
            log.append(&format!("Selected {} datasets", selected.len()));
            Ok::<_, AssayError>(selected)
        })?;
        let selected_names = self.sample_names(&accessibility.profiles, &selected);

        let selected_features = features.select(Axis(1), &selected);
        let fitted = self.chromatin_model.fit(selected_features.view(), &labels)?;
        let baseline = fitted.score(selected_features.view());

        let num_regions = data.num_regions();
        let gene_rp_map = select_rows(&data.rp_map, &genes)?;
        let peaks = select_columns(&accessibility.profiles.to_sparse(num_regions)?, &selected)?.to_csr();

        let binding = &data.technology(resources.isd_method)?.profiles;
        let columns = resources.factor_columns()?;

        log.append(&format!(
            "Calculating {} in-silico deletion p-values for {} datasets",
            self.technology,
            columns.len()
        ));

        let bar = resources.progress_bar(columns.len(), &format!("{} ISD", self.technology));
        let p_values: BTreeMap<String, f64> = resources.pool.install(|| {
            columns
                .par_iter()
                .map(|(id, col)| -> Result<(String, f64), AssayError> {
                    let bound = binding.region_mask(*col, num_regions);
                    let p_value = isd_p_value(
                        &fitted,
                        selected_features.view(),
                        &baseline,
                        &gene_rp_map,
                        &peaks,
                        &bound,
                        query.len(),
                    )?;
                    bar.inc(1);
                    Ok((id.clone(), p_value))
                })
                .collect::<Result<BTreeMap<String, f64>, AssayError>>()
        })?;
        bar.finish_and_clear();

        let mut aux = BTreeMap::new();
        aux.insert(
            FACTOR_ACC_Z_SCORES.to_string(),
            self.factor_accessibility(&rp_matrix, &selected)?,
        );

        let hyperparameters = [
            ("selection".to_string(), self.selection_model.hyperparameters()),
            ("chromatin".to_string(), self.chromatin_model.hyperparameters()),
        ]
        .into();

        Ok(AssayResult {
            assay: self.kind().name().to_string(),
            p_values,
            aux,
            selected_datasets: selected_names,
            hyperparameters,
        })
    }
}
