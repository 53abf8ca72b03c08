//! Assays: substitutable scoring modules.
//!
//! Every assay kind is constructed from the run's [SharedResources] and the
//! configuration, and scores the datasets of the factor-binding technology
//! for query versus background genes. New kinds extend [AssayKind] and
//! [AssayHandle].
pub mod accessibility;
pub mod direct;

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ndarray::Array2;
use rayon::ThreadPool;
use serde::Serialize;
use sprs::CsMat;

use lisa_core::models::{FactorMetadata, LisaData, Technology};
use lisa_core::sparse::dense_column;
use lisa_core::{FactorAlignment, RunLog, ShapeError};

use crate::config::LisaConfig;
use crate::errors::AssayError;
use crate::models::{LogisticChromatinModel, TwoStageSelectionModel};

pub use self::accessibility::{AccessibilityAssay, FACTOR_ACC_Z_SCORES};
pub use self::direct::DirectBindingAssay;

/// Kinds of assay, recognized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssayKind {
    /// Regulatory potential of factor binding sites.
    Direct,
    /// Chromatin accessibility model with in-silico deletion.
    Accessibility(Technology),
}

impl AssayKind {
    pub fn parse(name: &str) -> Result<Self, AssayError> {
        match name {
            "Direct" => Ok(AssayKind::Direct),
            "DNase" => Ok(AssayKind::Accessibility(Technology::DNase)),
            "H3K27ac" => Ok(AssayKind::Accessibility(Technology::H3K27ac)),
            _ => Err(AssayError::InvalidAssay(name.to_string())),
        }
    }

    ///
    /// Parse every name, then sort by name and drop duplicates. Any unknown
    /// name fails the whole list.
    ///
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, AssayError> {
        let mut kinds = names
            .iter()
            .map(|name| Self::parse(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        kinds.sort_by_key(|kind| kind.name());
        kinds.dedup();
        Ok(kinds)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AssayKind::Direct => "Direct",
            AssayKind::Accessibility(technology) => technology.as_str(),
        }
    }
}

impl Display for AssayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output of one assay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssayResult {
    pub assay: String,
    /// Factor dataset id -> p-value.
    pub p_values: BTreeMap<String, f64>,
    /// Assay defined per-factor statistics, following the alignment's selected rows.
    pub aux: BTreeMap<String, Vec<f64>>,
    /// Datasets the assay based its model on, if any.
    pub selected_datasets: Vec<String>,
    /// Model name -> hyperparameters.
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
}

///
/// Read-only resources every assay of a run shares.
///
pub struct SharedResources<'a> {
    pub data: &'a LisaData,
    pub alignment: &'a FactorAlignment,
    pub pool: &'a ThreadPool,
    pub isd_method: Technology,
    pub generate_rp_matrix: bool,
    pub show_progress: bool,
}

impl SharedResources<'_> {
    /// Metadata of the factor datasets every assay scores.
    pub fn factor_metadata(&self) -> Result<&FactorMetadata, AssayError> {
        Ok(self.data.link_metadata(self.isd_method)?)
    }

    /// Column of every factor dataset in the binding technology's profiles.
    pub fn factor_columns(&self) -> Result<Vec<(String, usize)>, AssayError> {
        let profiles = &self.data.technology(self.isd_method)?.profiles;
        self.factor_metadata()?
            .ids()
            .into_iter()
            .map(|id| match profiles.position(&id) {
                Some(col) => Ok((id, col)),
                None => Err(AssayError::MissingProfile(self.isd_method.to_string(), id)),
            })
            .collect()
    }

    pub fn progress_bar(&self, len: usize, message: &str) -> ProgressBar {
        let bar = ProgressBar::new(len as u64);
        if !self.show_progress {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) =
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(message.to_string());
        bar
    }
}

pub trait Assay {
    fn kind(&self) -> AssayKind;

    /// Score the factor datasets for query versus background RP map rows.
    fn run(&self, query: &[usize], background: &[usize], log: &mut RunLog) -> Result<AssayResult, AssayError>;
}

/// Closed set of constructed assays.
pub enum AssayHandle<'a> {
    Direct(DirectBindingAssay<'a>),
    Accessibility(AccessibilityAssay<'a>),
}

impl<'a> AssayHandle<'a> {
    pub fn build(
        kind: AssayKind,
        resources: &'a SharedResources<'a>,
        config: &LisaConfig,
    ) -> Result<Self, AssayError> {
        match kind {
            AssayKind::Direct => Ok(AssayHandle::Direct(DirectBindingAssay::new(
                resources.isd_method,
                resources.factor_metadata()?,
                resources,
            ))),
            AssayKind::Accessibility(technology) => {
                let lisa = &config.lisa;
                Ok(AssayHandle::Accessibility(AccessibilityAssay::new(
                    technology,
                    resources.data.link_metadata(technology)?,
                    resources,
                    TwoStageSelectionModel::new(
                        lisa.num_datasets_selected_anova,
                        lisa.num_datasets_selected,
                        &config.models,
                    ),
                    LogisticChromatinModel::new(&config.models),
                )))
            }
        }
    }
}

impl Assay for AssayHandle<'_> {
    fn kind(&self) -> AssayKind {
        match self {
            AssayHandle::Direct(assay) => assay.kind(),
            AssayHandle::Accessibility(assay) => assay.kind(),
        }
    }

    fn run(&self, query: &[usize], background: &[usize], log: &mut RunLog) -> Result<AssayResult, AssayError> {
        match self {
            AssayHandle::Direct(assay) => assay.run(query, background, log),
            AssayHandle::Accessibility(assay) => assay.run(query, background, log),
        }
    }
}

/// Dense `rows x cols` block of a CSC matrix.
pub(crate) fn dense_block(mat: &CsMat<f64>, rows: &[usize], cols: &[usize]) -> Result<Array2<f64>, ShapeError> {
    let mut block = Array2::zeros((rows.len(), cols.len()));
    for (j, &col) in cols.iter().enumerate() {
        for (i, value) in dense_column(mat, col, rows)?.into_iter().enumerate() {
            block[[i, j]] = value;
        }
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parse_all_sorts_and_dedups() {
        let kinds = AssayKind::parse_all(&["H3K27ac", "Direct", "DNase", "Direct"]).unwrap();
        let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["DNase", "Direct", "H3K27ac"]);
    }

    #[rstest]
    #[case(&["Direct", "Unknown"], "Unknown")]
    #[case(&["chipseq"], "chipseq")]
    #[case(&["dnase", "DNase"], "dnase")]
    fn test_invalid_assay(#[case] names: &[&str], #[case] bad: &str) {
        match AssayKind::parse_all(names) {
            Err(AssayError::InvalidAssay(name)) => assert_eq!(name, bad),
            other => panic!("expected InvalidAssay, got {:?}", other),
        }
    }
}
