//! Run configuration.
//!
//! A [LisaConfig] is assembled once per run from the built-in defaults, an
//! optional TOML file and command-line overrides, validated, and then passed
//! by reference to every component.
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lisa_core::models::Technology;

use crate::assays::AssayKind;
use crate::background::BackgroundStrategy;
use crate::errors::ConfigError;

pub const DEFAULT_ASSAYS: [&str; 3] = ["Direct", "H3K27ac", "DNase"];
pub const DEFAULT_RP_MAP_STYLES: [&str; 2] = ["basic", "enhanced_10K"];
pub const BASIC_RP_MAP: &str = "basic";
pub const DATASET_VERSION: &str = "2.0";

pub const MAX_DATASETS_SELECTED: usize = 25;
pub const MAX_DATASETS_SELECTED_ANOVA: usize = 500;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LisaParams {
    pub assays: Vec<String>,
    pub isd_method: Technology,
    /// `-1` uses every core but one.
    pub cores: i64,
    pub num_datasets_selected: usize,
    pub num_datasets_selected_anova: usize,
    pub rp_map: String,
    pub rp_map_styles: Vec<String>,
    pub dataset_version: String,
}

impl Default for LisaParams {
    fn default() -> Self {
        LisaParams {
            assays: DEFAULT_ASSAYS.iter().map(|s| s.to_string()).collect(),
            isd_method: Technology::ChipSeq,
            cores: 1,
            num_datasets_selected: 10,
            num_datasets_selected_anova: 200,
            rp_map: BASIC_RP_MAP.to_string(),
            rp_map_styles: DEFAULT_RP_MAP_STYLES.iter().map(|s| s.to_string()).collect(),
            dataset_version: DATASET_VERSION.to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PredictParams {
    pub background_strategy: BackgroundStrategy,
    pub num_background_genes: usize,
    pub seed: u64,
    pub min_query_genes: usize,
    pub max_query_genes: usize,
}

impl Default for PredictParams {
    fn default() -> Self {
        PredictParams {
            background_strategy: BackgroundStrategy::Random,
            num_background_genes: 3000,
            seed: 2556,
            min_query_genes: 20,
            max_query_genes: 500,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L2,
}

/// Hyperparameters of the chromatin model. Opaque to the pipeline.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelParams {
    pub c_grid: Vec<f64>,
    pub penalty: Penalty,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Every n-th training gene is held out when choosing C.
    pub holdout_every: usize,
}

impl Default for ModelParams {
    fn default() -> Self {
        // 10^-2 .. 10^4 in half-decade steps
        let c_grid = (0..=12).map(|i| 10f64.powf(-2.0 + 0.5 * i as f64)).collect();
        ModelParams {
            c_grid,
            penalty: Penalty::L2,
            max_iter: 200,
            learning_rate: 0.5,
            holdout_every: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheParams {
    /// Falls back to `$LISA_CACHE`, then `~/.lisa_cache/`.
    pub folder: Option<PathBuf>,
    pub remote_template: Option<String>,
    pub default_rp_map: String,
}

impl Default for CacheParams {
    fn default() -> Self {
        CacheParams {
            folder: None,
            remote_template: None,
            default_rp_map: BASIC_RP_MAP.to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LisaConfig {
    pub lisa: LisaParams,
    pub predict: PredictParams,
    pub models: ModelParams,
    pub cache: CacheParams,
}

impl TryFrom<&Path> for LisaConfig {
    type Error = ConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config = toml::from_str(&toml_str)?;
        Ok(config)
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidValue { field, reason }
}

impl LisaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lisa = &self.lisa;

        if lisa.assays.is_empty() {
            return Err(ConfigError::NoAssays);
        }
        AssayKind::parse_all(&lisa.assays)?;

        if lisa.num_datasets_selected == 0 || lisa.num_datasets_selected_anova == 0 {
            return Err(invalid(
                "num_datasets_selected",
                "number of datasets selected must be positive".to_string(),
            ));
        }
        if lisa.num_datasets_selected >= MAX_DATASETS_SELECTED {
            return Err(invalid(
                "num_datasets_selected",
                format!("must be below {}", MAX_DATASETS_SELECTED),
            ));
        }
        if lisa.num_datasets_selected_anova <= lisa.num_datasets_selected {
            return Err(invalid(
                "num_datasets_selected_anova",
                "anova must select more datasets than the regression model".to_string(),
            ));
        }
        if lisa.num_datasets_selected_anova >= MAX_DATASETS_SELECTED_ANOVA {
            return Err(invalid(
                "num_datasets_selected_anova",
                format!("must be below {}", MAX_DATASETS_SELECTED_ANOVA),
            ));
        }
        if !lisa.rp_map_styles.contains(&lisa.rp_map) {
            return Err(ConfigError::UnknownRpMap {
                name: lisa.rp_map.clone(),
                styles: lisa.rp_map_styles.join(","),
            });
        }
        if lisa.cores < -1 {
            return Err(invalid("cores", format!("{} is below -1", lisa.cores)));
        }
        if !lisa.isd_method.is_binding() {
            return Err(invalid(
                "isd_method",
                format!("{} does not mark factor binding", lisa.isd_method),
            ));
        }

        let predict = &self.predict;
        if predict.min_query_genes > predict.max_query_genes {
            return Err(invalid(
                "min_query_genes",
                "must not exceed max_query_genes".to_string(),
            ));
        }

        if self.models.c_grid.is_empty() || self.models.c_grid.iter().any(|c| *c <= 0.0) {
            return Err(invalid("c_grid", "must hold positive values".to_string()));
        }
        if self.models.holdout_every < 2 {
            return Err(invalid("holdout_every", "must be at least 2".to_string()));
        }

        Ok(())
    }

    /// Sample RP matrices are generated from the RP map for any style but `basic`.
    pub fn generate_rp_matrix(&self) -> bool {
        self.lisa.rp_map != BASIC_RP_MAP
    }

    /// Technologies whose data the requested assays need.
    pub fn required_technologies(&self) -> Result<Vec<Technology>, ConfigError> {
        let mut technologies = vec![self.lisa.isd_method];
        for kind in AssayKind::parse_all(&self.lisa.assays)? {
            if let AssayKind::Accessibility(technology) = kind
                && !technologies.contains(&technology)
            {
                technologies.push(technology);
            }
        }
        Ok(technologies)
    }
}
