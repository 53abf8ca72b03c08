//! Selection and chromatin models used by the accessibility assay.
//!
//! The pipeline only hands these models numeric matrices (genes x samples)
//! and binary labels (query or background) and reads numeric scores back.
//! Their hyperparameters are serializable so that they can be reported.
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::Serialize;

use crate::config::{ModelParams, Penalty};
use crate::errors::AssayError;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Column means and standard deviations, with zero deviations replaced by one.
fn column_moments(features: ArrayView2<f64>) -> (Array1<f64>, Array1<f64>) {
    let means = features
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(features.ncols()));
    let stds = features
        .std_axis(Axis(0), 0.0)
        .mapv(|s| if s > 0.0 { s } else { 1.0 });
    (means, stds)
}

fn standardize(features: ArrayView2<f64>, means: &Array1<f64>, stds: &Array1<f64>) -> Array2<f64> {
    (&features - means) / stds
}

///
/// L2-penalized logistic regression fit with full-batch gradient descent on
/// `0.5 * |w|^2 / C + sum(logloss)`, scaled by the number of samples.
///
fn fit_logistic(
    features: ArrayView2<f64>,
    labels: &Array1<f64>,
    c: f64,
    max_iter: usize,
    learning_rate: f64,
) -> (Array1<f64>, f64) {
    let n = features.nrows().max(1) as f64;
    let mut weights = Array1::<f64>::zeros(features.ncols());
    let mut intercept = 0.0;

    for _ in 0..max_iter {
        let scores = features.dot(&weights) + intercept;
        let residuals = scores.mapv(sigmoid) - labels;

        let grad_w = features.t().dot(&residuals) / n + &weights / (c * n);
        let grad_b = residuals.sum() / n;

        weights.scaled_add(-learning_rate, &grad_w);
        intercept -= learning_rate * grad_b;
    }

    (weights, intercept)
}

fn log_loss(scores: &Array1<f64>, labels: &Array1<f64>) -> f64 {
    let eps = 1e-12;
    scores
        .iter()
        .zip(labels.iter())
        .map(|(&s, &y)| {
            let p = sigmoid(s).clamp(eps, 1.0 - eps);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / scores.len().max(1) as f64
}

fn to_labels(labels: &[bool]) -> Array1<f64> {
    labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect()
}

fn check_shape(features: ArrayView2<f64>, labels: &[bool]) -> Result<(), AssayError> {
    if features.nrows() != labels.len() {
        return Err(AssayError::Model(format!(
            "{} feature rows but {} labels",
            features.nrows(),
            labels.len()
        )));
    }
    if !labels.iter().any(|&l| l) || labels.iter().all(|&l| l) {
        return Err(AssayError::Model(
            "labels need both query and background genes".to_string(),
        ));
    }
    Ok(())
}

///
/// Picks the samples (feature columns) that best separate query from
/// background genes.
///
pub trait SelectionModel {
    /// Selected columns, most informative first.
    fn select(&self, features: ArrayView2<f64>, labels: &[bool]) -> Result<Vec<usize>, AssayError>;

    fn hyperparameters(&self) -> serde_json::Value;
}

///
/// Scores genes from the accessibility of the selected samples.
///
pub trait ChromatinModel {
    type Fitted: FittedChromatinModel;

    fn fit(&self, features: ArrayView2<f64>, labels: &[bool]) -> Result<Self::Fitted, AssayError>;

    fn hyperparameters(&self) -> serde_json::Value;
}

pub trait FittedChromatinModel: Sync {
    /// Decision function, one score per row of `features`.
    fn score(&self, features: ArrayView2<f64>) -> Array1<f64>;
}

///
/// Two-stage sample selection. The first stage keeps the `num_anova` samples
/// with the largest two-group F statistic, the second stage fits a logistic
/// regression on those and keeps the `num_selected` samples with the largest
/// positive coefficients.
///
#[derive(Debug, Clone, Serialize)]
pub struct TwoStageSelectionModel {
    pub num_anova: usize,
    pub num_selected: usize,
    pub max_iter: usize,
    pub learning_rate: f64,
}

impl TwoStageSelectionModel {
    pub fn new(num_anova: usize, num_selected: usize, params: &ModelParams) -> Self {
        TwoStageSelectionModel {
            num_anova,
            num_selected,
            max_iter: params.max_iter,
            learning_rate: params.learning_rate,
        }
    }

    /// Two-group one-way ANOVA F statistic of every column.
    fn f_statistics(features: ArrayView2<f64>, labels: &[bool]) -> Vec<f64> {
        let n = labels.len() as f64;
        let n_query = labels.iter().filter(|&&l| l).count() as f64;
        let n_background = n - n_query;

        features
            .axis_iter(Axis(1))
            .map(|column| {
                let (mut sum_q, mut sum_b) = (0.0, 0.0);
                for (&v, &l) in column.iter().zip(labels) {
                    if l { sum_q += v } else { sum_b += v }
                }
                let (mean_q, mean_b) = (sum_q / n_query, sum_b / n_background);
                let grand = (sum_q + sum_b) / n;

                let between = n_query * (mean_q - grand).powi(2) + n_background * (mean_b - grand).powi(2);
                let within: f64 = column
                    .iter()
                    .zip(labels)
                    .map(|(&v, &l)| (v - if l { mean_q } else { mean_b }).powi(2))
                    .sum();

                match within / (n - 2.0) {
                    w if w > 0.0 => between / w,
                    _ => 0.0,
                }
            })
            .collect()
    }
}

fn top_k_by(scores: &[f64], candidates: &[usize], k: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, usize)> = candidates.iter().copied().enumerate().collect();
    // stable on ties: earlier candidates win
    ranked.sort_by(|a, b| scores[b.0].total_cmp(&scores[a.0]));
    ranked.into_iter().take(k).map(|(_, col)| col).collect()
}

impl SelectionModel for TwoStageSelectionModel {
    fn select(&self, features: ArrayView2<f64>, labels: &[bool]) -> Result<Vec<usize>, AssayError> {
        check_shape(features, labels)?;

        let all: Vec<usize> = (0..features.ncols()).collect();
        let f_stats = Self::f_statistics(features, labels);
        let anova_selected = top_k_by(&f_stats, &all, self.num_anova);

        let subset = features.select(Axis(1), &anova_selected);
        let (means, stds) = column_moments(subset.view());
        let standardized = standardize(subset.view(), &means, &stds);

        let (weights, _) = fit_logistic(
            standardized.view(),
            &to_labels(labels),
            1.0,
            self.max_iter,
            self.learning_rate,
        );

        Ok(top_k_by(
            weights.as_slice().unwrap_or(&[]),
            &anova_selected,
            self.num_selected,
        ))
    }

    fn hyperparameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

///
/// Logistic regression on standardized sample accessibility. `C` is chosen
/// from the grid on a held-out slice of the genes (every `holdout_every`-th
/// row), then the model is refit on all genes.
///
#[derive(Debug, Clone, Serialize)]
pub struct LogisticChromatinModel {
    pub c_grid: Vec<f64>,
    pub penalty: Penalty,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub holdout_every: usize,
}

impl LogisticChromatinModel {
    pub fn new(params: &ModelParams) -> Self {
        LogisticChromatinModel {
            c_grid: params.c_grid.clone(),
            penalty: params.penalty,
            max_iter: params.max_iter,
            learning_rate: params.learning_rate,
            holdout_every: params.holdout_every,
        }
    }

    fn choose_c(&self, standardized: ArrayView2<f64>, labels: &Array1<f64>) -> f64 {
        let (train, test): (Vec<usize>, Vec<usize>) =
            (0..labels.len()).partition(|i| i % self.holdout_every != 0);

        let x_train = standardized.select(Axis(0), &train);
        let y_train = labels.select(Axis(0), &train);
        let x_test = standardized.select(Axis(0), &test);
        let y_test = labels.select(Axis(0), &test);

        let mut best = (f64::INFINITY, self.c_grid.first().copied().unwrap_or(1.0));
        for &c in &self.c_grid {
            let (weights, intercept) =
                fit_logistic(x_train.view(), &y_train, c, self.max_iter, self.learning_rate);
            let loss = log_loss(&(x_test.dot(&weights) + intercept), &y_test);
            if loss < best.0 {
                best = (loss, c);
            }
        }
        best.1
    }
}

#[derive(Debug, Clone)]
pub struct FittedLogisticModel {
    pub c: f64,
    pub weights: Array1<f64>,
    pub intercept: f64,
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl FittedChromatinModel for FittedLogisticModel {
    fn score(&self, features: ArrayView2<f64>) -> Array1<f64> {
        standardize(features, &self.means, &self.stds).dot(&self.weights) + self.intercept
    }
}

impl ChromatinModel for LogisticChromatinModel {
    type Fitted = FittedLogisticModel;

    fn fit(&self, features: ArrayView2<f64>, labels: &[bool]) -> Result<FittedLogisticModel, AssayError> {
        check_shape(features, labels)?;
        if features.ncols() == 0 {
            return Err(AssayError::Model("no samples to fit".to_string()));
        }

        let (means, stds) = column_moments(features);
        let standardized = standardize(features, &means, &stds);
        let y = to_labels(labels);

        let c = self.choose_c(standardized.view(), &y);
        let (weights, intercept) =
            fit_logistic(standardized.view(), &y, c, self.max_iter, self.learning_rate);

        Ok(FittedLogisticModel {
            c,
            weights,
            intercept,
            means,
            stds,
        })
    }

    fn hyperparameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::s;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn head(features: &Array2<f64>, n: usize) -> Array2<f64> {
        features.slice(s![..n, ..]).to_owned()
    }

    /// 40 genes x 4 samples. Sample 1 separates query genes, the others are noise.
    #[fixture]
    fn data() -> (Array2<f64>, Vec<bool>) {
        let labels: Vec<bool> = (0..40).map(|i| i < 12).collect();
        let features = Array2::from_shape_fn((40, 4), |(i, j)| {
            let noise = ((i * 7 + j * 13) % 10) as f64 / 10.0;
            match (j, labels[i]) {
                (1, true) => 3.0 + noise,
                (1, false) => noise,
                _ => noise,
            }
        });
        (features, labels)
    }

    #[rstest]
    fn test_selection_prefers_informative_sample(data: (Array2<f64>, Vec<bool>)) {
        let (features, labels) = data;
        let model = TwoStageSelectionModel::new(3, 2, &ModelParams::default());
        let selected = model.select(features.view(), &labels).unwrap();

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0], 1);
    }

    #[rstest]
    fn test_chromatin_model_ranks_query_higher(data: (Array2<f64>, Vec<bool>)) {
        let (features, labels) = data;
        let model = LogisticChromatinModel::new(&ModelParams::default());
        let fitted = model.fit(features.view(), &labels).unwrap();

        assert!(model.c_grid.contains(&fitted.c));

        let scores = fitted.score(features.view());
        let min_query = (0..12).map(|i| scores[i]).fold(f64::INFINITY, f64::min);
        let max_background = (12..40).map(|i| scores[i]).fold(f64::NEG_INFINITY, f64::max);
        assert!(min_query > max_background);
    }

    #[rstest]
    fn test_labels_checked(data: (Array2<f64>, Vec<bool>)) {
        let (features, _) = data;
        let model = LogisticChromatinModel::new(&ModelParams::default());
        assert!(model.fit(head(&features, 3).view(), &[true, true, true]).is_err());
        assert!(model.fit(features.view(), &[true, false]).is_err());
    }

    #[rstest]
    fn test_hyperparameters_serialize() {
        let model = TwoStageSelectionModel::new(200, 10, &ModelParams::default());
        let params = model.hyperparameters();
        assert_eq!(params["num_anova"], 200);
        assert_eq!(params["num_selected"], 10);

        let model = LogisticChromatinModel::new(&ModelParams::default());
        assert_eq!(model.hyperparameters()["penalty"], "l2");
    }
}
