//! Test statistics shared by the assays.
use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

/// Survival function of the standard normal distribution.
fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Ranks starting at 1, ties get their average rank. Also returns the tie
/// correction term `sum(t^3 - t)` over groups of tied values.
fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        let t = (end - start) as f64;
        ties += t * t * t - t;
        start = end;
    }

    (ranks, ties)
}

///
/// One-sided Mann-Whitney U test of `x` being stochastically greater than
/// `y`, using the tie-corrected normal approximation with continuity
/// correction.
///
/// Returns 1 when either sample is empty or all values are tied.
///
pub fn mann_whitney_greater(x: &[f64], y: &[f64]) -> f64 {
    let (n1, n2) = (x.len() as f64, y.len() as f64);
    if x.is_empty() || y.is_empty() {
        return 1.0;
    }

    let combined: Vec<f64> = x.iter().chain(y.iter()).copied().collect();
    let (ranks, ties) = average_ranks(&combined);

    let rank_sum: f64 = ranks[..x.len()].iter().sum();
    let u = rank_sum - n1 * (n1 + 1.0) / 2.0;

    let n = n1 + n2;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - ties / (n * (n - 1.0)));
    if variance <= 0.0 {
        return 1.0;
    }

    let z = (u - n1 * n2 / 2.0 - 0.5) / variance.sqrt();
    normal_sf(z).clamp(0.0, 1.0)
}

///
/// Cauchy combination of p-values. `None` when there is nothing to combine.
///
pub fn cauchy_combination(p_values: &[f64]) -> Option<f64> {
    if p_values.is_empty() {
        return None;
    }

    // keep tan() finite at 0 and 1
    let statistic = p_values
        .iter()
        .map(|p| ((0.5 - p.clamp(1e-15, 1.0 - 1e-6)) * PI).tan())
        .sum::<f64>()
        / p_values.len() as f64;

    Some((0.5 - statistic.atan() / PI).clamp(0.0, 1.0))
}

/// Standard scores using the population standard deviation. A constant input maps to zeros.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_average_ranks_with_ties() {
        let (ranks, ties) = average_ranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(ties, 6.0);
    }

    #[rstest]
    fn test_mann_whitney_direction() {
        let high = [5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let low = [0.0, 1.0, 2.0, 3.0, 4.0, 4.5];

        let p_high = mann_whitney_greater(&high, &low);
        let p_low = mann_whitney_greater(&low, &high);

        assert!(p_high < 0.01);
        assert!(p_low > 0.99);
    }

    #[rstest]
    fn test_mann_whitney_degenerate() {
        assert_eq!(mann_whitney_greater(&[], &[1.0]), 1.0);
        assert_eq!(mann_whitney_greater(&[1.0, 1.0], &[1.0, 1.0]), 1.0);
    }

    #[rstest]
    fn test_cauchy_combination() {
        assert_eq!(cauchy_combination(&[]), None);

        let single = cauchy_combination(&[0.2]).unwrap();
        assert!((single - 0.2).abs() < 1e-9);

        let combined = cauchy_combination(&[0.01, 0.5]).unwrap();
        assert!(combined > 0.01 && combined < 0.5);

        assert!(cauchy_combination(&[0.0, 1.0]).unwrap().is_finite());
    }

    #[rstest]
    fn test_z_scores() {
        let z = z_scores(&[1.0, 2.0, 3.0]);
        assert!((z[0] + 1.224744871).abs() < 1e-6);
        assert!(z[1].abs() < 1e-12);
        assert_eq!(z_scores(&[4.0, 4.0]), vec![0.0, 0.0]);
    }
}
