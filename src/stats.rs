//! Numeric kernel: descriptive statistics, z-score normalization, distances.
//!
//! Every function is total. Empty input yields neutral values (zeros) rather than an error.

use serde::{Deserialize, Serialize};

/// Seven-number summary of a timing series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

impl Statistics {
    /// Width of the block this summary occupies in a feature vector
    pub const LEN: usize = 7;

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.mean, self.std, self.min, self.max, self.median, self.q25, self.q75,
        ]
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile `p` (0–100) of an ascending slice, linearly interpolated between ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

pub fn statistics(values: &[f64]) -> Statistics {
    if values.is_empty() {
        return Statistics::default();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Statistics {
        mean: mean(values),
        std: std_dev(values),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: percentile(&sorted, 50.0),
        q25: percentile(&sorted, 25.0),
        q75: percentile(&sorted, 75.0),
    }
}

/// Z-score normalize across the elements of one vector.
///
/// A vector with zero spread carries no discriminative shape and maps to all zeros.
pub fn normalize(vector: &[f64]) -> Vec<f64> {
    let m = mean(vector);
    let s = std_dev(vector);
    if s == 0.0 {
        return vec![0.0; vector.len()];
    }
    vector.iter().map(|v| (v - m) / s).collect()
}

/// L1 distance. Inputs must have equal length.
pub fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "manhattan: length mismatch");
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// L2 distance. Inputs must have equal length.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "euclidean: length mismatch");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Cosine of the angle between `a` and `b`; 0 when either has zero magnitude.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_statistics_are_zero() {
        assert_eq!(statistics(&[]), Statistics::default());
    }

    #[test]
    fn statistics_match_linear_percentiles() {
        let s = statistics(&[4.0, 1.0, 3.0, 2.0]);
        assert!(close(s.mean, 2.5));
        assert!(close(s.std, 1.25f64.sqrt()));
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert!(close(s.median, 2.5));
        assert!(close(s.q25, 1.75));
        assert!(close(s.q75, 3.25));
    }

    #[test]
    fn single_value_statistics() {
        let s = statistics(&[7.0]);
        assert_eq!(s.to_array(), [7.0, 0.0, 7.0, 7.0, 7.0, 7.0, 7.0]);
    }

    #[test]
    fn normalize_constant_vector_is_zero() {
        assert_eq!(normalize(&[3.5; 6]), vec![0.0; 6]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn normalize_has_zero_mean_unit_std() {
        let n = normalize(&[1.0, 2.0, 3.0, 10.0]);
        assert!(close(mean(&n), 0.0));
        assert!(close(std_dev(&n), 1.0));
    }

    #[test]
    fn self_distance_and_similarity() {
        let v = [0.5, -1.0, 3.0, 8.0];
        assert_eq!(manhattan(&v, &v), 0.0);
        assert_eq!(euclidean(&v, &v), 0.0);
        assert!(close(cosine_similarity(&v, &v), 1.0));
    }

    #[test]
    fn zero_magnitude_similarity_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn opposite_vectors() {
        assert!(close(cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]), -1.0));
        assert_eq!(manhattan(&[1.0, 2.0], &[-1.0, -2.0]), 6.0);
        assert!(close(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0));
    }
}
