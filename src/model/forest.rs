//! Isolation forest: seeded ensemble of random partitioning trees.
//!
//! Rows that are isolated after few splits are anomalous. Raw scores follow the
//! usual `-2^(-E[h(x)] / c(psi))` form, shifted so the `contamination` quantile
//! of the training scores sits at 0.
//!
//! Each split also keeps the range of its feature among the rows that reached
//! it. A value further than one range width outside that interval is isolated
//! at that node. Without this the path length saturates as soon as a value
//! leaves the enrollment range, and a few enrollment rows cannot tell a
//! slightly unusual sample from one typed at three times the pace.

use super::detector::AnomalyDetector;
use crate::stats::percentile;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Out-of-range isolation margin, in multiples of the split range width
const RANGE_MARGIN: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        /// Range of `feature` among the rows that reached this node
        lo: f64,
        hi: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// Nodes in pre-order; index 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
    /// Rows per tree actually used (`max_samples` capped at the row count)
    pub sample_size: usize,
    /// Training-score quantile subtracted from raw scores
    pub offset: f64,
    pub trees: Vec<IsolationTree>,
}

/// Average path length of an unsuccessful BST search over `n` items.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    height_limit: usize,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, rng: &mut StdRng, idx: Vec<usize>, depth: usize) -> usize {
        let at = self.nodes.len();
        self.nodes.push(Node::Leaf { size: idx.len() });
        if depth >= self.height_limit || idx.len() <= 1 {
            return at;
        }

        let width = self.rows[idx[0]].len();
        let mut splittable = Vec::new();
        for f in 0..width {
            let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                let v = self.rows[i][f];
                (lo.min(v), hi.max(v))
            });
            if lo < hi {
                splittable.push((f, lo, hi));
            }
        }
        if splittable.is_empty() {
            return at;
        }

        let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
        let threshold = rng.gen_range(lo..hi);
        let (l, r): (Vec<usize>, Vec<usize>) =
            idx.into_iter().partition(|&i| self.rows[i][feature] <= threshold);

        let left = self.build(rng, l, depth + 1);
        let right = self.build(rng, r, depth + 1);
        self.nodes[at] = Node::Split {
            feature,
            threshold,
            lo,
            hi,
            left,
            right,
        };
        at
    }
}

impl IsolationTree {
    fn path_length(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes.get(at) {
                Some(Node::Split {
                    feature,
                    threshold,
                    lo,
                    hi,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    let margin = RANGE_MARGIN * (hi - lo);
                    if v < lo - margin || v > hi + margin {
                        return depth;
                    }
                    at = if v <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    depth += 1.0;
                }
                Some(Node::Leaf { size }) => return depth + average_path_length(*size),
                None => return depth,
            }
        }
    }
}

impl IsolationForest {
    pub fn new(n_estimators: usize, max_samples: usize, contamination: f64, seed: u64) -> Self {
        Self {
            n_estimators,
            max_samples,
            contamination,
            seed,
            sample_size: 0,
            offset: 0.0,
            trees: Vec::new(),
        }
    }

    /// `-2^(-E[h]/c(psi))`; in [-1, 0], higher is more normal.
    pub fn score_samples(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return -1.0;
        }
        let mean_h = self
            .trees
            .iter()
            .map(|t| t.path_length(row))
            .sum::<f64>()
            / self.trees.len() as f64;
        let c = average_path_length(self.sample_size).max(f64::MIN_POSITIVE);
        -(2f64.powf(-mean_h / c))
    }

    pub(crate) fn validate(&self, width: usize) -> Result<(), String> {
        if self.trees.is_empty() || self.sample_size < 2 {
            return Err("isolation forest is not fitted".into());
        }
        if !self.offset.is_finite() {
            return Err("isolation forest offset must be finite".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            let n = tree.nodes.len();
            if n == 0 {
                return Err(format!("tree {} is empty", t));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if let Node::Split {
                    feature,
                    threshold,
                    lo,
                    hi,
                    left,
                    right,
                } = node
                {
                    // children always follow their parent in pre-order
                    if *feature >= width
                        || !threshold.is_finite()
                        || !(lo.is_finite() && hi.is_finite() && lo <= hi)
                        || *left <= i
                        || *right <= i
                        || *left >= n
                        || *right >= n
                    {
                        return Err(format!("tree {} node {} is malformed", t, i));
                    }
                }
            }
        }
        Ok(())
    }
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, rows: &[Vec<f64>]) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.sample_size = self.max_samples.min(rows.len());
        self.trees.clear();
        if self.sample_size < 2 {
            return;
        }
        let height_limit = (self.sample_size as f64).log2().ceil() as usize;

        for _ in 0..self.n_estimators {
            let idx = rand::seq::index::sample(&mut rng, rows.len(), self.sample_size).into_vec();
            let mut builder = TreeBuilder {
                rows,
                height_limit,
                nodes: Vec::new(),
            };
            builder.build(&mut rng, idx, 0);
            self.trees.push(IsolationTree {
                nodes: builder.nodes,
            });
        }

        let mut train_scores: Vec<f64> = rows.iter().map(|r| self.score_samples(r)).collect();
        train_scores.sort_by(|a, b| a.total_cmp(b));
        self.offset = percentile(&train_scores, self.contamination * 100.0);
        tracing::debug!(
            trees = self.trees.len(),
            sample_size = self.sample_size,
            offset = self.offset,
            "isolation forest fitted"
        );
    }

    fn score(&self, row: &[f64]) -> f64 {
        self.score_samples(row) - self.offset
    }
}
