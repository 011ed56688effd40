//! Isolation forest: an ensemble of randomly partitioning trees.
//!
//! Points that isolate in few splits (short average path) are anomalous.

use crate::feature_extractor::FeatureVector;
use rand::seq::index::sample;
use rand::seq::SliceRandom;
use rand::Rng;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    External {
        size: usize,
    },
}

/// One isolation tree grown on a subsample.
#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build<R: Rng>(samples: Vec<&FeatureVector>, max_depth: usize, rng: &mut R) -> Self {
        Self {
            root: Self::build_node(samples, 0, max_depth, rng),
        }
    }

    fn build_node<R: Rng>(
        samples: Vec<&FeatureVector>,
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || samples.len() <= 1 {
            return IsolationNode::External {
                size: samples.len(),
            };
        }

        // Try features in random order, split on the first that varies
        let mut features: Vec<usize> = (0..samples[0].len()).collect();
        features.shuffle(rng);

        for feature in features {
            let (min, max) = samples
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                    (lo.min(s[feature]), hi.max(s[feature]))
                });
            if max - min <= f64::EPSILON * max.abs().max(1.0) {
                continue;
            }

            // Interpolate so ranges wider than f64::MAX stay finite
            let u: f64 = rng.gen();
            let split = min * (1.0 - u) + max * u;
            let (left, right): (Vec<_>, Vec<_>) =
                samples.into_iter().partition(|s| s[feature] < split);

            return IsolationNode::Internal {
                feature,
                split,
                left: Box::new(Self::build_node(left, depth + 1, max_depth, rng)),
                right: Box::new(Self::build_node(right, depth + 1, max_depth, rng)),
            };
        }

        IsolationNode::External {
            size: samples.len(),
        }
    }

    /// Depth reached by `point` plus the expected remaining depth at the leaf
    fn path_length(&self, point: &FeatureVector) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::External { size } => {
                    return depth as f64 + average_path_length(*size);
                }
                IsolationNode::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    node = if point[*feature] < *split { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// A fitted forest.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Grow `n_estimators` trees, each on `min(max_samples, rows)` rows drawn
    /// without replacement. All randomness comes from `rng`.
    pub fn fit<R: Rng>(
        samples: &[FeatureVector],
        n_estimators: usize,
        max_samples: usize,
        rng: &mut R,
    ) -> Self {
        let sample_size = max_samples.min(samples.len());
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..n_estimators)
            .map(|_| {
                let subsample: Vec<&FeatureVector> = sample(rng, samples.len(), sample_size)
                    .into_iter()
                    .map(|i| &samples[i])
                    .collect();
                IsolationTree::build(subsample, max_depth, rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Anomaly score in (0, 1]; higher is more anomalous, 0.5 is neutral.
    pub fn score(&self, point: &FeatureVector) -> f64 {
        let c_n = average_path_length(self.sample_size);
        if self.trees.is_empty() || c_n == 0.0 {
            return 0.5;
        }

        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point))
            .sum::<f64>()
            / self.trees.len() as f64;

        2.0_f64.powf(-mean_path / c_n)
    }

    pub fn score_all(&self, points: &[FeatureVector]) -> Vec<f64> {
        points.iter().map(|p| self.score(p)).collect()
    }
}
