//! Random forest of weighted-Gini CART trees (the ensemble candidate).
//!
//! # Parallelism
//!
//! Trees are fit on scoped worker threads. Every tree gets its own seed, drawn
//! from the caller's RNG in tree order before any worker starts, so a fitted
//! forest depends only on the seed and never on the worker count.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{balanced_weights, check_training_set, FitError, Row};
use crate::domain::N_FEATURES;

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Candidate features per split (`None` = floor(sqrt(n_features))).
    pub max_features: Option<usize>,
    /// Reweight classes to `n / (2 * n_c)`.
    pub balanced: bool,
    /// Worker threads (`None` = available parallelism).
    pub workers: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            min_samples_leaf: 5,
            max_features: None,
            balanced: true,
            workers: None,
        }
    }
}

impl ForestConfig {
    fn features_per_split(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (N_FEATURES as f64).sqrt().floor() as usize)
            .clamp(1, N_FEATURES)
    }

    fn worker_count(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        self.workers.unwrap_or(available).clamp(1, self.n_trees.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted tree; leaves hold the weighted positive fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    #[must_use]
    pub fn predict_proba(&self, row: &Row) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Check that every split points forward to an existing node and every
    /// leaf holds a probability, so `predict_proba` always terminates.
    ///
    /// # Errors
    /// Returns a description of the first malformed node.
    pub fn check(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } => {
                    if !(0.0..=1.0).contains(value) {
                        return Err(format!("leaf {id} value {value} is not a probability"));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= N_FEATURES {
                        return Err(format!("split {id} uses unknown feature {feature}"));
                    }
                    for child in [*left, *right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(format!("split {id} points to invalid node {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct TreeBuilder<'a> {
    x: &'a [Row],
    y: &'a [bool],
    weights: &'a [f64],
    config: &'a ForestConfig,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn totals(&self, idx: &[usize]) -> (f64, f64) {
        idx.iter().fold((0.0, 0.0), |(p, n), &i| {
            if self.y[i] {
                (p + self.weights[i], n)
            } else {
                (p, n + self.weights[i])
            }
        })
    }

    fn grow(&mut self, idx: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let (wp, wn) = self.totals(&idx);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: wp / (wp + wn),
        });

        let min_leaf = self.config.min_samples_leaf.max(1);
        if depth >= self.config.max_depth || idx.len() < 2 * min_leaf || wp == 0.0 || wn == 0.0 {
            return id;
        }

        let Some((feature, threshold)) = self.best_split(&idx, wp, wn, rng) else {
            return id;
        };

        let (l, r): (Vec<usize>, Vec<usize>) = idx
            .into_iter()
            .partition(|&i| self.x[i][feature] <= threshold);
        let left = self.grow(l, depth + 1, rng);
        let right = self.grow(r, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Lowest weighted Gini split over a random feature subset.
    fn best_split(
        &self,
        idx: &[usize],
        wp: f64,
        wn: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        // Weighted Gini times node weight, up to a constant: wp * wn / (wp + wn).
        let impurity = |p: f64, n: f64| if p + n > 0.0 { p * n / (p + n) } else { 0.0 };
        let parent = impurity(wp, wn);
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut best: Option<(f64, usize, f64)> = None;
        let mut order = idx.to_vec();

        for feature in index::sample(rng, N_FEATURES, self.config.features_per_split()) {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let (mut lp, mut ln) = (0.0, 0.0);
            for i in 0..order.len() - 1 {
                let cur = order[i];
                if self.y[cur] {
                    lp += self.weights[cur];
                } else {
                    ln += self.weights[cur];
                }

                let (v, next) = (self.x[cur][feature], self.x[order[i + 1]][feature]);
                if v == next || i + 1 < min_leaf || order.len() - i - 1 < min_leaf {
                    continue;
                }

                let score = impurity(lp, ln) + impurity(wp - lp, wn - ln);
                if best.map_or(true, |(s, _, _)| score < s) {
                    best = Some((score, feature, 0.5 * (v + next)));
                }
            }
        }

        best.filter(|(score, _, _)| parent - score > 1e-12)
            .map(|(_, feature, threshold)| (feature, threshold))
    }
}

fn fit_tree(
    x: &[Row],
    y: &[bool],
    class_weights: (f64, f64),
    config: &ForestConfig,
    seed: u64,
) -> DecisionTree {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = x.len();

    // Bootstrap: multiplicity of each row folds into its weight.
    let mut counts = vec![0u32; n];
    for _ in 0..n {
        counts[rng.gen_range(0..n)] += 1;
    }
    let weights: Vec<f64> = counts
        .iter()
        .zip(y)
        .map(|(&c, &label)| {
            f64::from(c) * if label { class_weights.0 } else { class_weights.1 }
        })
        .collect();
    let idx: Vec<usize> = (0..n).filter(|&i| counts[i] > 0).collect();

    let mut builder = TreeBuilder {
        x,
        y,
        weights: &weights,
        config,
        nodes: Vec::new(),
    };
    builder.grow(idx, 0, &mut rng);
    DecisionTree {
        nodes: builder.nodes,
    }
}

/// Bagged ensemble; probability is the mean of tree leaf values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit `config.n_trees` trees on (already preprocessed) rows.
    ///
    /// # Errors
    /// Returns error for empty or single-class input, or if a worker panics.
    pub fn fit<R: Rng + ?Sized>(
        x: &[Row],
        y: &[bool],
        config: &ForestConfig,
        rng: &mut R,
    ) -> Result<Self, FitError> {
        let (pos, neg) = check_training_set(x, y)?;
        if config.n_trees == 0 {
            return Err(FitError::InvalidParameter("forest needs at least one tree".into()));
        }
        let class_weights = if config.balanced {
            balanced_weights(pos, neg)
        } else {
            (1.0, 1.0)
        };

        let seeds: Vec<u64> = (0..config.n_trees).map(|_| rng.gen()).collect();
        let workers = config.worker_count();
        let per_worker = seeds.len().div_ceil(workers);

        tracing::debug!(
            "Fitting forest: {} trees on {} rows with {} workers",
            config.n_trees,
            x.len(),
            workers
        );

        let trees = std::thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .chunks(per_worker)
                .map(|batch| {
                    scope.spawn(move || {
                        batch
                            .iter()
                            .map(|&seed| fit_tree(x, y, class_weights, config, seed))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut trees = Vec::with_capacity(config.n_trees);
            for handle in handles {
                let batch = handle
                    .join()
                    .map_err(|_| FitError::Numerical("forest worker panicked".into()))?;
                trees.extend(batch);
            }
            Ok::<_, FitError>(trees)
        })?;

        Ok(Self { trees })
    }

    #[must_use]
    pub fn predict_proba(&self, row: &Row) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_proba(row)).sum::<f64>() / self.trees.len() as f64
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Structural check of a forest read back from storage.
    ///
    /// # Errors
    /// Returns error for an empty forest or the first malformed tree.
    pub fn check(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check().map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_data(n: usize, seed: u64) -> (Vec<Row>, Vec<bool>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let a = f64::from(rng.gen_range(0..28_i32));
            let b = f64::from(rng.gen_range(0..4_i32));
            // Positive mostly above a = 18, with some label noise.
            let p = if a > 18.0 { 0.85 } else { 0.1 };
            x.push([a, f64::from(rng.gen_range(0..22_i32)), 30.0, b, 0.0]);
            y.push(rng.gen::<f64>() < p);
        }
        (x, y)
    }

    fn small_config(workers: usize) -> ForestConfig {
        ForestConfig {
            n_trees: 12,
            max_depth: 6,
            min_samples_leaf: 5,
            max_features: Some(N_FEATURES),
            balanced: true,
            workers: Some(workers),
        }
    }

    #[test]
    fn test_forest_separates_classes() {
        let (x, y) = threshold_data(1500, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let forest = RandomForest::fit(&x, &y, &small_config(2), &mut rng).expect("Should fit");

        assert_eq!(forest.trees().len(), 12);
        let high = forest.predict_proba(&[25.0, 10.0, 30.0, 1.0, 0.0]);
        let low = forest.predict_proba(&[3.0, 10.0, 30.0, 1.0, 0.0]);
        assert!(high > 0.6, "high={high}");
        assert!(low < 0.4, "low={low}");
        assert!(forest.trees().iter().all(|t| t.depth() <= 6));
    }

    #[test]
    fn test_forest_independent_of_worker_count() {
        let (x, y) = threshold_data(600, 5);
        let a = RandomForest::fit(&x, &y, &small_config(1), &mut ChaCha8Rng::seed_from_u64(9))
            .expect("Should fit");
        let b = RandomForest::fit(&x, &y, &small_config(4), &mut ChaCha8Rng::seed_from_u64(9))
            .expect("Should fit");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fitted_forest_passes_check() {
        let (x, y) = threshold_data(400, 8);
        let forest = RandomForest::fit(&x, &y, &small_config(2), &mut ChaCha8Rng::seed_from_u64(6))
            .expect("Should fit");
        assert_eq!(forest.check(), Ok(()));
    }

    #[test]
    fn test_check_rejects_malformed_trees() {
        let leaf = |value| Node::Leaf { value };
        let split = |left, right| Node::Split {
            feature: 0,
            threshold: 1.0,
            left,
            right,
        };

        assert!(DecisionTree { nodes: vec![] }.check().is_err());
        // Out of range child.
        assert!(DecisionTree {
            nodes: vec![split(1, 5), leaf(0.2)]
        }
        .check()
        .is_err());
        // Self loop would never reach a leaf.
        assert!(DecisionTree {
            nodes: vec![split(0, 1), leaf(0.2)]
        }
        .check()
        .is_err());
        assert!(DecisionTree {
            nodes: vec![split(1, 2), leaf(0.2), leaf(1.5)]
        }
        .check()
        .is_err());
        assert!(DecisionTree {
            nodes: vec![split(1, 2), leaf(0.2), leaf(0.9)]
        }
        .check()
        .is_ok());

        assert!(RandomForest { trees: vec![] }.check().is_err());
    }

    #[test]
    fn test_leaf_values_are_probabilities() {
        let (x, y) = threshold_data(400, 8);
        let forest = RandomForest::fit(&x, &y, &small_config(1), &mut ChaCha8Rng::seed_from_u64(2))
            .expect("Should fit");
        for row in x.iter().take(50) {
            let p = forest.predict_proba(row);
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
