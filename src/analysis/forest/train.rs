//! CART tree induction with bootstrap sampling.

use rand::{
    rngs::StdRng,
    seq::{index, SliceRandom},
    Rng, SeedableRng,
};

use super::{Forest, ForestError, ModelKind, Node, Tree};

/// Smallest data set a forest is fitted on.
pub const MIN_TRAINING_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    Sqrt,
}

impl MaxFeatures {
    fn count(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl ForestParams {
    pub fn regressor() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::All,
            seed: 42,
        }
    }

    pub fn classifier() -> Self {
        Self {
            n_trees: 100,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }
}

#[derive(Clone, Copy)]
enum Targets<'a> {
    Regression(&'a [f64]),
    Classes { labels: &'a [usize], n_classes: usize },
}

impl Targets<'_> {
    /// `n * impurity` of the samples in `idx`: squared error for regression,
    /// weighted Gini otherwise.
    fn cost(&self, idx: &[usize]) -> f64 {
        match *self {
            Targets::Regression(y) => {
                let n = idx.len() as f64;
                let sum: f64 = idx.iter().map(|&i| y[i]).sum();
                let sum_sq: f64 = idx.iter().map(|&i| y[i] * y[i]).sum();
                sum_sq - sum * sum / n
            }
            Targets::Classes { labels, n_classes } => {
                let mut counts = vec![0usize; n_classes];
                for &i in idx {
                    counts[labels[i]] += 1;
                }
                gini_cost(&counts, idx.len())
            }
        }
    }

    fn leaf(&self, idx: &[usize]) -> Vec<f64> {
        let n = idx.len() as f64;
        match *self {
            Targets::Regression(y) => vec![idx.iter().map(|&i| y[i]).sum::<f64>() / n],
            Targets::Classes { labels, n_classes } => {
                let mut dist = vec![0.0; n_classes];
                for &i in idx {
                    dist[labels[i]] += 1.0;
                }
                dist.iter_mut().for_each(|p| *p /= n);
                dist
            }
        }
    }
}

fn gini_cost(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64 / n).powi(2)).sum();
    n * (1.0 - sum_sq)
}

struct Split {
    feature: usize,
    threshold: f64,
    cost: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    targets: Targets<'a>,
    params: &'a ForestParams,
    n_features: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, idx: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.targets.leaf(idx),
        });

        let cost = self.targets.cost(idx);
        if depth >= self.params.max_depth
            || idx.len() < self.params.min_samples_split
            || cost <= 1e-12
        {
            return id;
        }
        let Some(split) = self.best_split(idx, cost, rng) else {
            return id;
        };

        let mut boundary = 0;
        for i in 0..idx.len() {
            if self.x[idx[i]][split.feature] <= split.threshold {
                idx.swap(i, boundary);
                boundary += 1;
            }
        }
        let (left_idx, right_idx) = idx.split_at_mut(boundary);
        self.importances[split.feature] += cost - split.cost;

        let left = self.build(left_idx, depth + 1, rng);
        let right = self.build(right_idx, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, idx: &[usize], parent_cost: f64, rng: &mut StdRng) -> Option<Split> {
        let k = self.params.max_features.count(self.n_features);
        let features = index::sample(rng, self.n_features, k);
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<Split> = None;

        for feature in features.iter() {
            let mut sorted: Vec<(f64, usize)> =
                idx.iter().map(|&i| (self.x[i][feature], i)).collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut sweep = Sweep::new(self.targets, &sorted);
            for pos in 1..sorted.len() {
                sweep.move_left(sorted[pos - 1].1);
                if pos < min_leaf || sorted.len() - pos < min_leaf {
                    continue;
                }
                let (lo, hi) = (sorted[pos - 1].0, sorted[pos].0);
                if lo >= hi {
                    continue;
                }
                let cost = sweep.cost();
                if cost < parent_cost - 1e-12 && best.as_ref().map_or(true, |b| cost < b.cost) {
                    best = Some(Split {
                        feature,
                        threshold: (lo + hi) / 2.0,
                        cost,
                    });
                }
            }
        }
        best
    }
}

/// Running statistics while samples move from the right to the left child.
enum Sweep<'a> {
    Regression {
        y: &'a [f64],
        left: (f64, f64, usize),
        right: (f64, f64, usize),
    },
    Classes {
        labels: &'a [usize],
        left: Vec<usize>,
        right: Vec<usize>,
        n_left: usize,
        n_right: usize,
    },
}

impl<'a> Sweep<'a> {
    fn new(targets: Targets<'a>, sorted: &[(f64, usize)]) -> Self {
        match targets {
            Targets::Regression(y) => {
                let sum: f64 = sorted.iter().map(|&(_, i)| y[i]).sum();
                let sum_sq: f64 = sorted.iter().map(|&(_, i)| y[i] * y[i]).sum();
                Sweep::Regression {
                    y,
                    left: (0.0, 0.0, 0),
                    right: (sum, sum_sq, sorted.len()),
                }
            }
            Targets::Classes { labels, n_classes } => {
                let mut right = vec![0; n_classes];
                for &(_, i) in sorted {
                    right[labels[i]] += 1;
                }
                Sweep::Classes {
                    labels,
                    left: vec![0; n_classes],
                    right,
                    n_left: 0,
                    n_right: sorted.len(),
                }
            }
        }
    }

    fn move_left(&mut self, sample: usize) {
        match self {
            Sweep::Regression { y, left, right } => {
                let v = y[sample];
                left.0 += v;
                left.1 += v * v;
                left.2 += 1;
                right.0 -= v;
                right.1 -= v * v;
                right.2 -= 1;
            }
            Sweep::Classes {
                labels,
                left,
                right,
                n_left,
                n_right,
            } => {
                left[labels[sample]] += 1;
                right[labels[sample]] -= 1;
                *n_left += 1;
                *n_right -= 1;
            }
        }
    }

    fn cost(&self) -> f64 {
        match self {
            Sweep::Regression { left, right, .. } => {
                let sse = |(sum, sum_sq, n): (f64, f64, usize)| {
                    if n == 0 {
                        0.0
                    } else {
                        (sum_sq - sum * sum / n as f64).max(0.0)
                    }
                };
                sse(*left) + sse(*right)
            }
            Sweep::Classes {
                left,
                right,
                n_left,
                n_right,
                ..
            } => gini_cost(left, *n_left) + gini_cost(right, *n_right),
        }
    }
}

fn fit(
    x: &[Vec<f64>],
    targets: Targets<'_>,
    kind: ModelKind,
    classes: Vec<String>,
    params: &ForestParams,
) -> Result<Forest, ForestError> {
    if x.len() < MIN_TRAINING_SAMPLES {
        return Err(ForestError::InsufficientData {
            min: MIN_TRAINING_SAMPLES,
            got: x.len(),
        });
    }
    let n_features = x[0].len();
    if let Some(row) = x.iter().find(|row| row.len() != n_features) {
        return Err(ForestError::FeatureMismatch {
            expected: n_features,
            got: row.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut trees = Vec::with_capacity(params.n_trees);
    let mut importances = vec![0.0; n_features];

    for _ in 0..params.n_trees {
        let mut sample: Vec<usize> = (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
        let mut builder = TreeBuilder {
            x,
            targets,
            params,
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        builder.build(&mut sample, 0, &mut rng);

        let total: f64 = builder.importances.iter().sum();
        if total > 0.0 {
            for (acc, imp) in importances.iter_mut().zip(&builder.importances) {
                *acc += imp / total;
            }
        }
        trees.push(Tree {
            nodes: builder.nodes,
        });
    }

    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        importances.iter_mut().for_each(|v| *v /= total);
    }

    Ok(Forest {
        kind,
        trained: true,
        n_features,
        classes,
        feature_importances: importances,
        trees,
    })
}

pub fn fit_regressor(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Forest, ForestError> {
    if x.len() != y.len() {
        return Err(ForestError::Invalid(format!(
            "{} rows but {} targets",
            x.len(),
            y.len()
        )));
    }
    fit(x, Targets::Regression(y), ModelKind::Regressor, Vec::new(), params)
}

/// `labels[i]` indexes into `classes`.
pub fn fit_classifier(
    x: &[Vec<f64>],
    labels: &[usize],
    classes: Vec<String>,
    params: &ForestParams,
) -> Result<Forest, ForestError> {
    if x.len() != labels.len() {
        return Err(ForestError::Invalid(format!(
            "{} rows but {} labels",
            x.len(),
            labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= classes.len()) {
        return Err(ForestError::Invalid(format!(
            "label {bad} outside {} classes",
            classes.len()
        )));
    }
    let targets = Targets::Classes {
        labels,
        n_classes: classes.len(),
    };
    fit(x, targets, ModelKind::Classifier, classes, params)
}

// ---------------------------------------------------------------------------
// Evaluation helpers
// ---------------------------------------------------------------------------

/// Shuffled `(train, test)` index sets; `test` holds `ceil(n * test_fraction)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let train = order.split_off(n_test.min(n));
    (train, order)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len() as f64;
        let mae = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n;
        let sse: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
        let mean = actual.iter().sum::<f64>() / n;
        let sst: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        Self {
            mae,
            rmse: (sse / n).sqrt(),
            r2: if sst > 0.0 { 1.0 - sse / sst } else { 0.0 },
        }
    }
}

pub fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    hits as f64 / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y = x.iter().map(|r| if r[0] < 30.0 { 10.0 } else { 50.0 }).collect();
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            ..ForestParams::regressor()
        }
    }

    #[test]
    fn regressor_learns_step() {
        let (x, y) = step_data();
        let forest = fit_regressor(&x, &y, &small_params()).unwrap();
        forest.validate().unwrap();
        assert_eq!(forest.trees.len(), 15);
        let low = forest.predict_value(&[5.0, 1.0]).unwrap().value;
        let high = forest.predict_value(&[55.0, 1.0]).unwrap().value;
        assert!(low < 20.0, "low = {low}");
        assert!(high > 40.0, "high = {high}");
        assert!(forest.feature_importances[0] > forest.feature_importances[1]);
    }

    #[test]
    fn fitting_is_reproducible() {
        let (x, y) = step_data();
        let a = fit_regressor(&x, &y, &small_params()).unwrap();
        let b = fit_regressor(&x, &y, &small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn classifier_separates_classes() {
        let x: Vec<Vec<f64>> = (0..80).map(|i| vec![i as f64, ((i * 13) % 5) as f64]).collect();
        let labels: Vec<usize> = (0..80).map(|i| if i < 40 { 0 } else { 1 }).collect();
        let params = ForestParams {
            n_trees: 25,
            max_features: MaxFeatures::All,
            ..ForestParams::classifier()
        };
        let forest = fit_classifier(&x, &labels, vec!["a".into(), "b".into()], &params).unwrap();
        forest.validate().unwrap();
        assert_eq!(forest.predict_class(&[3.0, 1.0]).unwrap().0, 0);
        assert_eq!(forest.predict_class(&[75.0, 1.0]).unwrap().0, 1);
        let proba = forest.predict_proba(&[75.0, 1.0]).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_samples_is_an_error() {
        let x = vec![vec![1.0]; 5];
        let y = vec![1.0; 5];
        assert!(matches!(
            fit_regressor(&x, &y, &small_params()),
            Err(ForestError::InsufficientData { min: 10, got: 5 })
        ));
    }

    #[test]
    fn out_of_range_label_is_an_error() {
        let x = vec![vec![1.0]; 12];
        let labels = vec![2; 12];
        assert!(fit_classifier(&x, &labels, vec!["a".into()], &ForestParams::classifier()).is_err());
    }

    #[test]
    fn constant_target_yields_single_leaf_trees() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y = vec![7.0; 20];
        let forest = fit_regressor(&x, &y, &small_params()).unwrap();
        assert!(forest.trees.iter().all(|t| t.nodes.len() == 1));
        assert_eq!(forest.predict_value(&[3.0]).unwrap().value, 7.0);
    }

    #[test]
    fn split_sizes() {
        let (train, test) = train_test_split(500, 0.2, 42);
        assert_eq!(test.len(), 100);
        assert_eq!(train.len(), 400);
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn metrics_for_perfect_and_mean_predictions() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let perfect = RegressionMetrics::compute(&actual, &actual);
        assert_eq!(perfect.mae, 0.0);
        assert_eq!(perfect.r2, 1.0);

        let mean = RegressionMetrics::compute(&actual, &[2.5; 4]);
        assert_eq!(mean.mae, 1.0);
        assert!(mean.r2.abs() < 1e-12);
        assert!((mean.rmse - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn accuracy_counts_hits() {
        assert_eq!(accuracy(&[0, 1, 2, 1], &[0, 1, 1, 1]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }
}
