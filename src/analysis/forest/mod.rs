//! Random Forest models stored as JSON.
//!
//! A model file holds every tree as a flat node array; node 0 is the root
//! and children always sit after their parent, so a walk is guaranteed to
//! terminate once [`Forest::validate`] has passed.

pub mod train;

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

pub use train::{accuracy, fit_classifier, fit_regressor, train_test_split, ForestParams, MaxFeatures, RegressionMetrics};

#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    #[error("model file I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file is not valid JSON")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model: {0}")]
    Invalid(String),
    #[error("model is not trained")]
    NotTrained,
    #[error("expected a {expected} model, found a {found}")]
    WrongKind { expected: ModelKind, found: ModelKind },
    #[error("model expects {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("need at least {min} samples to train, got {got}")]
    InsufficientData { min: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Regressor,
    Classifier,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Regressor => f.write_str("regressor"),
            ModelKind::Classifier => f.write_str("classifier"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// One value for regression, one probability per class otherwise.
    Leaf { value: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf payload reached by `x`. Goes left when `x[feature] <= threshold`.
    fn leaf(&self, x: &[f64]) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if x[*feature] <= *threshold { *left } else { *right },
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub kind: ModelKind,
    pub trained: bool,
    pub n_features: usize,
    /// Class labels for a classifier, empty for a regressor.
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub feature_importances: Vec<f64>,
    pub trees: Vec<Tree>,
}

/// Averaged regression output plus the spread between trees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionOutput {
    pub value: f64,
    pub std_dev: f64,
}

impl RegressionOutput {
    /// Tree agreement in `[0.5, 1]`: one minus the coefficient of variation.
    pub fn agreement(&self) -> f64 {
        if self.value.abs() < f64::EPSILON {
            return 0.5;
        }
        (1.0 - self.std_dev / self.value.abs()).clamp(0.5, 1.0)
    }
}

impl Forest {
    pub fn load(path: &Path) -> Result<Self, ForestError> {
        let bytes = fs::read(path).map_err(|source| ForestError::Io {
            path: path.to_owned(),
            source,
        })?;
        let forest: Forest = serde_json::from_slice(&bytes)?;
        forest.validate()?;
        Ok(forest)
    }

    pub fn save(&self, path: &Path) -> Result<(), ForestError> {
        let json = serde_json::to_vec(self)?;
        fs::write(path, json).map_err(|source| ForestError::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// Structural checks that make inference panic-free.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.trained && self.trees.is_empty() {
            return Err(ForestError::Invalid("trained model has no trees".into()));
        }
        let leaf_len = match self.kind {
            ModelKind::Regressor => 1,
            ModelKind::Classifier if self.classes.is_empty() => {
                return Err(ForestError::Invalid("classifier has no classes".into()))
            }
            ModelKind::Classifier => self.classes.len(),
        };
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ForestError::Invalid(format!("tree {t} is empty")));
            }
            for (id, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.n_features {
                            return Err(ForestError::Invalid(format!(
                                "tree {t} node {id} splits on feature {feature} of {}",
                                self.n_features
                            )));
                        }
                        let n = tree.nodes.len();
                        if *left <= id || *right <= id || *left >= n || *right >= n {
                            return Err(ForestError::Invalid(format!(
                                "tree {t} node {id} has out-of-order children"
                            )));
                        }
                    }
                    Node::Leaf { value } if value.len() != leaf_len => {
                        return Err(ForestError::Invalid(format!(
                            "tree {t} node {id} has {} leaf values, expected {leaf_len}",
                            value.len()
                        )));
                    }
                    Node::Leaf { .. } => {}
                }
            }
        }
        Ok(())
    }

    fn check_input(&self, kind: ModelKind, x: &[f64]) -> Result<(), ForestError> {
        if self.kind != kind {
            return Err(ForestError::WrongKind {
                expected: kind,
                found: self.kind,
            });
        }
        if !self.trained {
            return Err(ForestError::NotTrained);
        }
        if x.len() != self.n_features {
            return Err(ForestError::FeatureMismatch {
                expected: self.n_features,
                got: x.len(),
            });
        }
        Ok(())
    }

    pub fn predict_value(&self, x: &[f64]) -> Result<RegressionOutput, ForestError> {
        self.check_input(ModelKind::Regressor, x)?;
        let outputs: Vec<f64> = self.trees.iter().map(|t| t.leaf(x)[0]).collect();
        Ok(RegressionOutput {
            value: outputs.iter().mean(),
            std_dev: if outputs.len() > 1 {
                outputs.iter().population_std_dev()
            } else {
                0.0
            },
        })
    }

    /// Class probabilities averaged over trees, in `classes` order.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ForestError> {
        self.check_input(ModelKind::Classifier, x)?;
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.leaf(x)) {
                *total += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }

    /// Most probable class index and its probability.
    pub fn predict_class(&self, x: &[f64]) -> Result<(usize, f64), ForestError> {
        let proba = self.predict_proba(x)?;
        let best = proba
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    fn regressor() -> Forest {
        Forest {
            kind: ModelKind::Regressor,
            trained: true,
            n_features: 2,
            classes: vec![],
            feature_importances: vec![],
            trees: vec![
                stump(0, 10.0, vec![100.0], vec![20.0]),
                stump(1, 0.5, vec![80.0], vec![40.0]),
            ],
        }
    }

    fn classifier() -> Forest {
        Forest {
            kind: ModelKind::Classifier,
            trained: true,
            n_features: 1,
            classes: vec!["dry".into(), "wet".into()],
            feature_importances: vec![],
            trees: vec![
                stump(0, 50.0, vec![1.0, 0.0], vec![0.0, 1.0]),
                stump(0, 40.0, vec![0.8, 0.2], vec![0.4, 0.6]),
            ],
        }
    }

    #[test]
    fn regression_averages_trees() {
        let out = regressor().predict_value(&[5.0, 0.0]).unwrap();
        assert_eq!(out.value, 90.0);
        assert_eq!(out.std_dev, 10.0);
        let out = regressor().predict_value(&[50.0, 1.0]).unwrap();
        assert_eq!(out.value, 30.0);
    }

    #[test]
    fn agreement_is_clamped() {
        let tight = RegressionOutput { value: 100.0, std_dev: 5.0 };
        assert!((tight.agreement() - 0.95).abs() < 1e-12);
        let loose = RegressionOutput { value: 10.0, std_dev: 50.0 };
        assert_eq!(loose.agreement(), 0.5);
    }

    #[test]
    fn classification_averages_probabilities() {
        let forest = classifier();
        let proba = forest.predict_proba(&[45.0]).unwrap();
        assert!((proba[0] - 0.7).abs() < 1e-12);
        assert!((proba[1] - 0.3).abs() < 1e-12);
        assert_eq!(forest.predict_class(&[45.0]).unwrap().0, 0);
        assert_eq!(forest.predict_class(&[60.0]).unwrap().0, 1);
    }

    #[test]
    fn feature_count_mismatch_is_rejected() {
        let err = regressor().predict_value(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureMismatch { expected: 2, got: 3 }
        ));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let err = regressor().predict_proba(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ForestError::WrongKind { .. }));
    }

    #[test]
    fn untrained_model_is_rejected() {
        let mut forest = regressor();
        forest.trained = false;
        assert!(matches!(
            forest.predict_value(&[1.0, 2.0]),
            Err(ForestError::NotTrained)
        ));
    }

    #[test]
    fn validate_catches_bad_children() {
        let mut forest = regressor();
        forest.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 1.0,
            left: 0,
            right: 2,
        };
        assert!(matches!(forest.validate(), Err(ForestError::Invalid(_))));
    }

    #[test]
    fn validate_catches_leaf_width() {
        let mut forest = classifier();
        forest.trees[1].nodes[2] = Node::Leaf { value: vec![1.0] };
        assert!(matches!(forest.validate(), Err(ForestError::Invalid(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let forest = classifier();
        forest.save(&path).unwrap();
        assert_eq!(Forest::load(&path).unwrap(), forest);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(Forest::load(&path), Err(ForestError::Parse(_))));
        assert!(matches!(
            Forest::load(&dir.path().join("missing.json")),
            Err(ForestError::Io { .. })
        ));
    }
}
