use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{
    features::{self, FEATURE_COUNT},
    forest::{Forest, ForestError, ModelKind},
    health, round_to,
    types::{
        EstimateSource, HealthCategory, HealthResult, HealthStatus, PlantProfile, SensorSample,
        WateringSchedule, WeatherSnapshot,
    },
    watering::{self, MAX_FREQUENCY_DAYS, MAX_HOURS, MIN_FREQUENCY_DAYS, MIN_HOURS},
};

pub const WATERING_MODEL_FILE: &str = "watering_model.json";
pub const HEALTH_MODEL_FILE: &str = "health_model.json";

struct HealthModel {
    forest: Forest,
    /// Category of each forest class, in class order.
    categories: Vec<HealthCategory>,
}

/// Trained models with rule-based fallback.
///
/// Both slots start empty and are filled by [`ModelService::reload`]. Any
/// load failure leaves the slot empty and the rule-based estimators answer
/// instead, with the same output shape.
pub struct ModelService {
    dir: PathBuf,
    watering: ArcSwapOption<Forest>,
    health: ArcSwapOption<HealthModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SlotStatus {
    pub loaded: bool,
    pub n_features: Option<usize>,
    pub n_trees: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ModelStatus {
    pub model_dir: String,
    pub watering: SlotStatus,
    pub health: SlotStatus,
}

impl ModelService {
    /// A service with no models loaded.
    pub fn empty(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            watering: ArcSwapOption::empty(),
            health: ArcSwapOption::empty(),
        }
    }

    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let service = Self::empty(dir);
        service.reload();
        service
    }

    /// Re-read both model files and swap them in.
    pub fn reload(&self) -> ModelStatus {
        let watering = load_slot(&self.dir.join(WATERING_MODEL_FILE), load_watering);
        self.watering.store(watering.map(Arc::new));

        let health = load_slot(&self.dir.join(HEALTH_MODEL_FILE), load_health);
        self.health.store(health.map(Arc::new));

        self.status()
    }

    /// Whether health assessment would consult the classifier, and so needs weather.
    pub fn has_health_model(&self) -> bool {
        self.health.load().is_some()
    }

    pub fn status(&self) -> ModelStatus {
        let slot = |forest: Option<&Forest>| match forest {
            Some(f) => SlotStatus {
                loaded: true,
                n_features: Some(f.n_features),
                n_trees: f.trees.len(),
            },
            None => SlotStatus {
                loaded: false,
                n_features: None,
                n_trees: 0,
            },
        };
        let watering = self.watering.load_full();
        let health = self.health.load_full();
        ModelStatus {
            model_dir: self.dir.display().to_string(),
            watering: slot(watering.as_deref()),
            health: slot(health.as_deref().map(|h| &h.forest)),
        }
    }

    /// Watering frequency, and hours until watering when `moisture` is known.
    pub fn predict_watering(&self, weather: &WeatherSnapshot, moisture: Option<f64>) -> WateringSchedule {
        let (t, h, p) = (
            weather.temperature,
            weather.humidity,
            weather.precipitation_probability,
        );
        let rules = watering::weather_based(t, h, p, moisture);
        let Some(model) = self.watering.load_full() else {
            return rules;
        };

        let x = match moisture {
            Some(m) => vec![m, t, h, p],
            None => vec![t, h, p],
        };
        match model.predict_value(&x) {
            Ok(out) => {
                let (frequency_days, hours_until) = match moisture {
                    Some(_) => (
                        rules.frequency_days,
                        Some(out.value.clamp(MIN_HOURS, MAX_HOURS)),
                    ),
                    None => (out.value.clamp(MIN_FREQUENCY_DAYS, MAX_FREQUENCY_DAYS), None),
                };
                WateringSchedule {
                    frequency_days,
                    hours_until,
                    confidence: out.agreement(),
                    source: EstimateSource::TrainedModel,
                }
            }
            Err(e) => {
                warn!(error = %e, "Watering model not applicable, using weather-based estimate");
                rules
            }
        }
    }

    /// Health assessment of newest-first `readings`. The classifier, when
    /// loaded, decides category, score and confidence; components and
    /// factors always come from the rule-based scorer.
    pub fn assess_health(
        &self,
        readings: &[SensorSample],
        weather: Option<&WeatherSnapshot>,
        profile: Option<&PlantProfile>,
    ) -> HealthResult {
        let rules = health::score(readings);
        if rules.status == HealthStatus::Unknown {
            return rules;
        }
        let Some(model) = self.health.load_full() else {
            return rules;
        };

        let x = features::extract(readings, weather, profile);
        match model.forest.predict_class(&x) {
            Ok((class, probability)) => {
                let category = model.categories[class];
                HealthResult {
                    score: category.band_midpoint(),
                    status: HealthStatus::Rated(category),
                    confidence: round_to(probability, 2),
                    source: EstimateSource::TrainedModel,
                    ..rules
                }
            }
            Err(e) => {
                warn!(error = %e, "Health model not applicable, using rule-based score");
                rules
            }
        }
    }
}

fn load_slot<T>(path: &Path, load: fn(&Path) -> Result<T, ForestError>) -> Option<T> {
    match load(path) {
        Ok(model) => {
            info!(path = %path.display(), "Loaded trained model");
            Some(model)
        }
        Err(ForestError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No trained model, using rule-based estimates");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load trained model");
            None
        }
    }
}

fn require_trained(forest: &Forest, kind: ModelKind) -> Result<(), ForestError> {
    if forest.kind != kind {
        return Err(ForestError::WrongKind {
            expected: kind,
            found: forest.kind,
        });
    }
    if !forest.trained {
        return Err(ForestError::NotTrained);
    }
    Ok(())
}

fn load_watering(path: &Path) -> Result<Forest, ForestError> {
    let forest = Forest::load(path)?;
    require_trained(&forest, ModelKind::Regressor)?;
    if !matches!(forest.n_features, 3 | 4) {
        return Err(ForestError::Invalid(format!(
            "watering model must take 3 or 4 features, not {}",
            forest.n_features
        )));
    }
    Ok(forest)
}

fn load_health(path: &Path) -> Result<HealthModel, ForestError> {
    let forest = Forest::load(path)?;
    require_trained(&forest, ModelKind::Classifier)?;
    if forest.n_features != FEATURE_COUNT {
        return Err(ForestError::FeatureMismatch {
            expected: FEATURE_COUNT,
            got: forest.n_features,
        });
    }
    let categories = forest
        .classes
        .iter()
        .map(|label| {
            HealthCategory::ALL
                .into_iter()
                .find(|c| c.as_str().eq_ignore_ascii_case(label))
                .ok_or_else(|| ForestError::Invalid(format!("unknown health class {label:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HealthModel { forest, categories })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::analysis::forest::{Node, Tree};

    fn leaf_tree(value: Vec<f64>) -> Tree {
        Tree {
            nodes: vec![Node::Leaf { value }],
        }
    }

    fn regressor(n_features: usize, values: &[f64]) -> Forest {
        Forest {
            kind: ModelKind::Regressor,
            trained: true,
            n_features,
            classes: vec![],
            feature_importances: vec![],
            trees: values.iter().map(|v| leaf_tree(vec![*v])).collect(),
        }
    }

    fn classifier(n_features: usize, proba: Vec<f64>) -> Forest {
        Forest {
            kind: ModelKind::Classifier,
            trained: true,
            n_features,
            classes: HealthCategory::ALL.iter().map(|c| c.as_str().to_owned()).collect(),
            feature_importances: vec![],
            trees: vec![leaf_tree(proba)],
        }
    }

    fn weather() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: 75.0,
            humidity: 50.0,
            precipitation_probability: 10.0,
            wind_speed: 5.0,
            forecast_text: "Sunny".into(),
            description: String::new(),
            timestamp: Utc::now(),
            note: None,
        }
    }

    fn reading(moisture: f64) -> SensorSample {
        SensorSample {
            moisture,
            temperature: 72.0,
            light: 500.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_dir_falls_back_to_rules() {
        let dir = tempfile::tempdir().unwrap();
        let service = ModelService::load(dir.path());
        let status = service.status();
        assert!(!status.watering.loaded);
        assert!(!status.health.loaded);

        let schedule = service.predict_watering(&weather(), Some(45.0));
        assert_eq!(schedule.source, EstimateSource::RuleBased);
        assert_eq!(schedule, watering::weather_based(75.0, 50.0, 10.0, Some(45.0)));

        let result = service.assess_health(&[reading(45.0)], None, None);
        assert_eq!(result, health::score(&[reading(45.0)]));
    }

    #[test]
    fn four_feature_regressor_predicts_hours() {
        let dir = tempfile::tempdir().unwrap();
        regressor(4, &[200.0, 200.0])
            .save(&dir.path().join(WATERING_MODEL_FILE))
            .unwrap();
        let service = ModelService::load(dir.path());
        assert_eq!(service.status().watering.n_features, Some(4));

        let schedule = service.predict_watering(&weather(), Some(30.0));
        assert_eq!(schedule.source, EstimateSource::TrainedModel);
        assert_eq!(schedule.hours_until, Some(168.0));
        assert_eq!(schedule.confidence, 1.0);

        // No moisture means three inputs: mismatch, so rules answer.
        let fallback = service.predict_watering(&weather(), None);
        assert_eq!(fallback.source, EstimateSource::RuleBased);
        assert!(fallback.hours_until.is_none());
    }

    #[test]
    fn three_feature_regressor_predicts_frequency() {
        let dir = tempfile::tempdir().unwrap();
        regressor(3, &[0.2])
            .save(&dir.path().join(WATERING_MODEL_FILE))
            .unwrap();
        let service = ModelService::load(dir.path());
        let schedule = service.predict_watering(&weather(), None);
        assert_eq!(schedule.source, EstimateSource::TrainedModel);
        assert_eq!(schedule.frequency_days, 1.0);
        assert!(schedule.hours_until.is_none());
    }

    #[test]
    fn wrong_shape_models_are_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        regressor(5, &[1.0])
            .save(&dir.path().join(WATERING_MODEL_FILE))
            .unwrap();
        classifier(7, vec![0.2; 5])
            .save(&dir.path().join(HEALTH_MODEL_FILE))
            .unwrap();
        let status = ModelService::load(dir.path()).status();
        assert!(!status.watering.loaded);
        assert!(!status.health.loaded);
    }

    #[test]
    fn classifier_overrides_category_but_keeps_components() {
        let dir = tempfile::tempdir().unwrap();
        classifier(FEATURE_COUNT, vec![0.0, 0.9, 0.1, 0.0, 0.0])
            .save(&dir.path().join(HEALTH_MODEL_FILE))
            .unwrap();
        let service = ModelService::load(dir.path());

        let readings = [reading(45.0)];
        let rules = health::score(&readings);
        let result = service.assess_health(&readings, Some(&weather()), None);
        assert_eq!(result.source, EstimateSource::TrainedModel);
        assert_eq!(result.status, HealthStatus::Rated(HealthCategory::Poor));
        assert_eq!(result.score, 39.5);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.details, rules.details);
        assert_eq!(result.factors, rules.factors);
    }

    #[test]
    fn no_readings_stay_unknown_with_classifier() {
        let dir = tempfile::tempdir().unwrap();
        classifier(FEATURE_COUNT, vec![0.0, 0.0, 0.0, 0.0, 1.0])
            .save(&dir.path().join(HEALTH_MODEL_FILE))
            .unwrap();
        let service = ModelService::load(dir.path());
        let result = service.assess_health(&[], None, None);
        assert_eq!(result.status, HealthStatus::Unknown);
        assert_eq!(result.source, EstimateSource::RuleBased);
    }

    #[test]
    fn reload_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = ModelService::load(dir.path());
        assert!(!service.status().watering.loaded);

        regressor(4, &[50.0])
            .save(&dir.path().join(WATERING_MODEL_FILE))
            .unwrap();
        let status = service.reload();
        assert!(status.watering.loaded);
        assert_eq!(status.watering.n_trees, 1);

        std::fs::remove_file(dir.path().join(WATERING_MODEL_FILE)).unwrap();
        assert!(!service.reload().watering.loaded);
    }
}
