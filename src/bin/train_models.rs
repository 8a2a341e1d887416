//! Trains the watering regressor and the health classifier on synthetic
//! data and writes them where the server loads models from.
//!
//! Usage:
//!   cargo run --release --bin train_models
//!   cargo run --release --bin train_models -- --model health --samples 2000

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use plant_care_service::analysis::{
    features::FEATURE_NAMES,
    forest::{accuracy, fit_classifier, fit_regressor, train_test_split, Forest, ForestParams, RegressionMetrics},
    service::{HEALTH_MODEL_FILE, WATERING_MODEL_FILE},
    synthetic::{self, DEFAULT_SAMPLES, DEFAULT_SEED},
    types::HealthCategory,
};

const TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Which {
    Watering,
    Health,
    Both,
}

#[derive(Debug, Parser)]
#[command(about = "Train plant care models on synthetic data")]
struct Args {
    /// Output directory for the model files.
    #[arg(long, env = "MODEL_DIR", default_value = "models")]
    model_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Which::Both)]
    model: Which,

    #[arg(long, default_value_t = DEFAULT_SAMPLES)]
    samples: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Train the watering model on `[T, H, P]` to predict frequency in days
    /// instead of hours from `[moisture, T, H, P]`.
    #[arg(long)]
    without_moisture: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    fs::create_dir_all(&args.model_dir)
        .with_context(|| format!("cannot create {}", args.model_dir.display()))?;

    if matches!(args.model, Which::Watering | Which::Both) {
        train_watering(&args)?;
    }
    if matches!(args.model, Which::Health | Which::Both) {
        train_health(&args)?;
    }
    Ok(())
}

fn train_watering(args: &Args) -> Result<()> {
    let include_moisture = !args.without_moisture;
    let (x, y) = synthetic::watering_samples(args.samples, include_moisture, args.seed);
    let (train, test) = train_test_split(x.len(), TEST_FRACTION, args.seed);
    info!(
        train = train.len(),
        test = test.len(),
        include_moisture,
        "Training watering regressor"
    );

    let params = ForestParams {
        seed: args.seed,
        ..ForestParams::regressor()
    };
    let forest = fit_regressor(&pick(&x, &train), &pick(&y, &train), &params)?;

    let actual = pick(&y, &test);
    let predicted = test
        .iter()
        .map(|&i| forest.predict_value(&x[i]).map(|out| out.value))
        .collect::<Result<Vec<_>, _>>()?;
    let metrics = RegressionMetrics::compute(&actual, &predicted);
    let unit = if include_moisture { "hours" } else { "days" };
    println!("Watering regressor ({unit})");
    println!("  MAE  {:.3}", metrics.mae);
    println!("  RMSE {:.3}", metrics.rmse);
    println!("  R2   {:.3}", metrics.r2);

    let names: &[&str] = if include_moisture {
        &["moisture", "temperature", "humidity", "precipitation"]
    } else {
        &["temperature", "humidity", "precipitation"]
    };
    print_importances(&forest, names, names.len());

    let path = args.model_dir.join(WATERING_MODEL_FILE);
    forest.save(&path)?;
    info!(path = %path.display(), "Saved watering model");
    Ok(())
}

fn train_health(args: &Args) -> Result<()> {
    let (x, categories) = synthetic::health_samples(args.samples, args.seed);
    let x: Vec<Vec<f64>> = x.iter().map(|v| v.to_vec()).collect();
    let labels: Vec<usize> = categories.iter().map(|c| c.index()).collect();
    let classes = HealthCategory::ALL.iter().map(|c| c.as_str().to_owned()).collect();

    let (train, test) = train_test_split(x.len(), TEST_FRACTION, args.seed);
    info!(train = train.len(), test = test.len(), "Training health classifier");

    let params = ForestParams {
        seed: args.seed,
        ..ForestParams::classifier()
    };
    let forest = fit_classifier(&pick(&x, &train), &pick(&labels, &train), classes, &params)?;

    let predicted = test
        .iter()
        .map(|&i| forest.predict_class(&x[i]).map(|(class, _)| class))
        .collect::<Result<Vec<_>, _>>()?;
    println!("Health classifier");
    println!("  accuracy {:.3}", accuracy(&pick(&labels, &test), &predicted));
    for category in HealthCategory::ALL {
        let n = labels.iter().filter(|&&l| l == category.index()).count();
        println!("  {:<10} {n} samples", category.as_str());
    }
    print_importances(&forest, &FEATURE_NAMES, 10);

    let path = args.model_dir.join(HEALTH_MODEL_FILE);
    forest.save(&path)?;
    info!(path = %path.display(), "Saved health model");
    Ok(())
}

fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

fn print_importances(forest: &Forest, names: &[&str], top: usize) {
    let mut ranked: Vec<(&str, f64)> = names
        .iter()
        .copied()
        .zip(forest.feature_importances.iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("  top features:");
    for (name, importance) in ranked.into_iter().take(top) {
        println!("    {name:<28} {importance:.4}");
    }
}
