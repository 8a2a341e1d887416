//! Sensor-side client: stores one reading for a plant directly in Postgres.
//!
//! Usage:
//!   send_reading 3
//!   send_reading --sensor-id pi-kitchen --moisture 41.5 --temperature 70.2 --light 512
//!
//! Values not given on the command line are simulated.

use anyhow::{bail, Result};
use clap::Parser;
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plant_care_service::{
    db,
    sensors::{ReadingInput, ReadingTarget, SensorService},
};

#[derive(Debug, Parser)]
#[command(about = "Send one sensor reading for a plant")]
struct Args {
    /// Plant to record for.
    #[arg(env = "PLANT_ID")]
    plant_id: Option<i64>,

    /// Address the plant by its sensor id instead.
    #[arg(long, env = "SENSOR_ID", conflicts_with = "plant_id")]
    sensor_id: Option<String>,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Soil moisture percentage.
    #[arg(long)]
    moisture: Option<f64>,

    /// Degrees Fahrenheit.
    #[arg(long)]
    temperature: Option<f64>,

    /// Lux.
    #[arg(long)]
    light: Option<f64>,
}

impl Args {
    fn target(&self) -> Result<ReadingTarget> {
        match (&self.sensor_id, self.plant_id) {
            (Some(sensor_id), _) => Ok(ReadingTarget::Sensor(sensor_id.clone())),
            (None, Some(id)) => Ok(ReadingTarget::Plant(id)),
            (None, None) => bail!("a plant id (argument or PLANT_ID) or --sensor-id is required"),
        }
    }

    /// Reading from the flags, filling gaps with plausible indoor values.
    fn reading(&self, rng: &mut impl Rng) -> ReadingInput {
        ReadingInput {
            moisture: self.moisture.unwrap_or_else(|| rng.gen_range(40.0..60.0)),
            temperature: self.temperature.unwrap_or_else(|| rng.gen_range(70.0..75.0)),
            light: self.light.unwrap_or_else(|| rng.gen_range(400.0..600.0)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let target = args.target()?;
    let input = args.reading(&mut rand::thread_rng());

    let pool = db::create_pool(&args.database_url).await?;
    let (plant, reading) = SensorService::new(pool).record(&target, None, input).await?;

    info!(
        plant_id = plant.id,
        plant = %plant.name,
        reading_id = reading.id,
        recorded_at = %reading.recorded_at,
        "Reading sent"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(
            ["send_reading", "--database-url", "postgres://localhost/db"]
                .iter()
                .chain(args),
        )
        .unwrap()
    }

    #[test]
    fn plant_id_is_positional() {
        let args = parse(&["3"]);
        assert_eq!(args.target().unwrap(), ReadingTarget::Plant(3));
    }

    #[test]
    fn sensor_id_and_plant_id_conflict() {
        let result = Args::try_parse_from([
            "send_reading",
            "--database-url",
            "x",
            "--sensor-id",
            "pi-1",
            "3",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_values_are_simulated_within_range() {
        let args = parse(&["3", "--moisture", "12.5"]);
        let reading = args.reading(&mut StdRng::seed_from_u64(9));
        assert_eq!(reading.moisture, 12.5);
        assert!((70.0..75.0).contains(&reading.temperature));
        assert!((400.0..600.0).contains(&reading.light));
        assert!(reading.validate().is_ok());
    }
}
