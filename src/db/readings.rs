use sqlx::PgExecutor;

use super::models::SensorReading;

const READING_COLUMNS: &str = "id, plant_id, light, moisture, temperature, recorded_at";

pub async fn insert<'e>(
    db: impl PgExecutor<'e>,
    plant_id: i64,
    light: f64,
    moisture: f64,
    temperature: f64,
) -> sqlx::Result<SensorReading> {
    sqlx::query_as::<_, SensorReading>(&format!(
        "INSERT INTO sensor_readings (plant_id, light, moisture, temperature) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {READING_COLUMNS}"
    ))
    .bind(plant_id)
    .bind(light)
    .bind(moisture)
    .bind(temperature)
    .fetch_one(db)
    .await
}

/// Up to `limit` readings, newest first.
pub async fn recent<'e>(
    db: impl PgExecutor<'e>,
    plant_id: i64,
    limit: i64,
) -> sqlx::Result<Vec<SensorReading>> {
    sqlx::query_as::<_, SensorReading>(&format!(
        "SELECT {READING_COLUMNS} FROM sensor_readings \
         WHERE plant_id = $1 \
         ORDER BY recorded_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(plant_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn latest<'e>(db: impl PgExecutor<'e>, plant_id: i64) -> sqlx::Result<Option<SensorReading>> {
    Ok(recent(db, plant_id, 1).await?.into_iter().next())
}
