use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use super::models::{Plant, ProfileColumns};

const PLANT_COLUMNS: &str = "id, user_id, name, sensor_id, plant_type, planted_at, \
     last_watered_at, optimal_moisture_min, optimal_moisture_max, optimal_temp_min, \
     optimal_temp_max, optimal_light_min, optimal_light_max, watering_frequency_days, \
     care_level, native_climate, created_at";

pub async fn list_for_user<'e>(db: impl PgExecutor<'e>, user_id: i64) -> sqlx::Result<Vec<Plant>> {
    sqlx::query_as::<_, Plant>(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE user_id = $1 ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// The plant, only if `user_id` owns it.
pub async fn find_owned<'e>(
    db: impl PgExecutor<'e>,
    id: i64,
    user_id: i64,
) -> sqlx::Result<Option<Plant>> {
    sqlx::query_as::<_, Plant>(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn first_for_user<'e>(db: impl PgExecutor<'e>, user_id: i64) -> sqlx::Result<Option<Plant>> {
    sqlx::query_as::<_, Plant>(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE user_id = $1 ORDER BY id LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn find_by_sensor_id<'e>(
    db: impl PgExecutor<'e>,
    sensor_id: &str,
) -> sqlx::Result<Option<Plant>> {
    sqlx::query_as::<_, Plant>(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE sensor_id = $1"
    ))
    .bind(sensor_id)
    .fetch_optional(db)
    .await
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: i64) -> sqlx::Result<Option<Plant>> {
    sqlx::query_as::<_, Plant>(&format!("SELECT {PLANT_COLUMNS} FROM plants WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert<'e>(
    db: impl PgExecutor<'e>,
    user_id: i64,
    name: &str,
    sensor_id: &str,
    profile: &ProfileColumns,
) -> sqlx::Result<Plant> {
    sqlx::query_as::<_, Plant>(&format!(
        "INSERT INTO plants (user_id, name, sensor_id, plant_type, planted_at, last_watered_at, \
             optimal_moisture_min, optimal_moisture_max, optimal_temp_min, optimal_temp_max, \
             optimal_light_min, optimal_light_max, watering_frequency_days, care_level, \
             native_climate) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING {PLANT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(name)
    .bind(sensor_id)
    .bind(&profile.plant_type)
    .bind(profile.planted_at)
    .bind(profile.last_watered_at)
    .bind(profile.optimal_moisture_min)
    .bind(profile.optimal_moisture_max)
    .bind(profile.optimal_temp_min)
    .bind(profile.optimal_temp_max)
    .bind(profile.optimal_light_min)
    .bind(profile.optimal_light_max)
    .bind(profile.watering_frequency_days)
    .bind(&profile.care_level)
    .bind(&profile.native_climate)
    .fetch_one(db)
    .await
}

/// Replace every profile column of an owned plant.
pub async fn update_profile<'e>(
    db: impl PgExecutor<'e>,
    id: i64,
    user_id: i64,
    profile: &ProfileColumns,
) -> sqlx::Result<Option<Plant>> {
    sqlx::query_as::<_, Plant>(&format!(
        "UPDATE plants SET plant_type = $3, planted_at = $4, last_watered_at = $5, \
             optimal_moisture_min = $6, optimal_moisture_max = $7, optimal_temp_min = $8, \
             optimal_temp_max = $9, optimal_light_min = $10, optimal_light_max = $11, \
             watering_frequency_days = $12, care_level = $13, native_climate = $14 \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {PLANT_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(&profile.plant_type)
    .bind(profile.planted_at)
    .bind(profile.last_watered_at)
    .bind(profile.optimal_moisture_min)
    .bind(profile.optimal_moisture_max)
    .bind(profile.optimal_temp_min)
    .bind(profile.optimal_temp_max)
    .bind(profile.optimal_light_min)
    .bind(profile.optimal_light_max)
    .bind(profile.watering_frequency_days)
    .bind(&profile.care_level)
    .bind(&profile.native_climate)
    .fetch_optional(db)
    .await
}

pub async fn mark_watered<'e>(
    db: impl PgExecutor<'e>,
    id: i64,
    user_id: i64,
    at: DateTime<Utc>,
) -> sqlx::Result<Option<Plant>> {
    sqlx::query_as::<_, Plant>(&format!(
        "UPDATE plants SET last_watered_at = $3 WHERE id = $1 AND user_id = $2 \
         RETURNING {PLANT_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(at)
    .fetch_optional(db)
    .await
}

/// Returns whether a row was deleted. Readings go with it.
pub async fn delete_owned<'e>(db: impl PgExecutor<'e>, id: i64, user_id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM plants WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
