use sqlx::PgExecutor;

use super::models::User;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, location, latitude, longitude, created_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub location: &'a str,
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_username<'e>(
    db: impl PgExecutor<'e>,
    username: &str,
) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(db)
    .await
}

pub async fn username_exists<'e>(db: impl PgExecutor<'e>, username: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(db)
        .await
}

pub async fn email_exists<'e>(db: impl PgExecutor<'e>, email: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(db)
        .await
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, user: &NewUser<'_>) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password_hash, location, latitude, longitude) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.location)
    .bind(user.latitude)
    .bind(user.longitude)
    .fetch_one(db)
    .await
}

pub async fn update_location<'e>(
    db: impl PgExecutor<'e>,
    id: i64,
    location: &str,
    latitude: f64,
    longitude: f64,
) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET location = $2, latitude = $3, longitude = $4 \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(location)
    .bind(latitude)
    .bind(longitude)
    .fetch_optional(db)
    .await
}
