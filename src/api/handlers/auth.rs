use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;

use super::load_user;
use crate::{
    api::{
        dto::{
            AuthResponse, LocationRequest, LocationResponse, LoginRequest, MessageResponse,
            RegisterRequest, UserDto,
        },
        errors::{ApiJson, AppError},
        AppState,
    },
    auth::{hash_password, verify_password, AuthUser},
    db::{self, is_unique_violation, users::NewUser},
    weather::WeatherClient,
};

const DEFAULT_LOCATION: (&str, f64, f64) = ("New York, NY", 40.7128, -74.0060);

type WithCookie<T> = ([(axum::http::HeaderName, String); 1], Json<T>);

/// A non-blank trimmed value.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// Place name and coordinates from either a geocodable name (preferred) or
/// raw coordinates. `Ok(None)` when neither was given.
async fn resolve_location(
    weather: &WeatherClient,
    location: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    hint: &str,
) -> Result<Option<(String, f64, f64)>, AppError> {
    if let Some(name) = present(location) {
        return match weather.geocode(&name).await {
            Some((lat, lon)) => Ok(Some((name, lat, lon))),
            None => Err(AppError::BadRequest(format!(
                "Could not find location: {name}. {hint}"
            ))),
        };
    }
    match (latitude, longitude) {
        (Some(lat), Some(lon)) if valid_coordinates(lat, lon) => {
            Ok(Some((format!("{lat:.4}, {lon:.4}"), lat, lon)))
        }
        (Some(_), Some(_)) => Err(AppError::BadRequest("Invalid coordinates".into())),
        _ => Ok(None),
    }
}

/// Create an account and log it in.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session cookie set", body = AuthResponse),
        (status = 400, description = "Missing fields, duplicate user or unknown location"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, WithCookie<AuthResponse>), AppError> {
    let (Some(username), Some(email), Some(password)) =
        (present(req.username), present(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::BadRequest("Missing required fields".into()));
    };

    let (location, latitude, longitude) = resolve_location(
        &state.weather,
        req.location,
        req.latitude,
        req.longitude,
        "Please try a more specific location (e.g., \"City, State\" or \"City, Country\")",
    )
    .await?
    .unwrap_or_else(|| {
        let (name, lat, lon) = DEFAULT_LOCATION;
        (name.to_owned(), lat, lon)
    });

    let password_hash = hash_password(&password)?;

    let mut tx = state.pool.begin().await?;
    if db::users::username_exists(&mut *tx, &username).await? {
        return Err(AppError::BadRequest("Username already exists".into()));
    }
    if db::users::email_exists(&mut *tx, &email).await? {
        return Err(AppError::BadRequest("Email already registered".into()));
    }
    let user = db::users::insert(
        &mut *tx,
        &NewUser {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            location: &location,
            latitude,
            longitude,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "users_username_key") {
            AppError::BadRequest("Username already exists".into())
        } else if is_unique_violation(&e, "users_email_key") {
            AppError::BadRequest("Email already registered".into())
        } else {
            e.into()
        }
    })?;
    tx.commit().await?;

    info!(user_id = user.id, username = %user.username, "Registered user");
    let cookie = state.sessions.issue_cookie(user.id, Utc::now())?;
    Ok((
        StatusCode::CREATED,
        (
            [(SET_COOKIE, cookie)],
            Json(AuthResponse {
                message: "Registration successful".into(),
                user: user.into(),
            }),
        ),
    ))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = AuthResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid username or password"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<WithCookie<AuthResponse>, AppError> {
    let (Some(username), Some(password)) =
        (present(req.username), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::BadRequest("Username and password required".into()));
    };

    let user = match db::users::find_by_username(&state.pool, &username).await? {
        Some(user) if verify_password(&password, &user.password_hash)? => user,
        _ => {
            info!(username = %username, "Rejected login");
            return Err(AppError::Unauthorized("Invalid username or password".into()));
        }
    };

    let cookie = state.sessions.issue_cookie(user.id, Utc::now())?;
    Ok((
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            message: "Login successful".into(),
            user: user.into(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> WithCookie<MessageResponse> {
    info!(user_id, "Logged out");
    (
        [(SET_COOKIE, state.sessions.clear_cookie())],
        Json(MessageResponse::new("Logout successful")),
    )
}

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "The logged-in user", body = UserDto),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "auth"
)]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserDto>, AppError> {
    Ok(Json(load_user(&state.pool, user_id).await?.into()))
}

/// Set the user's location from a place name or from coordinates.
#[utoipa::path(
    put,
    path = "/api/user/location",
    request_body = LocationRequest,
    responses(
        (status = 200, description = "Location updated", body = LocationResponse),
        (status = 400, description = "Unknown place or invalid coordinates"),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "auth"
)]
pub async fn update_location(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<LocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    let (location, latitude, longitude) = resolve_location(
        &state.weather,
        req.location,
        req.latitude,
        req.longitude,
        "Please try a more specific location.",
    )
    .await?
    .ok_or_else(|| AppError::BadRequest("Location name or coordinates are required".into()))?;

    let user = db::users::update_location(&state.pool, user_id, &location, latitude, longitude)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    info!(user_id, location = %user.location, "Updated user location");
    Ok(Json(LocationResponse {
        message: "Location updated successfully".into(),
        location: user.location,
        latitude: user.latitude,
        longitude: user.longitude,
    }))
}
