//! Customer registration, login and profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use validator::Validate;

use super::{message, ApiJson};
use crate::auth::{hash_password, verify_password, AuthError, CustomerAuth};
use crate::db::users::NewUser;
use crate::db::{RepositoryError, UserRepository};
use crate::domain::aggregates::account::ProfileChanges;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/user", get(current_user).put(update_user))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "First name is required"))]
    first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Last name is required"))]
    last_name: String,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    age: Option<i32>,
}

async fn register(State(state): State<AppState>, ApiJson(req): ApiJson<RegisterRequest>) -> Result<(StatusCode, Json<Value>)> {
    req.validate()?;

    let password_hash = hash_password(&req.password)?;
    let user = UserRepository::new(state.pool())
        .create(NewUser {
            email: &req.email,
            password_hash: &password_hash,
            first_name: &req.first_name,
            last_name: &req.last_name,
            age: req.age,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::Conflict("Email already registered".into()),
            other => other.into(),
        })?;

    let token = state.tokens().issue_customer(&user)?;
    tracing::info!(user_id = %user.id, "Customer registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "token": token, "user": user.profile() })),
    ))
}

/// Names are validated and stored without surrounding whitespace.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

fn trimmed_opt<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(State(state): State<AppState>, ApiJson(req): ApiJson<LoginRequest>) -> Result<Json<Value>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Email and password required".into()));
    }

    let user = UserRepository::new(state.pool())
        .get_by_email(&req.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    verify_password(&req.password, &user.password_hash)?;

    let token = state.tokens().issue_customer(&user)?;
    Ok(Json(json!({ "message": "Login successful", "token": token, "user": user.profile() })))
}

async fn current_user(State(state): State<AppState>, auth: CustomerAuth) -> Result<Json<Value>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(json!({ "user": user.profile() })))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
struct UpdateUserRequest {
    #[serde(deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    first_name: Option<String>,
    #[serde(deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    last_name: Option<String>,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    age: Option<i32>,
    current_password: Option<String>,
    new_password: Option<String>,
}

/// A password change needs the current password; other fields do not.
async fn update_user(
    State(state): State<AppState>,
    auth: CustomerAuth,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<Value>> {
    req.validate()?;
    let users = UserRepository::new(state.pool());
    let user = users.get_by_id(auth.user_id).await?.ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let password_hash = match req.new_password.as_deref().filter(|p| !p.is_empty()) {
        None => None,
        Some(new_password) => {
            let current = req
                .current_password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::BadRequest("Current password required".into()))?;
            verify_password(current, &user.password_hash).map_err(|_| AuthError::WrongPassword)?;
            Some(hash_password(new_password)?)
        }
    };

    let changes = ProfileChanges {
        first_name: req.first_name,
        last_name: req.last_name,
        age: req.age,
        password_hash,
    };
    let user = users.update_profile(user.id, &changes).await?;
    tracing::info!(user_id = %user.id, password_changed = changes.password_hash.is_some(), "Profile updated");

    Ok(Json(json!({ "message": "User updated successfully", "user": user.profile() })))
}

async fn logout(_auth: CustomerAuth) -> Json<Value> { message("Logged out successfully") }
