// src/handlers/auth.rs

use axum::{
    Json,
    extract::{Query, State},
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{DeleteUserParams, LoginRequest, RefreshRequest, RegisterRequest, User},
    response::ApiResponse,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{TOKEN_USE_ACCESS, TOKEN_USE_REFRESH, sign_jwt, verify_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. The role defaults
/// to 'student' when omitted. Returns 201 Created and the user object
/// (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password, role, gender, age, contact)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, username, email, password, role, gender, age, contact, last_active, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(payload.role)
    .bind(&payload.gender)
    .bind(payload.age)
    .bind(&payload.contact)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::NotAcceptable(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok(ApiResponse::created(user).with_message("User created successfully"))
}

/// Authenticates a user and returns access and refresh tokens.
///
/// Verifies the username and password against the database and stamps
/// `last_active` on success.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password, role, gender, age, contact, last_active, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or_else(|| {
        AppError::NotFound(format!(
            "User with username '{}' does not exist.",
            payload.username
        ))
    })?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::NotAcceptable(
            "Incorrect password. Please try again.".to_string(),
        ));
    }

    sqlx::query("UPDATE users SET last_active = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await?;

    let access_token = sign_jwt(
        user.id,
        user.role.as_str(),
        TOKEN_USE_ACCESS,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;
    let refresh_token = sign_jwt(
        user.id,
        user.role.as_str(),
        TOKEN_USE_REFRESH,
        &config.jwt_secret,
        config.jwt_refresh_expiration,
    )?;

    Ok(ApiResponse::ok(serde_json::json!({
        "token": access_token,
        "refresh_token": refresh_token,
        "type": "Bearer",
        "user": user,
    })))
}

/// Exchanges a valid refresh token for a fresh access token.
pub async fn refresh_token(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RefreshRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let claims = verify_jwt(&payload.refresh_token, &config.jwt_secret)?;

    if claims.token_use != TOKEN_USE_REFRESH {
        return Err(AppError::AuthError(
            "Expected a refresh token".to_string(),
        ));
    }

    let user_id = claims.user_id()?;

    // The user may have been deleted since the refresh token was issued.
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password, role, gender, age, contact, last_active, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::AuthError("User no longer exists".to_string()))?;

    let access_token = sign_jwt(
        user.id,
        user.role.as_str(),
        TOKEN_USE_ACCESS,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(ApiResponse::ok(serde_json::json!({
        "token": access_token,
        "type": "Bearer",
    })))
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<ApiResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password, role, gender, age, contact, last_active, created_at
        FROM users
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(ApiResponse::ok(users))
}

/// Deletes a user by username.
/// Admin only.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Query(params): Query<DeleteUserParams>,
) -> Result<ApiResponse, AppError> {
    let username = params
        .username
        .ok_or(AppError::NotAcceptable("Username is required".to_string()))?;

    let result = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(&username)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User not found with username:'{}'.!",
            username
        )));
    }

    Ok(ApiResponse::ok(()).with_message(format!("User {} deleted successfully.", username)))
}
