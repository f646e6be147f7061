use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use civic_shared::errors::{AppError, AppResult, ErrorCode};
use civic_shared::types::{AccessToken, ApiResponse};

use crate::models::{NewUser, User};
use crate::services::auth as auth_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: String,
    pub password: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: AccessToken,
    pub user: User,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    req.validate().map_err(super::invalid_payload)?;
    auth_service::validate_password(&req.password)?;

    if state
        .storage
        .get_user_by_username(&req.username)
        .await?
        .is_some()
    {
        return Err(AppError::new(ErrorCode::UsernameTaken, "username already taken"));
    }
    if state
        .storage
        .get_user_by_email(&req.email.to_lowercase())
        .await?
        .is_some()
    {
        return Err(AppError::new(
            ErrorCode::EmailAlreadyExists,
            "email already registered",
        ));
    }

    let password_hash = auth_service::hash_password(&req.password)?;
    let user = state
        .storage
        .create_user(NewUser {
            username: req.username,
            password_hash,
            name: req.name,
            email: req.email.to_lowercase(),
            is_admin: false,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    let token = auth_service::create_access_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;
    Ok(Json(ApiResponse::ok(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let user = state
        .storage
        .get_user_by_email(&req.email.to_lowercase())
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"))?;

    if !auth_service::verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"));
    }
    if user.is_banned {
        return Err(AppError::new(ErrorCode::UserBanned, "account is banned"));
    }

    tracing::info!(user_id = user.id, "user logged in");

    let token = auth_service::create_access_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;
    Ok(Json(ApiResponse::ok(AuthResponse { token, user })))
}
