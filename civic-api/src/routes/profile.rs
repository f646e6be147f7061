use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use civic_shared::errors::{AppError, AppResult, ErrorCode};
use civic_shared::types::{ApiResponse, AuthUser};

use crate::models::{Location, Suggestion, User};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub suggestions: Vec<Suggestion>,
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = state
        .storage
        .get_user(user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
    let suggestions = state.storage.suggestions_by_user(user.id).await?;
    Ok(Json(ApiResponse::ok(ProfileResponse {
        user: profile,
        suggestions,
    })))
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(location): Json<Location>,
) -> AppResult<Json<ApiResponse<User>>> {
    location.validate_bounds().map_err(AppError::validation)?;
    let user = state.storage.update_user_location(user.id, location).await?;
    Ok(Json(ApiResponse::ok(user)))
}
