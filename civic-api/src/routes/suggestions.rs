use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use civic_shared::errors::{AppError, AppResult, ErrorCode};
use civic_shared::types::{ApiResponse, AuthUser};

use crate::models::{Comment, Location, Suggestion, Vote};
use crate::services::suggestions::{
    self as suggestion_service, SortOrder, SuggestionDraft, SuggestionView,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Search radius in kilometres; only meaningful with an origin.
    pub radius: Option<f64>,
    pub sort: Option<String>,
    pub search: Option<String>,
}

pub async fn list_suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ApiResponse<Vec<SuggestionView>>>> {
    let origin = match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => {
            let origin = Location::new(lat, lng);
            origin.validate_bounds().map_err(AppError::validation)?;
            Some(origin)
        }
        (None, None) => None,
        _ => return Err(AppError::validation("lat and lng must be supplied together")),
    };

    let sort: SortOrder = match params.sort.as_deref() {
        Some(s) => s.parse().map_err(AppError::validation)?,
        None => SortOrder::default(),
    };
    if sort == SortOrder::Nearest && origin.is_none() {
        return Err(AppError::validation("nearest ordering requires lat and lng"));
    }

    let radius = params.radius.unwrap_or(state.config.default_radius_km);
    if radius <= 0.0 {
        return Err(AppError::validation("radius must be positive"));
    }

    let mut views =
        suggestion_service::find_near(state.storage.as_ref(), origin.as_ref(), radius).await?;
    suggestion_service::attach_authors(state.storage.as_ref(), &mut views).await?;
    if let Some(search) = params.search.as_deref() {
        suggestion_service::apply_search(&mut views, search);
    }
    suggestion_service::sort_results(&mut views, sort);

    Ok(Json(ApiResponse::ok(views)))
}

pub async fn get_suggestion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<SuggestionView>>> {
    let suggestion = state
        .storage
        .get_suggestion(id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found"))?;

    let mut views = vec![SuggestionView {
        suggestion,
        distance_km: None,
        author: None,
    }];
    suggestion_service::attach_authors(state.storage.as_ref(), &mut views).await?;
    let view = views.remove(0);
    Ok(Json(ApiResponse::ok(view)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSuggestionRequest {
    #[validate(length(min = 3, max = 200, message = "title must be 3 to 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub location: Location,
    pub photo_url: Option<String>,
}

pub async fn create_suggestion(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateSuggestionRequest>,
) -> AppResult<Json<ApiResponse<Suggestion>>> {
    req.validate().map_err(super::invalid_payload)?;
    req.location.validate_bounds().map_err(AppError::validation)?;

    let suggestion = suggestion_service::submit_suggestion(
        state.storage.as_ref(),
        &state.filter,
        &user,
        SuggestionDraft {
            title: req.title,
            description: req.description,
            location: req.location,
            photo_url: req.photo_url,
        },
        state.config.ban_threshold,
    )
    .await?;

    tracing::info!(suggestion_id = suggestion.id, user_id = user.id, "suggestion created");
    Ok(Json(ApiResponse::ok(suggestion)))
}

pub async fn delete_suggestion(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    suggestion_service::delete_suggestion(state.storage.as_ref(), &user, id).await?;
    tracing::info!(suggestion_id = id, user_id = user.id, "suggestion deleted");
    Ok(Json(ApiResponse::ok_with_message((), "suggestion deleted")))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub is_upvote: bool,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub vote: Vote,
    pub suggestion: Suggestion,
}

pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<VoteRequest>,
) -> AppResult<Json<ApiResponse<VoteResponse>>> {
    let (vote, suggestion) = state.storage.cast_vote(user.id, id, req.is_upvote).await?;
    Ok(Json(ApiResponse::ok(VoteResponse { vote, suggestion })))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Comment>>>> {
    state
        .storage
        .get_suggestion(id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found"))?;
    let comments = state.storage.comments_by_suggestion(id).await?;
    Ok(Json(ApiResponse::ok(comments)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "comment must be 1 to 2000 characters"))]
    pub content: String,
    pub parent_id: Option<i32>,
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    req.validate().map_err(super::invalid_payload)?;

    let comment = suggestion_service::add_comment(
        state.storage.as_ref(),
        &state.filter,
        &user,
        id,
        req.content,
        req.parent_id,
        state.config.ban_threshold,
    )
    .await?;
    Ok(Json(ApiResponse::ok(comment)))
}
