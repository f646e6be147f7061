use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use civic_shared::errors::{AppError, AppResult, ErrorCode};
use civic_shared::middleware::AdminUser;
use civic_shared::types::{ApiResponse, Page, PageParams};

use crate::models::{Report, Suggestion, SuggestionStatus};
use crate::services::suggestions as suggestion_service;
use crate::{demo, AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: SuggestionStatus,
    pub rejection_reason: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Suggestion>>> {
    let suggestion = suggestion_service::change_status(
        state.storage.as_ref(),
        id,
        req.status,
        req.rejection_reason,
    )
    .await?;

    tracing::info!(
        suggestion_id = id,
        admin_id = admin.0.id,
        status = %suggestion.status,
        "suggestion status updated"
    );
    Ok(Json(ApiResponse::ok(suggestion)))
}

pub async fn list_open_reports(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<ApiResponse<Page<Report>>>> {
    let (items, total) = state
        .storage
        .list_open_reports(params.offset() as i64, params.limit() as i64)
        .await?;
    Ok(Json(ApiResponse::ok(Page::new(items, total as u64, &params))))
}

pub async fn resolve_report(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let report = state.storage.resolve_report(id).await?;
    tracing::info!(report_id = id, admin_id = admin.0.id, "report resolved");
    Ok(Json(ApiResponse::ok(report)))
}

/// Wipe every table and reseed the demo fixtures. Guarded by the maintenance
/// lock so two resets cannot interleave.
pub async fn reset_demo(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<()>>> {
    if !state.config.demo_mode {
        return Err(AppError::new(
            ErrorCode::Forbidden,
            "demo reset is only available in demo mode",
        ));
    }

    let _guard = state.maintenance.lock().await;
    state.storage.reset().await?;
    demo::seed(state.storage.as_ref()).await?;

    tracing::warn!(admin_id = admin.0.id, "demo data reset");
    Ok(Json(ApiResponse::ok_with_message((), "demo data reset")))
}
