use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use civic_shared::errors::AppResult;
use civic_shared::types::{ApiResponse, AuthUser};

use crate::models::Report;
use crate::services::reports::{self as report_service, ReportDraft};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 50, message = "reason must be 1 to 50 characters"))]
    pub reason: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub suggestion_id: Option<i32>,
    pub comment_id: Option<i32>,
    pub photo_url: Option<String>,
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReportRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    req.validate().map_err(super::invalid_payload)?;

    let report = report_service::file_report(
        state.storage.as_ref(),
        &user,
        ReportDraft {
            reason: req.reason,
            description: req.description,
            suggestion_id: req.suggestion_id,
            comment_id: req.comment_id,
            photo_url: req.photo_url,
        },
    )
    .await?;

    tracing::info!(report_id = report.id, user_id = user.id, "report filed");
    Ok(Json(ApiResponse::ok(report)))
}
