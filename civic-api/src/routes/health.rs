use axum::Json;

use civic_shared::types::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("civic-api", env!("CARGO_PKG_VERSION")))
}
