use axum::{
    routing::{get, patch, post, put},
    Router,
};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use civic_api::config::AppConfig;
use civic_api::storage::{MemoryStorage, PgStorage, Storage};
use civic_api::{demo, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    civic_shared::middleware::init_tracing("civic-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let storage: Arc<dyn Storage> = if config.demo_mode {
        tracing::info!("demo mode: using in-memory storage");
        let storage = Arc::new(MemoryStorage::new());
        demo::seed(storage.as_ref()).await?;
        storage
    } else {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder().max_size(10).build(manager)?;
        Arc::new(PgStorage::new(pool))
    };

    let state = Arc::new(AppState::new(storage, config));

    let admin_routes = Router::new()
        .route("/suggestions/:id/status", patch(routes::admin::update_status))
        .route("/reports", get(routes::admin::list_open_reports))
        .route("/reports/:id/resolve", patch(routes::admin::resolve_report))
        .route("/reset-demo", post(routes::admin::reset_demo));

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route(
            "/suggestions",
            get(routes::suggestions::list_suggestions).post(routes::suggestions::create_suggestion),
        )
        .route(
            "/suggestions/:id",
            get(routes::suggestions::get_suggestion).delete(routes::suggestions::delete_suggestion),
        )
        .route("/suggestions/:id/vote", post(routes::suggestions::cast_vote))
        .route(
            "/suggestions/:id/comments",
            get(routes::suggestions::list_comments).post(routes::suggestions::create_comment),
        )
        .route("/reports", post(routes::reports::create_report))
        .route("/profile", get(routes::profile::get_profile))
        .route("/profile/location", put(routes::profile::update_location))
        .nest("/admin", admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "civic-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
