// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        ads::ads_handler, auth::auth_handler, listings::listings_handler,
        payments::payments_handler, promotions::promotions_handler, visits::visits_handler,
        wallet::wallet_handler,
    },
    middleware::auth,
    AppState,
};

// Health check handler
async fn health_check(Extension(app_state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let (size, idle) = app_state.db_client.pool_status();

    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "side_effects": app_state.side_effects.counts(),
        "database": {
            "read_tier": app_state.db_client.read_tier_status(),
            "pool_size": size,
            "pool_idle": idle
        }
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/listings", listings_handler())
        .nest(
            "/visits",
            visits_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/wallet",
            wallet_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/promotions", promotions_handler())
        .nest("/ads", ads_handler())
        .nest("/payments", payments_handler())
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .layer(Extension(app_state))
}
