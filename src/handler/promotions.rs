use std::sync::Arc;

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::promotiondtos::{parse_review_action, PurchasePromotionDto, ReviewPromotionDto},
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn promotions_handler() -> Router {
    let public_routes = Router::new().route("/packages", get(get_promotion_packages));

    let protected_routes = Router::new()
        .route("/purchase", post(purchase_promotion))
        .route(
            "/admin",
            get(get_pending_promotions)
                .post(review_promotion)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![UserRole::Admin])
                })),
        )
        .layer(middleware::from_fn(auth));

    public_routes.merge(protected_routes)
}

pub async fn get_promotion_packages(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let packages = app_state.promotion_service.packages().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "packages": packages
    })))
}

pub async fn purchase_promotion(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<PurchasePromotionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (payment, promotion) = app_state
        .promotion_service
        .purchase(&auth.user, body)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "payment": payment,
        "promotion": promotion
    })))
}

pub async fn get_pending_promotions(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let promotions = app_state.promotion_service.pending().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": promotions
    })))
}

pub async fn review_promotion(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ReviewPromotionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let promotion_id = body
        .promotion_id
        .ok_or_else(|| HttpError::bad_request("promotion_id is required"))?;
    let action = body
        .action
        .as_deref()
        .and_then(parse_review_action)
        .ok_or_else(|| HttpError::bad_request("action must be 'approve' or 'reject'"))?;

    let promotion = app_state
        .promotion_service
        .review(auth.user.id, promotion_id, action, body.admin_notes)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "promotion": promotion,
            "message": format!("Promotion {}", promotion.status.to_str())
        }
    })))
}
