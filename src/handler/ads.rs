use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        addtos::{ActiveAdsQueryDto, AdCampaignDto, CreateAdCampaignDto, ReviewCampaignDto},
        promotiondtos::parse_review_action,
    },
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn ads_handler() -> Router {
    let public_routes = Router::new()
        .route("/active", get(get_active_ads))
        .route("/:id/click", post(record_ad_click));

    let protected_routes = Router::new()
        .route("/", post(create_ad_campaign))
        .route("/mine", get(get_my_campaigns))
        .route(
            "/admin",
            get(get_pending_campaigns)
                .post(review_campaign)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![UserRole::Admin])
                })),
        )
        .layer(middleware::from_fn(auth));

    public_routes.merge(protected_routes)
}

pub async fn create_ad_campaign(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateAdCampaignDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (payment, campaign) = app_state.ad_service.create_campaign(&auth.user, body).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "payment": payment,
        "campaign": campaign
    })))
}

pub async fn get_my_campaigns(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let campaigns: Vec<AdCampaignDto> = app_state
        .ad_service
        .advertiser_campaigns(auth.user.id)
        .await?
        .into_iter()
        .map(AdCampaignDto::from)
        .collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "campaigns": campaigns
    })))
}

pub async fn get_active_ads(
    Query(query_params): Query<ActiveAdsQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let campaigns: Vec<AdCampaignDto> = app_state
        .ad_service
        .serve(query_params.placement)
        .await?
        .into_iter()
        .map(AdCampaignDto::from)
        .collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "campaigns": campaigns
    })))
}

pub async fn record_ad_click(
    Path(campaign_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.ad_service.record_click(campaign_id).await?;

    Ok(Json(serde_json::json!({ "status": "success" })))
}

pub async fn get_pending_campaigns(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let campaigns = app_state.ad_service.pending().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": campaigns
    })))
}

pub async fn review_campaign(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ReviewCampaignDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let campaign_id = body
        .campaign_id
        .ok_or_else(|| HttpError::bad_request("campaign_id is required"))?;
    let action = body
        .action
        .as_deref()
        .and_then(parse_review_action)
        .ok_or_else(|| HttpError::bad_request("action must be 'approve' or 'reject'"))?;

    let campaign = app_state
        .ad_service
        .review(auth.user.id, campaign_id, action, body.admin_notes)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "campaign": campaign,
            "message": format!("Campaign {}", campaign.status.to_str())
        }
    })))
}
