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
    dtos::visitdtos::{
        AdminCancelVisitDto, ConfirmVisitPaymentDto, CreateVisitRequestDto, VisitAdminQueryDto,
        VisitRequestIdDto,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn visits_handler() -> Router {
    Router::new()
        .route("/", post(create_visit_request))
        .route("/mine", get(get_my_visit_requests))
        .route("/:id/cancel", post(cancel_visit_request))
        .route(
            "/admin",
            get(get_visit_requests_admin).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            })),
        )
        .route(
            "/admin/confirm-payment",
            post(confirm_visit_payment).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            })),
        )
        .route(
            "/admin/cancel",
            post(admin_cancel_visit).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            })),
        )
        .route(
            "/release",
            post(release_visit_payout).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            })),
        )
}

fn required_id(id: Option<Uuid>) -> Result<Uuid, HttpError> {
    id.ok_or_else(|| HttpError::bad_request("visit_request_id is required"))
}

pub async fn create_visit_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateVisitRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (visit_request, payment) = app_state
        .visit_service
        .create_visit_request(&auth.user, body)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "visit_request": visit_request,
        "payment": payment
    })))
}

pub async fn get_my_visit_requests(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let visits = app_state.visit_service.buyer_visits(auth.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "visits": visits
    })))
}

pub async fn cancel_visit_request(
    Path(visit_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let visit = app_state
        .visit_service
        .cancel_by_buyer(auth.user.id, visit_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "visit": visit
    })))
}

pub async fn get_visit_requests_admin(
    Query(query_params): Query<VisitAdminQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let visits = app_state
        .visit_service
        .admin_visits(query_params.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "visits": visits
    })))
}

pub async fn confirm_visit_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ConfirmVisitPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let visit_id = required_id(body.visit_request_id)?;

    let visit = app_state
        .visit_service
        .confirm_payment(auth.user.id, visit_id, body.gateway_reference)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "visit": visit
    })))
}

pub async fn admin_cancel_visit(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<AdminCancelVisitDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let visit_id = required_id(body.visit_request_id)?;

    let visit = app_state
        .visit_service
        .admin_cancel(auth.user.id, visit_id, body.reason)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "visit": visit
    })))
}

pub async fn release_visit_payout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<VisitRequestIdDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let visit_id = required_id(body.visit_request_id)?;

    let visit = app_state
        .visit_service
        .release_payout(auth.user.id, visit_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "visit": visit
    })))
}
