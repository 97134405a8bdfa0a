use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::walletdb::WalletExt,
    dtos::{userdtos::RequestQueryDto, walletdtos::WalletResponseDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn wallet_handler() -> Router {
    Router::new()
        .route("/", get(get_wallet))
        .route("/transactions", get(get_wallet_transactions))
        .route("/transactions/:reference", get(get_transaction_by_reference))
}

pub async fn get_wallet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let wallet = app_state
        .db_client
        .get_wallet(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let wallet = match wallet {
        Some(wallet) => WalletResponseDto::from_wallet(&wallet),
        None => WalletResponseDto::empty(&app_state.env.default_currency),
    };

    Ok(Json(serde_json::json!({
        "status": "success",
        "wallet": wallet
    })))
}

pub async fn get_wallet_transactions(
    Query(query_params): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (limit, offset) = query_params.limit_offset();
    let transactions = app_state
        .db_client
        .get_wallet_transactions(auth.user.id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "transactions": transactions,
        "results": transactions.len()
    })))
}

pub async fn get_transaction_by_reference(
    Path(reference): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let transaction = app_state
        .db_client
        .get_transaction_by_reference(auth.user.id, &reference)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Transaction not found"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "transaction": transaction
    })))
}
