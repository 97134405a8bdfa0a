use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::listingdb::{ListingExt, ListingFilter},
    dtos::{
        listingdtos::{CreateListingDto, ListingQueryDto, UpdateListingDto, UploadMediaDto},
        userdtos::RequestQueryDto,
    },
    error::HttpError,
    middleware::{auth, JWTAuthMiddeware},
    models::listingmodel::Listing,
    service::side_effects::SideEffect,
    AppState,
};

pub fn listings_handler() -> Router {
    let public_routes = Router::new()
        .route("/", get(get_listings))
        .route("/:id", get(get_listing));

    let protected_routes = Router::new()
        .route("/", post(create_listing))
        .route("/mine", get(get_my_listings))
        .route("/:id", put(update_listing))
        .route("/:id/media", post(upload_listing_media))
        .layer(middleware::from_fn(auth));

    public_routes.merge(protected_routes)
}

async fn load_listing(app_state: &AppState, listing_id: Uuid) -> Result<Listing, HttpError> {
    app_state
        .db_client
        .get_listing(listing_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Listing not found"))
}

pub async fn get_listings(
    Query(query_params): Query<ListingQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let filter = ListingFilter {
        category: query_params.category,
        status: query_params.status,
        promoted: query_params.promoted,
    };
    let (limit, offset) = RequestQueryDto {
        page: query_params.page,
        limit: query_params.limit,
    }
    .limit_offset();

    let listings = app_state
        .db_client
        .get_listings(filter, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let total = app_state
        .db_client
        .count_listings(filter)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "listings": listings
        },
        "results": total
    })))
}

pub async fn get_listing(
    Path(listing_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let listing = load_listing(&app_state, listing_id).await?;

    app_state
        .side_effects
        .enqueue(SideEffect::ListingViewed { listing_id: listing.id });

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "listing": listing
        }
    })))
}

pub async fn get_my_listings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let listings = app_state
        .db_client
        .get_seller_listings(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "listings": listings
        }
    })))
}

pub async fn create_listing(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateListingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let listing = app_state
        .db_client
        .create_listing(auth.user.id, body, &app_state.env.default_currency)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("Listing {} created by {}", listing.id, auth.user.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "listing": listing
        }
    })))
}

pub async fn update_listing(
    Path(listing_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateListingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let listing = load_listing(&app_state, listing_id).await?;
    if !listing.is_owned_by(auth.user.id) && !auth.user.is_admin() {
        return Err(HttpError::forbidden("You can only edit your own listings"));
    }

    let listing = app_state
        .db_client
        .update_listing(listing.id, body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "listing": listing
        }
    })))
}

pub async fn upload_listing_media(
    Path(listing_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UploadMediaDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let listing = load_listing(&app_state, listing_id).await?;
    if !listing.is_owned_by(auth.user.id) {
        return Err(HttpError::forbidden("You can only add media to your own listings"));
    }

    let url = app_state
        .media_storage
        .upload_listing_media(listing.id, &body.content_type, &body.data)
        .await?;

    let listing = app_state
        .db_client
        .append_listing_media(listing.id, &url)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "listing": listing
        }
    })))
}
