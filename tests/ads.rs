//! Ad campaign lifecycle against a real database.
//!
//! Run with `DATABASE_URL` pointing at a disposable Postgres and `--ignored`.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_state, build_test_app, create_listing, create_user, get, post_json};
use marketnest::db::addb::AdExt;
use marketnest::db::paymentdb::PaymentExt;
use marketnest::models::paymentmodel::PaymentStatus;
use marketnest::models::usermodel::UserRole;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn approved_campaign_is_served_and_counted(pool: PgPool) {
    let state = build_state(pool.clone());
    let (seller, seller_token) = create_user(&state, "seller", UserRole::User).await;
    let (_admin, admin_token) = create_user(&state, "admin", UserRole::Admin).await;
    let listing = create_listing(&state, &seller, None).await;

    let response = post_json(
        build_test_app(state.clone()),
        "/api/ads",
        Some(&seller_token),
        serde_json::json!({
            "title": "Open house this weekend",
            "listing_id": listing.id,
            "placement": "home_banner",
            "budget": 20_000,
            "duration_days": 7,
            "payment_method": "mobile_money",
            "phone_number": "+237650000000"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["campaign"]["status"], "pending");
    assert!(json["payment"]["reference"].as_str().unwrap().starts_with("ADS-"));
    let campaign_id: Uuid = json["campaign"]["id"].as_str().unwrap().parse().unwrap();
    let reference = json["payment"]["reference"].as_str().unwrap().to_string();

    // Pending campaigns are never served
    let response = get(build_test_app(state.clone()), "/api/ads/active?placement=home_banner", None).await;
    assert!(body_json(response).await["campaigns"].as_array().unwrap().is_empty());

    // Review lands after the payment window closed
    sqlx::query("UPDATE payment_transactions SET expires_at = NOW() - INTERVAL '1 hour'")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(state.db_client.expire_stale_payments().await.unwrap(), 1);

    let response = post_json(
        build_test_app(state.clone()),
        "/api/ads/admin",
        Some(&admin_token),
        serde_json::json!({ "campaign_id": campaign_id, "action": "approve" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["campaign"]["status"], "active");

    let payment = state
        .db_client
        .get_payment_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);

    let response = get(build_test_app(state.clone()), "/api/ads/active?placement=home_banner", None).await;
    let json = body_json(response).await;
    let served = json["campaigns"].as_array().unwrap();
    assert_eq!(served.len(), 1);
    assert_eq!(served[0]["id"], campaign_id.to_string());

    let response = post_json(
        build_test_app(state.clone()),
        &format!("/api/ads/{}/click", campaign_id),
        None,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Impressions are recorded by the background worker
    let mut campaign = state.db_client.get_campaign(campaign_id).await.unwrap().unwrap();
    for _ in 0..50 {
        if campaign.impressions > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        campaign = state.db_client.get_campaign(campaign_id).await.unwrap().unwrap();
    }
    assert_eq!(campaign.impressions, 1);
    assert_eq!(campaign.clicks, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn clicks_on_unknown_campaigns_are_not_found(pool: PgPool) {
    let app = build_test_app(build_state(pool));
    let response = post_json(
        app,
        &format!("/api/ads/{}/click", Uuid::new_v4()),
        None,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
