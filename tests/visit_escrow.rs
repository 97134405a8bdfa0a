//! Visit fee escrow flow against a real database.
//!
//! Run with `DATABASE_URL` pointing at a disposable Postgres and `--ignored`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{
    body_json, build_state, build_state_with_gateway, build_test_app, create_listing,
    create_listing_in, create_user, get, post_json, ScriptedGateway,
};
use marketnest::db::paymentdb::PaymentExt;
use marketnest::db::visitdb::VisitExt;
use marketnest::db::walletdb::WalletExt;
use marketnest::models::paymentmodel::PaymentStatus;
use marketnest::models::usermodel::UserRole;
use marketnest::models::visitmodel::{PayoutStatus, VisitStatus};
use marketnest::AppState;
use sqlx::PgPool;
use uuid::Uuid;

fn visit_body(listing_id: uuid::Uuid) -> serde_json::Value {
    serde_json::json!({
        "listing_id": listing_id,
        "payment_method": "mobile_money",
        "phone_number": "+237670000000",
        "message": "Saturday morning works for me"
    })
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn visit_fee_is_split_and_released_once(pool: PgPool) {
    let state = build_state(pool.clone());
    let (seller, seller_token) = create_user(&state, "seller", UserRole::User).await;
    let (_buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;
    let (_admin, admin_token) = create_user(&state, "admin", UserRole::Admin).await;
    let listing = create_listing(&state, &seller, Some(10_000)).await;

    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits",
        Some(&buyer_token),
        visit_body(listing.id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let visit = &json["visit_request"];
    assert_eq!(visit["status"], "pending_payment");
    assert_eq!(visit["visit_fee_amount"], 10_000);
    assert_eq!(visit["platform_fee"], 3_000);
    assert_eq!(visit["seller_payout"], 7_000);
    assert!(json["payment"]["reference"].as_str().unwrap().starts_with("VISIT-"));
    let visit_id = visit["id"].as_str().unwrap().to_string();

    common::wait_for_notification(&state, seller.id, "visit_requested").await;

    // Releasing before payment is confirmed is refused
    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/release",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Out-of-band payments need a receipt reference
    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/admin/confirm-payment",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/admin/confirm-payment",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id, "gateway_reference": "MOMO-88231" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["visit"]["status"], "paid");

    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/release",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["visit"]["status"], "released");
    assert_eq!(json["visit"]["payout_status"], "released");

    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/release",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(build_test_app(state.clone()), "/api/wallet", Some(&seller_token)).await;
    let json = body_json(response).await;
    assert_eq!(json["wallet"]["balance"], 7_000);
    assert_eq!(json["wallet"]["available_balance"], 7_000);

    let response = get(
        build_test_app(state.clone()),
        "/api/wallet/transactions",
        Some(&seller_token),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["results"], 1);
    let transaction = &json["transactions"][0];
    assert_eq!(transaction["transaction_type"], "deposit");
    assert_eq!(transaction["previous_balance"], 0);
    assert_eq!(transaction["new_balance"], 7_000);
    assert_eq!(transaction["reference"], format!("VISIT-{}", visit_id));

    let ledger_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ledger_rows, 1);

    let entry = state
        .db_client
        .get_transaction_by_reference(seller.id, &format!("VISIT-{}", visit_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.amount, 7_000);
    assert_eq!(entry.new_balance, entry.previous_balance + entry.amount);

    let response = get(
        build_test_app(state.clone()),
        &format!("/api/wallet/transactions/VISIT-{}", visit_id),
        Some(&seller_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["transaction"]["amount"], 7_000);

    // Another user's ledger entry is not visible
    let response = get(
        build_test_app(state.clone()),
        &format!("/api/wallet/transactions/VISIT-{}", visit_id),
        Some(&buyer_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    common::wait_for_notification(&state, seller.id, "payout_released").await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn non_admin_cannot_release(pool: PgPool) {
    let state = build_state(pool);
    let (_buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;

    let response = post_json(
        build_test_app(state),
        "/api/visits/release",
        Some(&buyer_token),
        serde_json::json!({ "visit_request_id": uuid::Uuid::new_v4() }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn listing_without_visit_fee_rejects_requests(pool: PgPool) {
    let state = build_state(pool);
    let (seller, _) = create_user(&state, "seller", UserRole::User).await;
    let (_buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;
    let listing = create_listing(&state, &seller, None).await;

    let response = post_json(
        build_test_app(state),
        "/api/visits",
        Some(&buyer_token),
        visit_body(listing.id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn paid_visit_cancelled_by_admin_is_refunded(pool: PgPool) {
    let state = build_state(pool);
    let (seller, _) = create_user(&state, "seller", UserRole::User).await;
    let (buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;
    let (_admin, admin_token) = create_user(&state, "admin", UserRole::Admin).await;
    let listing = create_listing(&state, &seller, Some(5_000)).await;

    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits",
        Some(&buyer_token),
        visit_body(listing.id),
    )
    .await;
    let visit_id = body_json(response).await["visit_request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/admin/confirm-payment",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id, "gateway_reference": "MOMO-11111" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/admin/cancel",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id, "reason": "Seller withdrew the listing" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["visit"]["status"], "cancelled");
    assert_eq!(json["visit"]["payout_status"], "refunded");

    // Nothing left to release
    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits/release",
        Some(&admin_token),
        serde_json::json!({ "visit_request_id": visit_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    common::wait_for_notification(&state, buyer.id, "visit_cancelled").await;
}

/// Creates a visit on `listing_id` and returns its id and payment reference.
async fn request_visit(
    state: &Arc<AppState>,
    buyer_token: &str,
    listing_id: Uuid,
) -> (Uuid, String) {
    let response = post_json(
        build_test_app(state.clone()),
        "/api/visits",
        Some(buyer_token),
        visit_body(listing_id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let visit_id = json["visit_request"]["id"].as_str().unwrap().parse().unwrap();
    let reference = json["payment"]["reference"].as_str().unwrap().to_string();
    (visit_id, reference)
}

async fn confirm(state: &Arc<AppState>, admin_token: &str, visit_id: Uuid) -> StatusCode {
    post_json(
        build_test_app(state.clone()),
        "/api/visits/admin/confirm-payment",
        Some(admin_token),
        serde_json::json!({ "visit_request_id": visit_id, "gateway_reference": "MOMO-42424" }),
    )
    .await
    .status()
}

async fn release(state: &Arc<AppState>, admin_token: &str, visit_id: Uuid) -> StatusCode {
    post_json(
        build_test_app(state.clone()),
        "/api/visits/release",
        Some(admin_token),
        serde_json::json!({ "visit_request_id": visit_id }),
    )
    .await
    .status()
}

async fn admin_cancel(state: &Arc<AppState>, admin_token: &str, visit_id: Uuid) -> StatusCode {
    post_json(
        build_test_app(state.clone()),
        "/api/visits/admin/cancel",
        Some(admin_token),
        serde_json::json!({ "visit_request_id": visit_id, "reason": "Listing withdrawn" }),
    )
    .await
    .status()
}

async fn ledger_rows(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn release_during_a_slow_refund_is_refused(pool: PgPool) {
    let gateway = ScriptedGateway {
        refund_delay: Duration::from_millis(800),
        ..Default::default()
    };
    let state = build_state_with_gateway(pool.clone(), Arc::new(gateway));
    let (seller, _) = create_user(&state, "seller", UserRole::User).await;
    let (_buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;
    let (_admin, admin_token) = create_user(&state, "admin", UserRole::Admin).await;
    let listing = create_listing(&state, &seller, Some(15_000)).await;

    let (visit_id, _) = request_visit(&state, &buyer_token, listing.id).await;
    assert_eq!(confirm(&state, &admin_token, visit_id).await, StatusCode::OK);

    let (cancelled, released) = tokio::join!(admin_cancel(&state, &admin_token, visit_id), async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        release(&state, &admin_token, visit_id).await
    });
    assert_eq!(cancelled, StatusCode::OK);
    assert_eq!(released, StatusCode::BAD_REQUEST);

    assert!(state.db_client.get_wallet(seller.id).await.unwrap().is_none());
    assert_eq!(ledger_rows(&pool).await, 0);

    let visit = state.db_client.get_visit_request(visit_id).await.unwrap().unwrap();
    assert_eq!(visit.status, VisitStatus::Cancelled);
    assert_eq!(visit.payout_status, PayoutStatus::Refunded);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn failed_refund_keeps_the_escrow_releasable(pool: PgPool) {
    let gateway = ScriptedGateway {
        refund_fails: true,
        ..Default::default()
    };
    let state = build_state_with_gateway(pool.clone(), Arc::new(gateway));
    let (seller, _) = create_user(&state, "seller", UserRole::User).await;
    let (_buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;
    let (_admin, admin_token) = create_user(&state, "admin", UserRole::Admin).await;
    let listing = create_listing(&state, &seller, Some(10_000)).await;

    let (visit_id, reference) = request_visit(&state, &buyer_token, listing.id).await;
    assert_eq!(confirm(&state, &admin_token, visit_id).await, StatusCode::OK);

    assert_eq!(admin_cancel(&state, &admin_token, visit_id).await, StatusCode::BAD_REQUEST);

    let visit = state.db_client.get_visit_request(visit_id).await.unwrap().unwrap();
    assert_eq!(visit.status, VisitStatus::Paid);
    assert_eq!(visit.payout_status, PayoutStatus::Pending);
    assert!(visit.cancelled_at.is_none());
    let payment = state
        .db_client
        .get_payment_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);

    assert_eq!(release(&state, &admin_token, visit_id).await, StatusCode::OK);
    assert_eq!(ledger_rows(&pool).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn confirming_after_the_payment_window_completes_the_payment(pool: PgPool) {
    let state = build_state(pool.clone());
    let (seller, _) = create_user(&state, "seller", UserRole::User).await;
    let (_buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;
    let (_admin, admin_token) = create_user(&state, "admin", UserRole::Admin).await;
    let listing = create_listing(&state, &seller, Some(10_000)).await;

    let (visit_id, reference) = request_visit(&state, &buyer_token, listing.id).await;

    sqlx::query("UPDATE payment_transactions SET expires_at = NOW() - INTERVAL '1 hour' WHERE our_reference = $1")
        .bind(&reference)
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(state.db_client.expire_stale_payments().await.unwrap(), 1);

    assert_eq!(confirm(&state, &admin_token, visit_id).await, StatusCode::OK);

    let payment = state
        .db_client
        .get_payment_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.gateway_reference.as_deref(), Some("MOMO-42424"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn payout_in_another_currency_is_refused(pool: PgPool) {
    let state = build_state(pool.clone());
    let (seller, seller_token) = create_user(&state, "seller", UserRole::User).await;
    let (_buyer, buyer_token) = create_user(&state, "buyer", UserRole::User).await;
    let (_admin, admin_token) = create_user(&state, "admin", UserRole::Admin).await;
    let xaf_listing = create_listing(&state, &seller, Some(10_000)).await;
    let ngn_listing = create_listing_in(&state, &seller, Some(20_000), Some("NGN")).await;

    let (first, _) = request_visit(&state, &buyer_token, xaf_listing.id).await;
    assert_eq!(confirm(&state, &admin_token, first).await, StatusCode::OK);
    assert_eq!(release(&state, &admin_token, first).await, StatusCode::OK);

    let (second, _) = request_visit(&state, &buyer_token, ngn_listing.id).await;
    assert_eq!(confirm(&state, &admin_token, second).await, StatusCode::OK);
    assert_eq!(release(&state, &admin_token, second).await, StatusCode::BAD_REQUEST);

    let visit = state.db_client.get_visit_request(second).await.unwrap().unwrap();
    assert_eq!(visit.status, VisitStatus::Paid);
    assert_eq!(visit.payout_status, PayoutStatus::Pending);
    assert_eq!(ledger_rows(&pool).await, 1);

    let response = get(build_test_app(state.clone()), "/api/wallet", Some(&seller_token)).await;
    let json = body_json(response).await;
    assert_eq!(json["wallet"]["currency"], "XAF");
    assert_eq!(json["wallet"]["balance"], 7_000);
}
