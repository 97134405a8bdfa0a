//! Registration and login against a real database.
//!
//! Run with `DATABASE_URL` pointing at a disposable Postgres and `--ignored`.

mod common;

use axum::http::{header, StatusCode};
use common::{body_json, build_state, build_test_app, get, post_json};
use sqlx::PgPool;

fn registration(email: &str) -> serde_json::Value {
    serde_json::json!({
        "name": "Amina Bello",
        "email": email,
        "password": "correct-horse-battery",
        "passwordConfirm": "correct-horse-battery"
    })
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn register_then_login_issues_a_usable_token(pool: PgPool) {
    let state = build_state(pool);

    let response = post_json(
        build_test_app(state.clone()),
        "/api/auth/register",
        None,
        registration("amina@example.com"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["email"], "amina@example.com");
    assert!(json["data"]["user"].get("password").is_none());

    let response = post_json(
        build_test_app(state.clone()),
        "/api/auth/register",
        None,
        registration("AMINA@example.com"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json(
        build_test_app(state.clone()),
        "/api/auth/login",
        None,
        serde_json::json!({ "email": "amina@example.com", "password": "correct-horse-battery" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let token = body_json(response).await["token"].as_str().unwrap().to_string();
    let response = get(build_test_app(state), "/api/wallet", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["wallet"]["balance"], 0);
    assert_eq!(json["wallet"]["currency"], "XAF");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn wrong_password_is_rejected(pool: PgPool) {
    let state = build_state(pool);
    post_json(
        build_test_app(state.clone()),
        "/api/auth/register",
        None,
        registration("kofi@example.com"),
    )
    .await;

    let response = post_json(
        build_test_app(state),
        "/api/auth/login",
        None,
        serde_json::json!({ "email": "kofi@example.com", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
