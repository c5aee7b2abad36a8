//! Payment-intent endpoint: minor-unit conversion, gateway failure
//! mapping, and the auth requirement.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{response_json, FailingGateway, StubGateway, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn intent_returns_the_client_secret() {
    let gateway = Arc::new(StubGateway::default());
    let app = TestApp::with_gateway(gateway.clone()).await;
    let token = app.register("buyer@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/payment-intents",
            Some(json!({ "price": "60.00" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await["clientSecret"],
        "pi_test_secret_6000"
    );

    let calls = gateway.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[(dec!(60.00), "usd".to_string())]);
}

#[tokio::test]
async fn non_positive_prices_are_rejected() {
    let app = TestApp::new().await;
    let token = app.register("buyer@example.com").await;

    for price in ["0", "-10.00"] {
        let response = app
            .request(
                Method::POST,
                "/payment-intents",
                Some(json!({ "price": price })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn processor_rejection_maps_to_bad_gateway() {
    let app = TestApp::with_gateway(Arc::new(FailingGateway { timeout: false })).await;
    let token = app.register("buyer@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/payment-intents",
            Some(json!({ "price": "60.00" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn processor_timeout_maps_to_gateway_timeout() {
    let app = TestApp::with_gateway(Arc::new(FailingGateway { timeout: true })).await;
    let token = app.register("buyer@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/payment-intents",
            Some(json!({ "price": "60.00" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn intents_require_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/payment-intents",
            Some(json!({ "price": "60.00" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
