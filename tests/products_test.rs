//! Catalog endpoints: public reads, admin-gated writes, and the
//! never-below-zero stock rule.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_then_read_round_trip() {
    let app = TestApp::new().await;
    let admin = app.register_admin("boss@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/products",
            Some(json!({
                "name": "brake disc",
                "description": "vented, 280mm",
                "price": "20.00",
                "quantity": 10
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .request(Method::GET, &format!("/products/{id}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = response_json(response).await;
    assert_eq!(fetched["name"], "brake disc");
    assert_eq!(fetched["description"], "vented, 280mm");
    assert_eq!(fetched["price"], created["price"]);
    assert_eq!(fetched["quantity"], 10);

    let response = app.request(Method::GET, "/products", None, None).await;
    let list = response_json(response).await;
    assert!(list.as_array().unwrap().iter().any(|p| p["id"] == id.as_str()));
}

#[tokio::test]
async fn product_creation_is_admin_gated() {
    let app = TestApp::new().await;
    let user = app.register("buyer@example.com").await;

    let body = json!({ "name": "brake disc", "price": "20.00", "quantity": 10 });

    let response = app
        .request(Method::POST, "/products", Some(body.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::POST, "/products", Some(body), Some(&user))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_positive_prices_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.register_admin("boss@example.com").await;

    for price in ["0", "-1.50"] {
        let response = app
            .request(
                Method::POST,
                "/products",
                Some(json!({ "name": "bad", "price": price, "quantity": 1 })),
                Some(&admin),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn stock_removal_decrements_and_refuses_to_go_negative() {
    let app = TestApp::new().await;
    let admin = app.register_admin("boss@example.com").await;
    let id = app.seed_product("brake disc", "20.00", 10).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(json!({ "quantity": 4 })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["quantity"], 6);

    // More than is in stock: refused, quantity untouched.
    let response = app
        .request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(json!({ "quantity": 100 })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.state.services.catalog.get(id).await.unwrap().quantity, 6);
}

#[tokio::test]
async fn stock_removal_requires_admin() {
    let app = TestApp::new().await;
    let user = app.register("buyer@example.com").await;
    let id = app.seed_product("brake disc", "20.00", 10).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(json!({ "quantity": 1 })),
            Some(&user),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn field_edits_leave_stock_untouched() {
    let app = TestApp::new().await;
    let admin = app.register_admin("boss@example.com").await;
    let id = app.seed_product("brake disc", "20.00", 10).await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/products/{id}"),
            Some(json!({ "description": "now with coating", "price": "22.50" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["description"], "now with coating");
    assert_eq!(updated["quantity"], 10);

    let product = app.state.services.catalog.get(id).await.unwrap();
    assert_eq!(product.price, "22.50".parse().unwrap());
}

#[tokio::test]
async fn deleting_a_product_removes_it() {
    let app = TestApp::new().await;
    let admin = app.register_admin("boss@example.com").await;
    let id = app.seed_product("brake disc", "20.00", 10).await;

    let response = app
        .request(Method::DELETE, &format!("/products/{id}"), None, Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/products/{id}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
