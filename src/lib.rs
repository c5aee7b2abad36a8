//! carparts-api: backend for a car-parts storefront.
//!
//! Customers browse the catalog, place orders, pay through the external
//! processor, and leave reviews; administrators manage inventory and
//! elevate other users. Every mutating route passes through the bearer-token
//! guard, and admin routes additionally through the role check.

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sea_orm::DatabaseConnection;

use auth::{AuthRouterExt, AuthService};
use gateway::PaymentGateway;

/// Shared application state, explicitly constructed at startup and handed
/// to every handler. No ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub services: services::AppServices,
}

/// Assembles the full route table. Routes are grouped by the guard they
/// sit behind; the groups are merged into one router at the end.
pub fn app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/session-token", post(handlers::users::session_token))
        .route("/admin/:email", get(handlers::users::admin_status))
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/reviews", get(handlers::reviews::list_reviews));

    let authenticated = Router::new()
        .route("/payment-intents", post(handlers::payments::create_payment_intent))
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", patch(handlers::orders::settle_order))
        .route("/orders/:id", delete(handlers::orders::delete_order))
        .route("/reviews", post(handlers::reviews::create_review))
        .with_auth(state.clone());

    let admin = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route("/user/admin/:email", put(handlers::users::promote_admin))
        .route("/products", post(handlers::products::create_product))
        .route("/products/:id", put(handlers::products::adjust_stock))
        .route("/products/:id", patch(handlers::products::update_product))
        .route("/products/:id", delete(handlers::products::delete_product))
        .with_admin(state.clone());

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        .with_state(state)
}
