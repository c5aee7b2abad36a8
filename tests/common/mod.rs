//! Shared harness for integration tests: an application state backed by a
//! throwaway SQLite database and a stubbed payment gateway.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use carparts_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    errors::ServiceError,
    gateway::{self, PaymentGateway, PaymentIntent},
    services::AppServices,
    AppState,
};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-key-of-sufficient-length";

/// Gateway stub that records calls and hands back a deterministic secret.
#[derive(Default)]
pub struct StubGateway {
    pub calls: Mutex<Vec<(Decimal, String)>>,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        // Same amount validation the real gateway applies.
        let minor_units = gateway::to_minor_units(amount)?;
        self.calls
            .lock()
            .unwrap()
            .push((amount, currency.to_string()));
        Ok(PaymentIntent {
            client_secret: format!("pi_test_secret_{minor_units}"),
        })
    }
}

/// Gateway stub that fails every call with the given error kind.
pub struct FailingGateway {
    pub timeout: bool,
}

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_intent(
        &self,
        _amount: Decimal,
        _currency: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        if self.timeout {
            Err(ServiceError::GatewayTimeout)
        } else {
            Err(ServiceError::GatewayError(
                "processor returned 402: card_declined".to_string(),
            ))
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    db_file: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(StubGateway::default())).await
    }

    pub async fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let db_file = std::env::temp_dir().join(format!("carparts_test_{}.db", Uuid::new_v4()));

        let cfg = AppConfig {
            database_url: format!("sqlite://{}?mode=rwc", db_file.display()),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            stripe_secret_key: "sk_test_placeholder".to_string(),
            token_ttl_secs: 7_200,
            gateway_base_url: "http://127.0.0.1:0".to_string(),
            gateway_timeout_secs: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            log_level: "warn".to_string(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            db_max_connections: 1,
            db_min_connections: 1,
        };

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let auth = Arc::new(AuthService::new(&cfg.jwt_secret, cfg.token_ttl_secs));
        let services = AppServices::new(db.clone(), auth.clone());

        let state = AppState {
            db,
            config: cfg,
            auth,
            gateway,
            services,
        };

        Self {
            router: carparts_api::app(state.clone()),
            state,
            db_file,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Registers a user through the login path and returns its token.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/session-token",
                Some(serde_json::json!({ "email": email, "name": "Test User" })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "registration failed");

        let json = response_json(response).await;
        json["token"].as_str().expect("token in response").to_string()
    }

    /// Registers a user and elevates it to admin directly via the service.
    pub async fn register_admin(&self, email: &str) -> String {
        let token = self.register(email).await;
        self.state
            .services
            .users
            .promote_to_admin(email)
            .await
            .expect("promote admin");
        token
    }

    pub async fn seed_product(&self, name: &str, price: &str, quantity: i32) -> Uuid {
        let created = self
            .state
            .services
            .catalog
            .create(carparts_api::services::catalog::CreateProductRequest {
                name: name.to_string(),
                description: None,
                image_url: None,
                price: price.parse().expect("price"),
                quantity,
                min_order_quantity: 1,
            })
            .await
            .expect("seed product");
        created.id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
