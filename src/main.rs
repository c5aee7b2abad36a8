use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use carparts_api as api;
use carparts_api::gateway::{PaymentGateway, StripeGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let pool = api::db::establish_connection(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&pool).await?;
    }
    let db = Arc::new(pool);

    let auth = Arc::new(api::auth::AuthService::new(
        &cfg.jwt_secret,
        cfg.token_ttl_secs,
    ));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
        cfg.stripe_secret_key.clone(),
        cfg.gateway_base_url.clone(),
        Duration::from_secs(cfg.gateway_timeout_secs),
    )?);
    let services = api::services::AppServices::new(db.clone(), auth.clone());

    let state = api::AppState {
        db,
        config: cfg.clone(),
        auth,
        gateway,
        services,
    };

    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = match configured_origins {
        Some(origins) => CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
        None if cfg.is_development() => CorsLayer::permissive(),
        None => {
            anyhow::bail!(
                "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS outside development"
            );
        }
    };

    let app = api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("carparts api listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("failed to install shutdown handler: {err}");
    }
    info!("shutdown signal received");
}
