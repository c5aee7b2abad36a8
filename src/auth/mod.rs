//! Token-based authentication and role-gated authorization.
//!
//! Tokens are stateless HS256 JWTs asserting an email identity; nothing is
//! persisted server-side. The guard is two composable middleware layers:
//! `auth_middleware` (is the caller holding a valid token) and
//! `admin_middleware` (does the token's identity have the admin role),
//! the latter consulting the user store.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::user;
use crate::errors::ServiceError;
use crate::AppState;

pub const ADMIN_ROLE: &str = "admin";
pub const USER_ROLE: &str = "user";

/// Claim structure for session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the holder's email)
    pub sub: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Authenticated caller identity extracted from a verified token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
}

/// Issues and verifies session tokens. The signing secret is loaded once at
/// startup; rotation is out of scope.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: ChronoDuration,
}

impl AuthService {
    pub fn new(secret: &str, token_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: ChronoDuration::seconds(token_ttl_secs),
        }
    }

    /// Produces a signed token asserting `email`, expiring after the
    /// configured lifetime.
    pub fn issue_token(&self, email: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))
    }

    /// Verifies signature and expiry. Tampered, unsigned, or expired input
    /// never passes.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token verification failed");
                ServiceError::InvalidToken
            })
    }
}

/// Requires an `Authorization: Bearer <token>` header. A missing header is
/// `Unauthorized` (401); a present but invalid or expired token is
/// `InvalidToken` (403). The two outcomes stay distinct.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ServiceError::Unauthorized)?;

    let token = bearer
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ServiceError::InvalidToken)?;

    let claims = state.auth.verify_token(token)?;
    request.extensions_mut().insert(AuthUser { email: claims.sub });

    Ok(next.run(request).await)
}

/// Requires the already-authenticated caller to hold the admin role. An
/// absent user record is an ordinary `Forbidden`, never a server fault.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let caller = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(ServiceError::Unauthorized)?;

    let record = user::Entity::find()
        .filter(user::Column::Email.eq(caller.email.as_str()))
        .one(&*state.db)
        .await?;

    match record {
        Some(account) if account.role == ADMIN_ROLE => Ok(next.run(request).await),
        _ => Err(ServiceError::Forbidden(
            "admin privileges required".to_string(),
        )),
    }
}

/// Router extension for composing the guard layers.
pub trait AuthRouterExt {
    /// Require a valid bearer token.
    fn with_auth(self, state: AppState) -> Self;
    /// Require a valid bearer token whose identity holds the admin role.
    fn with_admin(self, state: AppState) -> Self;
}

impl AuthRouterExt for Router<AppState> {
    fn with_auth(self, state: AppState) -> Self {
        self.layer(axum::middleware::from_fn_with_state(state, auth_middleware))
    }

    fn with_admin(self, state: AppState) -> Self {
        // authentication runs first; the admin check sees its extension
        self.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ))
        .with_auth(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_and_carry_the_email() {
        let service = AuthService::new("a-unit-test-secret-of-decent-length", 7_200);
        let token = service.issue_token("buyer@example.com").expect("issue");

        let claims = service.verify_token(&token).expect("verify");
        assert_eq!(claims.sub, "buyer@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_signed_with_a_different_secret_are_rejected() {
        let issuer = AuthService::new("a-unit-test-secret-of-decent-length", 7_200);
        let verifier = AuthService::new("a-completely-different-secret-value", 7_200);

        let token = issuer.issue_token("buyer@example.com").expect("issue");
        assert!(matches!(
            verifier.verify_token(&token),
            Err(ServiceError::InvalidToken)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        // Negative lifetime puts the expiry beyond the validation leeway.
        let service = AuthService::new("a-unit-test-secret-of-decent-length", -3_600);
        let token = service.issue_token("buyer@example.com").expect("issue");

        assert!(matches!(
            service.verify_token(&token),
            Err(ServiceError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let service = AuthService::new("a-unit-test-secret-of-decent-length", 7_200);
        assert!(service.verify_token("not-a-token").is_err());
        assert!(service.verify_token("").is_err());
    }
}
