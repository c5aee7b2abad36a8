use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::entities::user;
use crate::errors::ServiceError;
use crate::services::users::UpsertUserRequest;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionTokenResponse {
    pub result: user::Model,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    pub admin: bool,
}

/// Login/bootstrap path: upserts the user record and returns a fresh
/// session token. Deliberately unauthenticated.
pub async fn session_token(
    State(state): State<AppState>,
    Json(request): Json<UpsertUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (result, token) = state.services.users.upsert(request).await?;
    Ok(Json(SessionTokenResponse { result, token }))
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let users = state.services.users.list().await?;
    Ok(Json(users))
}

/// Public role probe; an unknown email is simply not an admin.
pub async fn admin_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let admin = state.services.users.is_admin(&email).await?;
    Ok(Json(AdminStatusResponse { admin }))
}

pub async fn promote_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.users.promote_to_admin(&email).await?;
    Ok((StatusCode::OK, Json(updated)))
}
