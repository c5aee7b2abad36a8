use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::reviews::CreateReviewRequest;
use crate::AppState;

pub async fn list_reviews(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let reviews = state.services.reviews.list().await?;
    Ok(Json(reviews))
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .services
        .reviews
        .create(&caller.email, request)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
