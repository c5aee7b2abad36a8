use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::catalog::{CreateProductRequest, UpdateProductRequest};
use crate::AppState;

/// Body of the stock-removal endpoint: how many units to take out.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: i32,
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.catalog.list().await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get(id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.catalog.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.catalog.update(id, request).await?;
    Ok(Json(updated))
}

/// Removes stock by the given amount; never takes quantity below zero.
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .catalog
        .adjust_stock(id, request.quantity)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
