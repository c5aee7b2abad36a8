use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::orders::{CreateOrderRequest, SettleOrderRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub email: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.orders.create(&caller.email, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Lists the orders belonging to the email in the query string, which must
/// match the caller's token identity. A mismatch is `Forbidden`, never the
/// data.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    if query.email != caller.email {
        return Err(ServiceError::Forbidden(
            "orders may only be listed by their owner".to_string(),
        ));
    }

    let orders = state.services.orders.list_for(&query.email).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get(id).await?;
    Ok(Json(order))
}

/// Settlement entry point, invoked once the client has confirmed payment
/// with the processor and holds a transaction id.
pub async fn settle_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SettleOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let settled = state.services.orders.settle(id, request).await?;
    Ok(Json(settled))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller_is_admin = state.services.users.is_admin(&caller.email).await?;
    state
        .services
        .orders
        .delete(id, &caller.email, caller_is_admin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
