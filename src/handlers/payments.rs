use axum::{extract::State, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
}

/// Asks the payment processor for an authorization over the order total and
/// hands the resulting client secret back for the browser-side confirmation
/// step. Repeated calls create fresh intents; the processor deduplicates,
/// we do not.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let intent = state.gateway.create_intent(request.price, "usd").await?;
    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}
