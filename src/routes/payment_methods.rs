//! Saved cards. Card numbers are masked before they reach the repository.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{message, ApiJson, ApiPath};
use crate::auth::CustomerAuth;
use crate::db::PaymentMethodRepository;
use crate::domain::aggregates::payment_method::{CardDetails, PaymentMethod};
use crate::error::Result;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment-methods", get(list).post(add))
        .route("/payment-methods/:id", delete(remove))
        .route("/payment-methods/:id/default", put(set_default))
}

async fn list(State(state): State<AppState>, auth: CustomerAuth) -> Result<Json<Vec<PaymentMethod>>> {
    Ok(Json(PaymentMethodRepository::new(state.pool()).list(auth.user_id).await?))
}

async fn add(
    State(state): State<AppState>,
    auth: CustomerAuth,
    ApiJson(card): ApiJson<CardDetails>,
) -> Result<(StatusCode, Json<Value>)> {
    let masked = card.validate()?;
    let method = PaymentMethodRepository::new(state.pool()).add(auth.user_id, &masked).await?;
    tracing::info!(user_id = %auth.user_id, last4 = %method.card_last4, default = method.is_default, "Card saved");
    Ok((StatusCode::CREATED, Json(json!({ "message": "Payment method added", "paymentMethod": method }))))
}

async fn remove(State(state): State<AppState>, auth: CustomerAuth, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>> {
    PaymentMethodRepository::new(state.pool()).delete(auth.user_id, id).await?;
    Ok(message("Payment method removed"))
}

async fn set_default(
    State(state): State<AppState>,
    auth: CustomerAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>> {
    let method = PaymentMethodRepository::new(state.pool()).set_default(auth.user_id, id).await?;
    Ok(Json(json!({ "message": "Default payment method updated", "paymentMethod": method })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn test_card_is_validated_before_storage() {
        let (app, state) = app();
        let token = customer_token(&state);
        let body = json!({ "cardNumber": "1234", "cardHolder": "", "expiryMonth": 13, "expiryYear": 2020, "cvv": "123" });
        let (status, body) = send(app, json_request("POST", "/payment-methods", Some(&token), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["cardNumber"].is_string());
        assert!(body["fields"]["cardHolder"].is_string());
    }

    #[tokio::test]
    async fn test_list_needs_token() {
        let (app, _) = app();
        let (status, _) = send(app, get_request("/payment-methods", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
