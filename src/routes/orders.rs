//! Order placement and purchase history.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::auth::CustomerAuth;
use crate::domain::aggregates::order::{OrderDetail, OrderOwner, OrderReceipt, OrderSummary, PlaceOrder};
use crate::error::Result;
use crate::services::OrderService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/guest", post(place_guest_order))
        .route("/purchase-history", get(purchase_history))
        .route("/purchase-history/:id", get(purchase_detail))
}

fn created(receipt: OrderReceipt) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Order created successfully",
            "orderId": receipt.order_id,
            "orderNumber": receipt.order_number,
            "total": receipt.total,
            "estimatedDelivery": receipt.estimated_delivery,
        })),
    )
}

async fn place_order(
    State(state): State<AppState>,
    auth: CustomerAuth,
    ApiJson(request): ApiJson<PlaceOrder>,
) -> Result<(StatusCode, Json<Value>)> {
    let receipt = OrderService::new(state).place_order(OrderOwner::Account(auth.user_id), request).await?;
    Ok(created(receipt))
}

async fn place_guest_order(State(state): State<AppState>, ApiJson(request): ApiJson<PlaceOrder>) -> Result<(StatusCode, Json<Value>)> {
    let receipt = OrderService::new(state).place_order(OrderOwner::Guest, request).await?;
    Ok(created(receipt))
}

async fn purchase_history(State(state): State<AppState>, auth: CustomerAuth) -> Result<Json<Vec<OrderSummary>>> {
    Ok(Json(OrderService::new(state).history(auth.user_id).await?))
}

async fn purchase_detail(
    State(state): State<AppState>,
    auth: CustomerAuth,
    ApiPath(order_id): ApiPath<Uuid>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(OrderService::new(state).detail_for(auth.user_id, order_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;

    fn order_body() -> Value {
        json!({
            "order": {
                "subtotal": 900,
                "shipping_cost": 220,
                "total_amount": 1120,
                "delivery_address": "House 12, F-7/2",
                "delivery_phone": "03001234567"
            },
            "items": [{ "product_name": "Cappuccino", "quantity": 2, "price": 450 }]
        })
    }

    #[tokio::test]
    async fn test_account_order_needs_token() {
        let (app, _) = app();
        let (status, body) = send(app, json_request("POST", "/orders", None, order_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No token provided");
    }

    #[tokio::test]
    async fn test_guest_order_without_customer() {
        let (app, _) = app();
        let mut body = order_body();
        body["customer"] = json!({ "name": " ", "email": "" });
        let (status, body) = send(app, json_request("POST", "/orders/guest", None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["customer.name"].is_string());
        assert!(body["fields"]["customer.email"].is_string());
    }

    #[tokio::test]
    async fn test_mismatched_total_is_rejected() {
        let (app, state) = app();
        let mut body = order_body();
        body["order"]["total_amount"] = json!(999);
        let token = customer_token(&state);
        let (status, body) = send(app, json_request("POST", "/orders", Some(&token), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["order.total_amount"].is_string());
    }

    #[tokio::test]
    async fn test_guest_order_with_huge_amounts() {
        let (app, _) = app();
        let mut body = order_body();
        body["customer"] = json!({ "name": "Sana Malik", "email": "sana@example.com" });
        body["order"]["subtotal"] = json!(5e28);
        body["order"]["shipping_cost"] = json!(5e28);
        body["order"]["total_amount"] = json!(1e28);
        let (status, body) = send(app, json_request("POST", "/orders/guest", None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["order.subtotal"].is_string());
        assert!(body["fields"]["order.shipping_cost"].is_string());
    }

    #[tokio::test]
    async fn test_history_rejects_admin_token() {
        let (app, state) = app();
        let token = admin_token(&state);
        let (status, _) = send(app, get_request("/purchase-history", Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
