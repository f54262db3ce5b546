//! Server-held session carts and checkout against them.
//!
//! The session token is opaque to the server; whoever holds it owns the cart.
//! Checkout runs the same [`CheckoutWorkflow`] a client would, with the order
//! handed straight to [`OrderService`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::auth::OptionalCustomer;
use crate::db::{CartRepository, ProductRepository};
use crate::domain::aggregates::cart::{Cart, CartItem, CartTotals};
use crate::domain::aggregates::order::OrderOwner;
use crate::domain::checkout::{CheckoutError, CheckoutForm, CheckoutWorkflow};
use crate::domain::value_objects::Quantity;
use crate::error::{AppError, Result};
use crate::services::{InProcessGateway, OrderService};
use crate::state::AppState;

const MAX_SESSION_LEN: usize = 128;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart/:session", get(show_cart).delete(clear_cart))
        .route("/cart/:session/items", post(add_item))
        .route("/cart/:session/items/:product_id", put(update_item).delete(remove_item))
        .route("/cart/:session/voucher", post(apply_voucher).delete(remove_voucher))
        .route("/cart/:session/checkout", post(checkout))
}

#[derive(Serialize)]
struct CartView {
    #[serde(flatten)]
    cart: Cart,
    totals: CartTotals,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let totals = cart.totals();
        Self { cart, totals }
    }
}

fn session_key(raw: &str) -> Result<&str> {
    let key = raw.trim();
    if key.is_empty() || key.len() > MAX_SESSION_LEN {
        return Err(AppError::BadRequest("Invalid cart session".into()));
    }
    Ok(key)
}

async fn show_cart(State(state): State<AppState>, ApiPath(session): ApiPath<String>) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool()).load(session_key(&session)?).await?;
    Ok(Json(cart.into()))
}

async fn clear_cart(State(state): State<AppState>, ApiPath(session): ApiPath<String>) -> Result<StatusCode> {
    CartRepository::new(state.pool()).delete(session_key(&session)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItem {
    product_id: Uuid,
    #[serde(default = "one")]
    quantity: i64,
}

fn one() -> i64 { 1 }

/// Takes a name and price snapshot of the product as it is now.
async fn add_item(
    State(state): State<AppState>,
    ApiPath(session): ApiPath<String>,
    ApiJson(req): ApiJson<AddItem>,
) -> Result<Json<CartView>> {
    let session = session_key(&session)?;
    let quantity = Quantity::new(req.quantity).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let product = ProductRepository::new(state.pool())
        .get_visible(req.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    let carts = CartRepository::new(state.pool());
    let mut cart = carts.load(session).await?;
    cart.add_item(CartItem::from_product(&product, quantity));
    carts.save(session, &cart).await?;
    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
struct UpdateItem {
    quantity: i64,
}

/// A quantity below one leaves the line as it was.
async fn update_item(
    State(state): State<AppState>,
    ApiPath((session, product_id)): ApiPath<(String, Uuid)>,
    ApiJson(req): ApiJson<UpdateItem>,
) -> Result<Json<CartView>> {
    let session = session_key(&session)?;
    let carts = CartRepository::new(state.pool());
    let mut cart = carts.load(session).await?;
    if cart.update_quantity(product_id, req.quantity) {
        carts.save(session, &cart).await?;
    }
    Ok(Json(cart.into()))
}

async fn remove_item(
    State(state): State<AppState>,
    ApiPath((session, product_id)): ApiPath<(String, Uuid)>,
) -> Result<Json<CartView>> {
    let session = session_key(&session)?;
    let carts = CartRepository::new(state.pool());
    let mut cart = carts.load(session).await?;
    if cart.remove_item(product_id) {
        carts.save(session, &cart).await?;
    }
    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
struct VoucherCode {
    code: String,
}

async fn apply_voucher(
    State(state): State<AppState>,
    ApiPath(session): ApiPath<String>,
    ApiJson(req): ApiJson<VoucherCode>,
) -> Result<Json<Value>> {
    let session = session_key(&session)?;
    let carts = CartRepository::new(state.pool());
    let mut cart = carts.load(session).await?;
    let message = cart.apply_voucher(&req.code)?.message();
    carts.save(session, &cart).await?;
    Ok(Json(json!({ "message": message, "cart": CartView::from(cart) })))
}

async fn remove_voucher(State(state): State<AppState>, ApiPath(session): ApiPath<String>) -> Result<Json<CartView>> {
    let session = session_key(&session)?;
    let carts = CartRepository::new(state.pool());
    let mut cart = carts.load(session).await?;
    cart.remove_voucher();
    carts.save(session, &cart).await?;
    Ok(Json(cart.into()))
}

/// Places an order for the stored cart. A bearer token files the order under
/// that account; without one it is a guest order.
async fn checkout(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
    ApiPath(session): ApiPath<String>,
    ApiJson(form): ApiJson<CheckoutForm>,
) -> Result<(StatusCode, Json<Value>)> {
    let session = session_key(&session)?;
    let owner = customer.map_or(OrderOwner::Guest, |c| OrderOwner::Account(c.user_id));
    let gateway = InProcessGateway::new(OrderService::new(state.clone()), owner);
    let workflow = CheckoutWorkflow::new(gateway, state.config().checkout);

    let carts = CartRepository::new(state.pool());
    let mut cart = carts.load(session).await?;
    let confirmation = workflow.submit(&mut cart, &form).await.map_err(checkout_error)?;
    carts.delete(session).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Order created successfully", "confirmation": confirmation })),
    ))
}

fn checkout_error(err: CheckoutError<AppError>) -> AppError {
    match err {
        CheckoutError::Invalid(fields) => AppError::Validation(fields),
        CheckoutError::Rejected(inner) => inner,
        e @ CheckoutError::InFlight => AppError::Conflict(e.to_string()),
        e @ CheckoutError::EmptyCart => AppError::BadRequest(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;

    #[test]
    fn test_session_key() {
        assert_eq!(session_key(" abc123 ").unwrap(), "abc123");
        assert!(session_key("   ").is_err());
        assert!(session_key(&"x".repeat(MAX_SESSION_LEN + 1)).is_err());
    }

    #[test]
    fn test_checkout_error_mapping() {
        assert_eq!(checkout_error(CheckoutError::EmptyCart).status(), StatusCode::BAD_REQUEST);
        assert_eq!(checkout_error(CheckoutError::InFlight).status(), StatusCode::CONFLICT);
        let inner = AppError::Conflict("Order number already exists".into());
        assert_eq!(checkout_error(CheckoutError::Rejected(inner)).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_cart_view_carries_totals() {
        let view = CartView::from(Cart::new());
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["items"], json!([]));
        assert_eq!(value["totals"]["itemCount"], 0);
    }

    #[tokio::test]
    async fn test_add_item_rejects_zero_quantity() {
        let (app, _) = app();
        let body = json!({ "productId": Uuid::new_v4(), "quantity": 0 });
        let (status, _) = send(app, json_request("POST", "/cart/s-1/items", None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_with_bad_token() {
        let (app, _) = app();
        let (status, _) = send(app, json_request("POST", "/cart/s-1/checkout", Some("bogus"), json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
