use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{message, ApiJson, ApiPath};
use crate::auth::CustomerAuth;
use crate::db::{RepositoryError, WishlistRepository};
use crate::domain::aggregates::product::Product;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(list).post(add))
        .route("/wishlist/:product_id", delete(remove))
}

async fn list(State(state): State<AppState>, auth: CustomerAuth) -> Result<Json<Vec<Product>>> {
    Ok(Json(WishlistRepository::new(state.pool()).list(auth.user_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToWishlist {
    product_id: Uuid,
}

async fn add(
    State(state): State<AppState>,
    auth: CustomerAuth,
    ApiJson(req): ApiJson<AddToWishlist>,
) -> Result<(StatusCode, Json<Value>)> {
    WishlistRepository::new(state.pool()).add(auth.user_id, req.product_id).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound("Product not found".into()),
        other => other.into(),
    })?;
    Ok((StatusCode::CREATED, message("Added to wishlist")))
}

async fn remove(
    State(state): State<AppState>,
    auth: CustomerAuth,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<Json<Value>> {
    WishlistRepository::new(state.pool()).remove(auth.user_id, product_id).await?;
    Ok(message("Removed from wishlist"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_wishlist_is_per_customer() {
        let (app, _) = app();
        let (status, _) = send(app, json_request("POST", "/wishlist", None, json!({ "productId": Uuid::new_v4() }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_add_needs_product_id() {
        let (app, state) = app();
        let token = customer_token(&state);
        let (status, _) = send(app, json_request("POST", "/wishlist", Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
