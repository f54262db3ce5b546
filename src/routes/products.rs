//! Public catalog.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiPath, ApiQuery};
use crate::db::ProductRepository;
use crate::domain::aggregates::product::{PriceSort, Product, ProductFilter};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/filter", get(filter_products))
        .route("/products/search", get(search_products))
        .route("/products/:id", get(get_product))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(ProductRepository::new(state.pool()).list_visible().await?))
}

/// Hidden products answer exactly like missing ones.
async fn get_product(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_visible(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FilterQuery {
    category: Option<String>,
    instock: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    sort: Option<String>,
}

impl From<FilterQuery> for ProductFilter {
    fn from(q: FilterQuery) -> Self {
        Self {
            category: q.category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            // Only `instock=true` narrows the list.
            in_stock: q.instock.filter(|v| v == "true").map(|_| true),
            min_price: q.min_price,
            max_price: q.max_price,
            sort: q.sort.as_deref().and_then(PriceSort::parse),
        }
    }
}

async fn filter_products(State(state): State<AppState>, ApiQuery(query): ApiQuery<FilterQuery>) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter::from(query);
    Ok(Json(ProductRepository::new(state.pool()).filter(&filter).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    name: String,
}

async fn search_products(State(state): State<AppState>, ApiQuery(query): ApiQuery<SearchQuery>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool());
    let name = query.name.trim();
    if name.is_empty() {
        return Ok(Json(products.list_visible().await?));
    }
    Ok(Json(products.search(name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use axum::http::StatusCode;

    #[test]
    fn test_filter_query_mapping() {
        let filter = ProductFilter::from(FilterQuery {
            category: Some(" Hot Coffee ".into()),
            instock: Some("false".into()),
            min_price: Some(Decimal::new(200, 0)),
            max_price: None,
            sort: Some("price_desc".into()),
        });
        assert_eq!(filter.category.as_deref(), Some("Hot Coffee"));
        assert_eq!(filter.in_stock, None);
        assert_eq!(filter.sort, Some(PriceSort::Descending));

        let filter = ProductFilter::from(FilterQuery { instock: Some("true".into()), category: Some("  ".into()), ..Default::default() });
        assert_eq!(filter.in_stock, Some(true));
        assert_eq!(filter.category, None);
    }

    #[tokio::test]
    async fn test_bad_product_id() {
        let (app, _) = app();
        let (status, _) = send(app, get_request("/products/not-a-uuid", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_price_bound() {
        let (app, _) = app();
        let (status, _) = send(app, get_request("/products/filter?minPrice=cheap", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
