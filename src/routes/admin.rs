//! Back-office routes, nested under `/admin`. Everything except login needs
//! an admin token.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{message, ApiJson, ApiPath};
use crate::auth::password::MIN_ADMIN_PASSWORD_LENGTH;
use crate::auth::{hash_password, verify_password, AdminAuth, AuthError};
use crate::db::orders::AdminOrderSummary;
use crate::db::{AdminRepository, ProductRepository, RepositoryError};
use crate::domain::aggregates::order::{OrderDetail, OrderStatus};
use crate::domain::aggregates::product::{NewProduct, Product, ProductPatch};
use crate::domain::events::ProductEvent;
use crate::error::{AppError, Result};
use crate::services::uploads::{StoredImage, UploadError, MAX_IMAGE_BYTES};
use crate::services::OrderService;
use crate::state::AppState;

/// Room for the multipart framing around a maximum-size image.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/verify", get(verify))
        .route("/create", post(create_admin))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/upload", post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    fn require(self) -> Result<Self> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::BadRequest("Username and password required".into()));
        }
        Ok(self)
    }
}

async fn login(State(state): State<AppState>, ApiJson(creds): ApiJson<Credentials>) -> Result<Json<Value>> {
    let creds = creds.require()?;
    let admin = AdminRepository::new(state.pool())
        .get_by_username(creds.username.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    verify_password(&creds.password, &admin.password_hash)?;

    let token = state.tokens().issue_admin(&admin)?;
    tracing::info!(admin_id = %admin.id, "Admin logged in");
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "admin": { "id": admin.id, "username": admin.username },
    })))
}

async fn verify(admin: AdminAuth) -> Json<Value> {
    Json(json!({ "valid": true, "admin": { "id": admin.admin_id, "username": admin.username } }))
}

async fn create_admin(
    State(state): State<AppState>,
    caller: AdminAuth,
    ApiJson(creds): ApiJson<Credentials>,
) -> Result<(StatusCode, Json<Value>)> {
    let creds = creds.require()?;
    if creds.password.chars().count() < MIN_ADMIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!("Password must be at least {MIN_ADMIN_PASSWORD_LENGTH} characters")));
    }

    let hash = hash_password(&creds.password)?;
    let admin = AdminRepository::new(state.pool()).create(creds.username.trim(), &hash).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => AppError::Conflict("Username already exists".into()),
        other => other.into(),
    })?;
    tracing::info!(admin_id = %admin.id, created_by = %caller.admin_id, "Admin created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Admin created successfully", "admin": { "id": admin.id, "username": admin.username } })),
    ))
}

async fn list_orders(State(state): State<AppState>, _admin: AdminAuth) -> Result<Json<Vec<AdminOrderSummary>>> {
    Ok(Json(OrderService::new(state).all_orders().await?))
}

async fn get_order(State(state): State<AppState>, _admin: AdminAuth, ApiPath(id): ApiPath<Uuid>) -> Result<Json<OrderDetail>> {
    Ok(Json(OrderService::new(state).detail(id).await?))
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
}

async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminAuth,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StatusUpdate>,
) -> Result<Json<Value>> {
    let status: OrderStatus = req.status.parse()?;
    let order = OrderService::new(state).update_status(id, status).await?;
    Ok(Json(json!({ "message": "Order status updated", "order": order })))
}

/// Hidden products included.
async fn list_products(State(state): State<AppState>, _admin: AdminAuth) -> Result<Json<Vec<Product>>> {
    Ok(Json(ProductRepository::new(state.pool()).list_all().await?))
}

async fn create_product(
    State(state): State<AppState>,
    _admin: AdminAuth,
    ApiJson(product): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = ProductRepository::new(state.pool()).create(&product.validate()?).await?;
    tracing::info!(product_id = %product.id, name = %product.name, "Product created");
    state.events().publish(ProductEvent::Created { product_id: product.id, name: product.name.clone() }).await;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    _admin: AdminAuth,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> Result<Json<Product>> {
    let patch = ProductPatch::from_json(&body)?;
    let product = ProductRepository::new(state.pool()).update(id, &patch).await.map_err(product_not_found)?;
    tracing::info!(product_id = %id, "Product updated");
    state.events().publish(ProductEvent::Updated { product_id: id }).await;
    Ok(Json(product))
}

/// Hard delete. Order lines keep their name and price snapshot.
async fn delete_product(State(state): State<AppState>, _admin: AdminAuth, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>> {
    ProductRepository::new(state.pool()).delete(id).await.map_err(product_not_found)?;
    tracing::info!(product_id = %id, "Product deleted");
    state.events().publish(ProductEvent::Deleted { product_id: id }).await;
    Ok(message("Product deleted successfully"))
}

fn product_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Product not found".into()),
        other => other.into(),
    }
}

/// Reads the `image` field of a multipart form; other fields are skipped.
async fn upload_image(State(state): State<AppState>, _admin: AdminAuth, mut form: Multipart) -> Result<Json<StoredImage>> {
    while let Some(field) = form.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        return Ok(Json(state.images().store(&file_name, content_type.as_deref(), &data).await?));
    }
    Err(UploadError::Missing.into())
}
