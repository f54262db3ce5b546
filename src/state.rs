//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::services::{EmailService, EventPublisher, ImageStore};

/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    tokens: TokenIssuer,
    email: Option<EmailService>,
    events: EventPublisher,
    images: ImageStore,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool, email: Option<EmailService>, events: EventPublisher) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.customer_token_ttl, config.admin_token_ttl);
        let images = ImageStore::new(config.upload_dir.clone(), config.public_base_url.clone());
        Self { inner: Arc::new(AppStateInner { config, pool, tokens, email, events, images }) }
    }

    pub fn config(&self) -> &AppConfig { &self.inner.config }
    pub fn pool(&self) -> &PgPool { &self.inner.pool }
    pub fn tokens(&self) -> &TokenIssuer { &self.inner.tokens }
    pub fn email(&self) -> Option<&EmailService> { self.inner.email.as_ref() }
    pub fn events(&self) -> &EventPublisher { &self.inner.events }
    pub fn images(&self) -> &ImageStore { &self.inner.images }
}
