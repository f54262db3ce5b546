//! Caffe Storefront - coffee shop ordering backend
//!
//! ## Features
//! - Product catalog with hidden items, filtering and search
//! - Cart aggregate with vouchers and an optional server-held session cart
//! - Checkout workflow for authenticated customers and guests
//! - Order history and back-office order/product management
//! - Wishlist and saved (masked) payment cards
//! - Product image uploads

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use state::AppState;
