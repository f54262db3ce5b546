//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - HMAC key for signing access tokens
//!
//! ## Optional
//! - `HOST` / `PORT` - bind address (default: 0.0.0.0:5000)
//! - `PUBLIC_BASE_URL` - prefix for uploaded image URLs (default: http://localhost:<port>)
//! - `UPLOAD_DIR` - where uploaded images are written (default: uploads)
//! - `GUEST_ACCOUNT_ID` - account that guest orders are attributed to
//! - `DELIVERY_POLICY` - `business-days` (default) or `calendar-days`
//! - `SHIPPING_FEE` - standard shipping fee (default: 220)
//! - `CUSTOMER_TOKEN_TTL_HOURS` / `ADMIN_TOKEN_TTL_HOURS` - token lifetimes (168 / 24)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - order emails
//! - `CART_TTL_HOURS` - idle session carts are purged after this long (720)
//! - `NATS_URL` - event publishing

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::checkout::{CheckoutSettings, DeliveryPolicy};
use crate::domain::value_objects::Money;

/// Seeded by the initial migration.
pub const DEFAULT_GUEST_ACCOUNT_ID: Uuid = Uuid::from_u128(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub public_base_url: String,
    pub upload_dir: PathBuf,
    pub jwt_secret: SecretString,
    pub customer_token_ttl: Duration,
    pub admin_token_ttl: Duration,
    pub guest_account_id: Uuid,
    pub cart_ttl: Duration,
    pub checkout: CheckoutSettings,
    pub email: Option<EmailConfig>,
    pub nats_url: Option<String>,
}

/// SMTP relay settings. Present only when host and credentials are all set.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from: String,
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env` first
    /// if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = SecretString::from(env.required("DATABASE_URL")?);
        let jwt_secret = SecretString::from(env.required("JWT_SECRET")?);
        let host: IpAddr = env.parse_or("HOST", "0.0.0.0")?;
        let port: u16 = env.parse_or("PORT", "5000")?;
        let public_base_url = env
            .optional("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let shipping_fee: Decimal = env.parse_or("SHIPPING_FEE", "220")?;
        if shipping_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar("SHIPPING_FEE".into(), "must not be negative".into()));
        }
        let cart_ttl_hours: i64 = env.parse_or("CART_TTL_HOURS", "720")?;
        if cart_ttl_hours < 1 {
            return Err(ConfigError::InvalidEnvVar("CART_TTL_HOURS".into(), "must be at least 1".into()));
        }
        let delivery_policy: DeliveryPolicy = env.parse_or("DELIVERY_POLICY", "business-days")?;

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            upload_dir: PathBuf::from(env.optional("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
            jwt_secret,
            customer_token_ttl: Duration::hours(env.parse_or("CUSTOMER_TOKEN_TTL_HOURS", "168")?),
            admin_token_ttl: Duration::hours(env.parse_or("ADMIN_TOKEN_TTL_HOURS", "24")?),
            guest_account_id: match env.optional("GUEST_ACCOUNT_ID") {
                Some(_) => env.parse_or("GUEST_ACCOUNT_ID", "")?,
                None => DEFAULT_GUEST_ACCOUNT_ID,
            },
            cart_ttl: Duration::hours(cart_ttl_hours),
            checkout: CheckoutSettings { shipping_fee: Money::new(shipping_fee), delivery_policy },
            email: EmailConfig::from_env(&env)?,
            nats_url: env.optional("NATS_URL"),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

impl EmailConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let (Some(host), Some(username), Some(password)) =
            (env.optional("SMTP_HOST"), env.optional("SMTP_USERNAME"), env.optional("SMTP_PASSWORD"))
        else {
            return Ok(None);
        };
        Ok(Some(Self {
            host,
            port: env.parse_or("SMTP_PORT", "587")?,
            from: env.optional("EMAIL_FROM").unwrap_or_else(|| username.clone()),
            username,
            password: SecretString::from(password),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.optional(key).unwrap_or_else(|| default.to_string());
        raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_source(|key| map.get(key).cloned())
    }

    const BASE: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/caffe"), ("JWT_SECRET", "s3cr3t-signing-key")];

    #[test]
    fn test_defaults() {
        let config = load(&BASE).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(config.public_base_url, "http://localhost:5000");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.guest_account_id, DEFAULT_GUEST_ACCOUNT_ID);
        assert_eq!(config.checkout, CheckoutSettings::default());
        assert_eq!(config.customer_token_ttl, Duration::days(7));
        assert_eq!(config.admin_token_ttl, Duration::hours(24));
        assert_eq!(config.cart_ttl, Duration::days(30));
        assert!(config.email.is_none());
        assert!(config.nats_url.is_none());
        assert_eq!(config.jwt_secret.expose_secret(), "s3cr3t-signing-key");
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("DATABASE_URL", "postgres://localhost/caffe")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "JWT_SECRET"));
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let mut vars = BASE.to_vec();
        vars.extend([("DELIVERY_POLICY", "calendar-days"), ("SHIPPING_FEE", "150.50"), ("PORT", "8080")]);
        let config = load(&vars).unwrap();
        assert_eq!(config.checkout.delivery_policy, DeliveryPolicy::CalendarDays(7));
        assert_eq!(config.checkout.shipping_fee, Money::new(Decimal::new(15050, 2)));
        assert_eq!(config.public_base_url, "http://localhost:8080");

        let mut vars = BASE.to_vec();
        vars.push(("PORT", "not-a-port"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "PORT"));

        let mut vars = BASE.to_vec();
        vars.push(("CART_TTL_HOURS", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "CART_TTL_HOURS"));
    }

    #[test]
    fn test_email_requires_credentials() {
        let mut vars = BASE.to_vec();
        vars.push(("SMTP_HOST", "smtp.example.com"));
        assert!(load(&vars).unwrap().email.is_none());
        vars.extend([("SMTP_USERNAME", "orders@example.com"), ("SMTP_PASSWORD", "pw")]);
        let email = load(&vars).unwrap().email.unwrap();
        assert_eq!(email.port, 587);
        assert_eq!(email.from, "orders@example.com");
    }
}
