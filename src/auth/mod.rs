//! Bearer-token authentication for customers and admins.
//!
//! Tokens are HS256 JWTs. Handlers declare what they need through the
//! [`CustomerAuth`], [`OptionalCustomer`] and [`AdminAuth`] extractors.

pub mod password;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::account::{Admin, User};
use crate::error::AppError;
use crate::state::AppState;

pub use password::{hash_password, verify_password};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Current password incorrect")]
    WrongPassword,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Not authorized")]
    Forbidden,
    #[error("Failed to create token: {0}")]
    TokenCreation(String),
    #[error("Failed to hash password")]
    PasswordHash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    customer_ttl: Duration,
    admin_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &SecretString, customer_ttl: Duration, admin_ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            customer_ttl,
            admin_ttl,
        }
    }

    pub fn issue_customer(&self, user: &User) -> Result<String, AuthError> {
        self.issue(user.id, Some(user.email.clone()), None, Role::Customer, self.customer_ttl)
    }

    pub fn issue_admin(&self, admin: &Admin) -> Result<String, AuthError> {
        self.issue(admin.id, None, Some(admin.username.clone()), Role::Admin, self.admin_ttl)
    }

    fn issue(
        &self,
        sub: Uuid,
        email: Option<String>,
        username: Option<String>,
        role: Role,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims { sub, email, username, role, iat: now.timestamp(), exp: (now + ttl).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// `Authorization: Bearer <token>`. A header that is present but malformed
/// counts as an invalid token rather than a missing one.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else { return Ok(None) };
    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or(AuthError::InvalidToken)
}

/// An authenticated customer.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomerAuth {
    pub user_id: Uuid,
    pub email: String,
}

impl TryFrom<Claims> for CustomerAuth {
    type Error = AuthError;
    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        match claims.role {
            Role::Customer => Ok(Self { user_id: claims.sub, email: claims.email.unwrap_or_default() }),
            Role::Admin => Err(AuthError::Forbidden),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CustomerAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingToken)?;
        Ok(Self::try_from(state.tokens().verify(token)?)?)
    }
}

/// A customer if a token was sent, otherwise a guest. A bad token is still
/// rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionalCustomer(pub Option<CustomerAuth>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalCustomer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(CustomerAuth::try_from(state.tokens().verify(token)?)?))),
            None => Ok(Self(None)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AdminAuth {
    pub admin_id: Uuid,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingToken)?;
        let claims = state.tokens().verify(token)?;
        if claims.role != Role::Admin {
            return Err(AuthError::Forbidden.into());
        }
        Ok(Self { admin_id: claims.sub, username: claims.username.unwrap_or_default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&SecretString::from("unit-test-secret".to_string()), Duration::days(7), Duration::hours(24))
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "noor@example.com".into(),
            password_hash: String::new(),
            first_name: "Noor".into(),
            last_name: "Fatima".into(),
            age: Some(29),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_customer_token_round_trip() {
        let tokens = issuer();
        let u = user();
        let claims = tokens.verify(&tokens.issue_customer(&u).unwrap()).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
        assert_eq!(CustomerAuth::try_from(claims).unwrap().email, "noor@example.com");
    }

    #[test]
    fn test_admin_token_is_not_a_customer() {
        let tokens = issuer();
        let admin = Admin { id: Uuid::new_v4(), username: "barista".into(), password_hash: String::new(), created_at: Utc::now() };
        let claims = tokens.verify(&tokens.issue_admin(&admin).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, Duration::hours(24).num_seconds());
        assert!(matches!(CustomerAuth::try_from(claims), Err(AuthError::Forbidden)));
    }

    #[test]
    fn test_expired_and_foreign_tokens() {
        let expired = TokenIssuer::new(&SecretString::from("unit-test-secret".to_string()), Duration::hours(-2), Duration::hours(-2));
        let token = expired.issue_customer(&user()).unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::TokenExpired)));

        let other = TokenIssuer::new(&SecretString::from("another-secret".to_string()), Duration::days(7), Duration::hours(24));
        let token = other.issue_customer(&user()).unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer().verify("not.a.jwt"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_bearer_header_parsing() {
        let (parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(matches!(bearer_token(&parts), Ok(None)));

        let (parts, _) = Request::builder().header(AUTHORIZATION, "Bearer abc.def").body(()).unwrap().into_parts();
        assert_eq!(bearer_token(&parts).unwrap(), Some("abc.def"));

        let (parts, _) = Request::builder().header(AUTHORIZATION, "Basic dXNlcg==").body(()).unwrap().into_parts();
        assert!(matches!(bearer_token(&parts), Err(AuthError::InvalidToken)));
    }
}
