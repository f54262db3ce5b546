//! Server-held carts, one JSON document per session token.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::RepositoryError;
use crate::domain::aggregates::cart::Cart;

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// An unknown session reads as an empty cart.
    pub async fn load(&self, session: &str) -> Result<Cart, RepositoryError> {
        let row: Option<(Json<Cart>,)> = sqlx::query_as("SELECT contents FROM carts WHERE session_id = $1")
            .bind(session)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(Json(cart),)| cart).unwrap_or_default())
    }

    pub async fn save(&self, session: &str, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO carts (session_id, contents, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (session_id) DO UPDATE SET contents = EXCLUDED.contents, updated_at = NOW()",
        )
        .bind(session)
        .bind(Json(cart))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Drops carts not written since `cutoff`. Returns how many went.
    pub async fn purge_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM carts WHERE updated_at < $1").bind(cutoff).execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, session: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE session_id = $1").bind(session).execute(self.pool).await?;
        Ok(())
    }
}
