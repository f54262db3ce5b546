//! Wishlist repository.

use sqlx::PgPool;
use uuid::Uuid;

use super::{map_constraint, RepositoryError};
use crate::domain::aggregates::product::Product;

pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// Saved products, most recently added first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT p.id, p.name, p.category, p.price, p.in_stock, p.visible, p.description, p.image_url,
                    p.created_at, p.updated_at
             FROM wishlists w JOIN products p ON p.id = w.product_id
             WHERE w.user_id = $1 AND p.visible = TRUE
             ORDER BY w.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Conflict if already saved, not found if the product doesn't exist.
    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO wishlists (user_id, product_id, created_at) VALUES ($1, $2, NOW())")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await
            .map_err(|e| map_constraint(e, "product already in wishlist"))?;
        Ok(())
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
