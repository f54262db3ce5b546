//! Saved card repository.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{map_constraint, RepositoryError};
use crate::domain::aggregates::payment_method::{MaskedCard, PaymentMethod};

const COLUMNS: &str =
    "id, user_id, card_holder, masked_number, card_last4, expiry_month, expiry_year, is_default, created_at";

pub struct PaymentMethodRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentMethodRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// Default card first, then newest.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<PaymentMethod>, RepositoryError> {
        let methods = sqlx::query_as::<_, PaymentMethod>(&format!(
            "SELECT {COLUMNS} FROM payment_methods WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(methods)
    }

    /// The user's first card becomes the default. Concurrent adds for the same
    /// user are serialized on the user row.
    pub async fn add(&self, user_id: Uuid, card: &MaskedCard) -> Result<PaymentMethod, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;

        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_methods WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let method = sqlx::query_as::<_, PaymentMethod>(&format!(
            "INSERT INTO payment_methods (id, user_id, card_holder, masked_number, card_last4, expiry_month, expiry_year, is_default, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&card.card_holder)
        .bind(&card.masked_number)
        .bind(&card.last4)
        .bind(card.expiry_month)
        .bind(card.expiry_year)
        .bind(existing == 0)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "default payment method changed concurrently"))?;

        tx.commit().await?;
        Ok(method)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM payment_methods WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Clears the current default and sets the new one in one transaction.
    pub async fn set_default(&self, user_id: Uuid, id: Uuid) -> Result<PaymentMethod, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;

        sqlx::query("UPDATE payment_methods SET is_default = FALSE WHERE user_id = $1 AND is_default")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let method = sqlx::query_as::<_, PaymentMethod>(&format!(
            "UPDATE payment_methods SET is_default = TRUE WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "default payment method changed concurrently"))?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(method)
    }
}

/// Row lock on the owning account; an unknown user is `NotFound`.
async fn lock_owner(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<(), RepositoryError> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(())
}
