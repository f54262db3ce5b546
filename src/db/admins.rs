//! Admin principal repository.

use sqlx::PgPool;
use uuid::Uuid;

use super::{map_constraint, RepositoryError};
use crate::domain::aggregates::account::Admin;

pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Admin>, RepositoryError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, username, password_hash, created_at FROM admins WHERE username = $1",
        )
        .bind(username.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Admin>, RepositoryError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT id, username, password_hash, created_at FROM admins WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(admin)
    }

    /// Returns `RepositoryError::Conflict` if the username is taken.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<Admin, RepositoryError> {
        sqlx::query_as::<_, Admin>(
            "INSERT INTO admins (id, username, password_hash, created_at) VALUES ($1, $2, $3, NOW())
             RETURNING id, username, password_hash, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(username.trim())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint(e, "username already exists"))
    }
}
