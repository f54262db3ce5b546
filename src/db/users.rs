//! Customer account repository.

use sqlx::PgPool;
use uuid::Uuid;

use super::{map_constraint, RepositoryError};
use crate::domain::aggregates::account::{ProfileChanges, User};

const COLUMNS: &str = "id, email, password_hash, first_name, last_name, age, created_at, updated_at";

/// Fields for a new account; the password is already hashed.
pub struct NewUser<'r> {
    pub email: &'r str,
    pub password_hash: &'r str,
    pub first_name: &'r str,
    pub last_name: &'r str,
    pub age: Option<i32>,
}

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// Email is matched case-insensitively.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)"))
            .bind(email.trim())
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Returns `RepositoryError::Conflict` if the email is taken.
    pub async fn create(&self, new: NewUser<'_>) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, age, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(new.email.trim().to_lowercase())
        .bind(new.password_hash)
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .bind(new.age)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint(e, "email already exists"))
    }

    pub async fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                age = COALESCE($4, age),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(changes.age)
        .bind(&changes.password_hash)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
