//! Product repository.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::aggregates::product::{PriceSort, Product, ProductFilter, ProductPatch, ValidNewProduct};

const COLUMNS: &str = "id, name, category, price, in_stock, visible, description, image_url, created_at, updated_at";

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// Visible products, newest first.
    pub async fn list_visible(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE visible = TRUE ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Every product, hidden ones included.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!("SELECT {COLUMNS} FROM products ORDER BY created_at DESC"))
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// A product the public may see; hidden products read as missing.
    pub async fn get_visible(&self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get(id).await?.filter(Product::is_listed))
    }

    pub async fn filter(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM products WHERE visible = TRUE"));
        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(in_stock) = filter.in_stock {
            query.push(" AND in_stock = ").push_bind(in_stock);
        }
        if let Some(min) = filter.min_price {
            query.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            query.push(" AND price <= ").push_bind(max);
        }
        query.push(match filter.sort {
            Some(PriceSort::Ascending) => " ORDER BY price ASC",
            Some(PriceSort::Descending) => " ORDER BY price DESC",
            None => " ORDER BY created_at DESC",
        });
        Ok(query.build_query_as::<Product>().fetch_all(self.pool).await?)
    }

    /// Case-insensitive substring match on the name, visible products only.
    pub async fn search(&self, name: &str) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE visible = TRUE AND strpos(lower(name), lower($1)) > 0 ORDER BY name"
        ))
        .bind(name.trim())
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    pub async fn create(&self, product: &ValidNewProduct) -> Result<Product, RepositoryError> {
        let created = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (id, name, category, price, in_stock, visible, description, image_url, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW()) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.in_stock)
        .bind(product.visible)
        .bind(&product.description)
        .bind(&product.image_url)
        .fetch_one(self.pool)
        .await?;
        Ok(created)
    }

    /// Writes only the fields present in `patch`.
    pub async fn update(&self, id: Uuid, patch: &ProductPatch) -> Result<Product, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = NOW()");
        if let Some(v) = &patch.name { query.push(", name = ").push_bind(v); }
        if let Some(v) = &patch.category { query.push(", category = ").push_bind(v); }
        if let Some(v) = patch.price { query.push(", price = ").push_bind(v); }
        if let Some(v) = &patch.description { query.push(", description = ").push_bind(v); }
        if let Some(v) = &patch.image_url { query.push(", image_url = ").push_bind(v); }
        if let Some(v) = patch.in_stock { query.push(", in_stock = ").push_bind(v); }
        if let Some(v) = patch.visible { query.push(", visible = ").push_bind(v); }
        query.push(" WHERE id = ").push_bind(id).push(format!(" RETURNING {COLUMNS}"));

        query.build_query_as::<Product>().fetch_optional(self.pool).await?.ok_or(RepositoryError::NotFound)
    }

    /// Hard delete. Order lines keep their snapshot and lose nothing.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
