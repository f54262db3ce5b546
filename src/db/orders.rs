//! Order repository.
//!
//! An order and its lines are written in one transaction; a failure on any
//! line rolls back the order row as well.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{map_constraint, RepositoryError};
use crate::domain::aggregates::order::{LineItem, NewOrder, Order, OrderDetail, OrderStatus, OrderSummary};

const COLUMNS: &str = "id, order_number, user_id, customer_name, contact_email, contact_phone, subtotal, shipping_cost, \
     total_amount, payment_method, shipping_method, status, delivery_address, delivery_city, delivery_postal_code, \
     delivery_phone, estimated_delivery, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    customer_name: String,
    contact_email: String,
    contact_phone: String,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total_amount: Decimal,
    payment_method: String,
    shipping_method: String,
    status: String,
    delivery_address: String,
    delivery_city: String,
    delivery_postal_code: String,
    delivery_phone: String,
    estimated_delivery: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_status(&r.status)?,
            id: r.id,
            order_number: r.order_number,
            user_id: r.user_id,
            customer_name: r.customer_name,
            contact_email: r.contact_email,
            contact_phone: r.contact_phone,
            subtotal: r.subtotal,
            shipping_cost: r.shipping_cost,
            total_amount: r.total_amount,
            payment_method: r.payment_method,
            shipping_method: r.shipping_method,
            delivery_address: r.delivery_address,
            delivery_city: r.delivery_city,
            delivery_postal_code: r.delivery_postal_code,
            delivery_phone: r.delivery_phone,
            estimated_delivery: r.estimated_delivery,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    order_number: String,
    total_amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    estimated_delivery: NaiveDate,
}

impl TryFrom<SummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(r: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_status(&r.status)?,
            id: r.id,
            order_number: r.order_number,
            total_amount: r.total_amount,
            created_at: r.created_at,
            estimated_delivery: r.estimated_delivery,
        })
    }
}

/// Back-office listing row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdminOrderSummary {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub customer_name: String,
    pub contact_email: String,
    pub guest: bool,
}

#[derive(sqlx::FromRow)]
struct AdminSummaryRow {
    #[sqlx(flatten)]
    summary: SummaryRow,
    customer_name: String,
    contact_email: String,
    guest: bool,
}

fn parse_status(raw: &str) -> Result<OrderStatus, RepositoryError> {
    raw.parse().map_err(|_| RepositoryError::DataCorruption(format!("unknown order status `{raw}`")))
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// Inserts the order and every line, or nothing.
    ///
    /// Returns `RepositoryError::Conflict` if the order number is already taken.
    pub async fn create(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (id, order_number, user_id, customer_name, contact_email, contact_phone, subtotal,
                shipping_cost, total_amount, payment_method, shipping_method, status, delivery_address, delivery_city,
                delivery_postal_code, delivery_phone, estimated_delivery, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW())
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(new.order_number.as_str())
        .bind(new.user_id)
        .bind(&new.customer_name)
        .bind(&new.contact_email)
        .bind(&new.delivery.phone)
        .bind(new.totals.subtotal.amount())
        .bind(new.totals.shipping.amount())
        .bind(new.totals.total.amount())
        .bind(&new.payment_method)
        .bind(&new.shipping_method)
        .bind(new.status.as_str())
        .bind(&new.delivery.address)
        .bind(&new.delivery.city)
        .bind(&new.delivery.postal_code)
        .bind(&new.delivery.phone)
        .bind(new.estimated_delivery)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "order number already exists"))?;

        for item in &new.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, product_name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::now_v7())
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(i64::from(item.quantity.value()))
            .bind(item.unit_price.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Order::try_from(row)
    }

    /// Purchase history for one account, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, order_number, total_amount, status, created_at, estimated_delivery
             FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// An order with its lines, only if it belongs to `user_id`.
    pub async fn get_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<OrderDetail>, RepositoryError> {
        match self.get(order_id).await? {
            Some(detail) if detail.order.user_id == user_id => Ok(Some(detail)),
            _ => Ok(None),
        }
    }

    pub async fn get(&self, order_id: Uuid) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, LineItem>(
            "SELECT id, order_id, product_id, product_name, quantity, unit_price
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(OrderDetail { order: Order::try_from(row)?, items }))
    }

    /// All orders with the customer's name, newest first.
    pub async fn list_all(&self, guest_account: Uuid) -> Result<Vec<AdminOrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminSummaryRow>(
            "SELECT o.id, o.order_number, o.total_amount, o.status, o.created_at, o.estimated_delivery,
                    COALESCE(NULLIF(o.customer_name, ''), u.first_name || ' ' || u.last_name) AS customer_name,
                    o.contact_email,
                    o.user_id = $1 AS guest
             FROM orders o JOIN users u ON u.id = o.user_id
             ORDER BY o.created_at DESC",
        )
        .bind(guest_account)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(AdminOrderSummary {
                    summary: OrderSummary::try_from(r.summary)?,
                    customer_name: r.customer_name,
                    contact_email: r.contact_email,
                    guest: r.guest,
                })
            })
            .collect()
    }

    /// Sets the status and returns the order with the status it had before.
    pub async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<(Order, OrderStatus), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        let previous = parse_status(&previous.ok_or(RepositoryError::NotFound)?.0)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!("UPDATE orders SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"))
            .bind(order_id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok((Order::try_from(row)?, previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GUEST_ACCOUNT_ID;
    use crate::db::test_pool;
    use crate::domain::aggregates::order::{DeliveryAddress, NewLineItem, OrderTotals};
    use crate::domain::value_objects::{Money, OrderNumber, Quantity};

    fn line(name: &str, quantity: i64, price: i64) -> NewLineItem {
        NewLineItem {
            product_id: None,
            product_name: name.into(),
            quantity: Quantity::new(quantity).unwrap(),
            unit_price: Money::from(price),
        }
    }

    fn guest_order(items: Vec<NewLineItem>) -> NewOrder {
        let subtotal: Money = items.iter().map(|i| i.unit_price.multiply(i.quantity.value())).sum();
        NewOrder {
            order_number: OrderNumber::parse(&format!("#ORD-T{}", Uuid::new_v4().simple())).unwrap(),
            user_id: DEFAULT_GUEST_ACCOUNT_ID,
            customer_name: "Zara Ahmed".into(),
            contact_email: "zara@example.com".into(),
            totals: OrderTotals::compute(subtotal, Money::ZERO, Money::from(220)),
            payment_method: "COD".into(),
            shipping_method: "Standard".into(),
            status: OrderStatus::Processing,
            delivery: DeliveryAddress {
                address: "House 3, G-9/4".into(),
                city: "Islamabad".into(),
                postal_code: "44000".into(),
                phone: "03211234567".into(),
            },
            estimated_delivery: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            items,
        }
    }

    async fn count(pool: &PgPool, sql: &str, value: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(sql).bind(value).fetch_one(pool).await.unwrap();
        n
    }

    #[tokio::test]
    async fn test_create_writes_one_order_and_every_line() {
        let Some(pool) = test_pool::connect().await else { return };
        let repo = OrderRepository::new(&pool);
        let new = guest_order(vec![line("Espresso", 2, 350), line("Croissant", 1, 280), line("Latte", 3, 450)]);

        let order = repo.create(&new).await.unwrap();
        assert_eq!(order.total_amount, Decimal::from(2550));
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE order_number = $1", new.order_number.as_str()).await, 1);
        let detail = repo.get(order.id).await.unwrap().unwrap();
        assert_eq!(detail.items.len(), 3);
        assert_eq!(detail.items.iter().map(LineItem::line_total).sum::<Decimal>(), Decimal::from(2330));
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_the_order() {
        let Some(pool) = test_pool::connect().await else { return };
        let mut bad = line("Refund", 1, 0);
        bad.unit_price = Money::new(Decimal::NEGATIVE_ONE);
        let new = guest_order(vec![line("Mocha", 1, 500), bad]);

        let err = OrderRepository::new(&pool).create(&new).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Database(_)));
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE order_number = $1", new.order_number.as_str()).await, 0);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM order_items WHERE product_name = $1 AND unit_price < 0", "Refund").await,
            0
        );
    }

    #[tokio::test]
    async fn test_duplicate_order_number_is_a_conflict() {
        let Some(pool) = test_pool::connect().await else { return };
        let repo = OrderRepository::new(&pool);
        let first = guest_order(vec![line("Americano", 1, 300)]);
        repo.create(&first).await.unwrap();

        let mut second = guest_order(vec![line("Cortado", 2, 320)]);
        second.order_number = first.order_number.clone();
        assert!(matches!(repo.create(&second).await, Err(RepositoryError::Conflict(_))));
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE order_number = $1", first.order_number.as_str()).await, 1);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM order_items WHERE product_name = $1", "Cortado").await, 0);
    }
}
