//! Order Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::field_errors::FieldErrors;
use crate::domain::value_objects::{EmailAddress, Money, OrderNumber, Quantity};

/// Order lifecycle label. Any status may move to any other; there is no
/// guarded transition graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Processing,
    #[serde(rename = "Being Packaged")]
    BeingPackaged,
    #[serde(rename = "On Route")]
    OnRoute,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] =
        [Self::Processing, Self::BeingPackaged, Self::OnRoute, Self::Completed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::BeingPackaged => "Being Packaged",
            Self::OnRoute => "On Route",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Who an order is attributed to. Guests map onto a sentinel account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderOwner {
    Account(Uuid),
    Guest,
}

impl OrderOwner {
    pub fn account_id(&self, guest_account: Uuid) -> Uuid {
        match self {
            Self::Account(id) => *id,
            Self::Guest => guest_account,
        }
    }
}

/// Monetary breakdown at submission. Only `total` reflects the discount once
/// stored; the discount itself is not persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    pub fn compute(subtotal: Money, discount: Money, shipping: Money) -> Self {
        Self { subtotal, discount, shipping, total: subtotal.add(shipping).subtract(discount) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub customer_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub payment_method: String,
    pub shipping_method: String,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: String,
    pub delivery_phone: String,
    pub estimated_delivery: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the previous status.
    pub fn set_status(&mut self, status: OrderStatus) -> OrderStatus {
        std::mem::replace(&mut self.status, status)
    }
}

/// Line snapshot: product name and unit price are copied at order time so
/// later catalog edits or deletes don't alter history.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct LineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<LineItem>,
}

// =============================================================================
// Submission payload
// =============================================================================

/// `{customer?, order, items[]}` as posted to the order endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlaceOrder {
    #[serde(default)]
    pub customer: Option<CustomerContact>,
    pub order: OrderHeader,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrderHeader {
    #[serde(default)]
    pub order_number: Option<String>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default)]
    pub delivery_postal_code: Option<String>,
    #[serde(default)]
    pub delivery_phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i64,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewLineItem {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

/// Guest contact details that passed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct GuestContact {
    pub name: String,
    pub email: EmailAddress,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedOrder {
    pub order_number: Option<OrderNumber>,
    pub guest: Option<GuestContact>,
    pub totals: OrderTotals,
    pub payment_method: String,
    pub shipping_method: String,
    pub delivery: DeliveryAddress,
    pub items: Vec<NewLineItem>,
}

/// Everything needed to write one order row plus its item rows.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: Uuid,
    pub customer_name: String,
    pub contact_email: String,
    pub totals: OrderTotals,
    pub payment_method: String,
    pub shipping_method: String,
    pub status: OrderStatus,
    pub delivery: DeliveryAddress,
    pub estimated_delivery: NaiveDate,
    pub items: Vec<NewLineItem>,
}

impl PlaceOrder {
    pub const DEFAULT_PAYMENT_METHOD: &'static str = "COD";
    pub const DEFAULT_SHIPPING_METHOD: &'static str = "Standard";

    /// Checks the payload and its arithmetic. Guests must supply contact
    /// details; account orders take them from the account.
    pub fn validate(&self, owner: OrderOwner) -> Result<ValidatedOrder, FieldErrors> {
        let mut errors = FieldErrors::new();
        let header = &self.order;

        let guest = match (owner, &self.customer) {
            (OrderOwner::Guest, None) => {
                errors.add("customer", "Customer details are required");
                None
            }
            (OrderOwner::Guest, Some(c)) => {
                if c.name.trim().is_empty() { errors.add("customer.name", "Name is required"); }
                match EmailAddress::parse(&c.email) {
                    Ok(email) => Some(GuestContact { name: c.name.trim().to_string(), email }),
                    Err(e) => {
                        errors.add("customer.email", e.to_string());
                        None
                    }
                }
            }
            (OrderOwner::Account(_), _) => None,
        };

        if self.items.is_empty() {
            errors.add("items", "Order must contain at least one item");
        }
        let mut items = Vec::with_capacity(self.items.len());
        for (i, line) in self.items.iter().enumerate() {
            if line.product_name.trim().is_empty() {
                errors.add(format!("items[{i}].product_name"), "Product name is required");
            }
            let unit_price = amount_field(&mut errors, format!("items[{i}].price"), "Price", line.price);
            match Quantity::new(line.quantity) {
                Ok(quantity) => items.push(NewLineItem {
                    product_id: line.product_id,
                    product_name: line.product_name.trim().to_string(),
                    quantity,
                    unit_price,
                }),
                Err(e) => errors.add(format!("items[{i}].quantity"), e.to_string()),
            }
        }

        let subtotal = amount_field(&mut errors, "order.subtotal", "Subtotal", header.subtotal);
        let shipping = amount_field(&mut errors, "order.shipping_cost", "Shipping cost", header.shipping_cost);
        let discount = amount_field(&mut errors, "order.discount", "Discount", header.discount);
        let total_amount = amount_field(&mut errors, "order.total_amount", "Total", header.total_amount);
        if discount > subtotal {
            errors.add("order.discount", "Discount must be between zero and the subtotal");
        }
        if errors.is_empty() {
            let computed = items
                .iter()
                .try_fold(Money::ZERO, |acc, i| acc.checked_add(i.unit_price.checked_multiply(i.quantity.value())?));
            if computed != Some(subtotal) { errors.add("order.subtotal", "Subtotal does not match order items"); }
        }
        let totals = OrderTotals::compute(subtotal, discount, shipping);
        if errors.is_empty() && totals.total != total_amount {
            errors.add("order.total_amount", "Total must equal subtotal plus shipping minus discount");
        }

        let contact = self.customer.as_ref();
        let address = first_present(&header.delivery_address, contact.and_then(|c| c.address.as_ref()));
        if address.is_empty() { errors.add("order.delivery_address", "Address is required"); }
        let phone = first_present(&header.delivery_phone, contact.and_then(|c| c.phone.as_ref()));
        if phone.is_empty() { errors.add("order.delivery_phone", "Mobile number is required"); }

        let order_number = match header.order_number.as_deref() {
            Some(raw) => {
                let parsed = OrderNumber::parse(raw);
                if parsed.is_none() { errors.add("order.order_number", "Order number cannot be blank"); }
                parsed
            }
            None => None,
        };

        errors.into_result(ValidatedOrder {
            order_number,
            guest,
            totals,
            payment_method: non_blank(&header.payment_method).unwrap_or_else(|| Self::DEFAULT_PAYMENT_METHOD.to_string()),
            shipping_method: non_blank(&header.shipping_method).unwrap_or_else(|| Self::DEFAULT_SHIPPING_METHOD.to_string()),
            delivery: DeliveryAddress {
                address,
                city: non_blank(&header.delivery_city).unwrap_or_default(),
                postal_code: non_blank(&header.delivery_postal_code).unwrap_or_default(),
                phone,
            },
            items,
        })
    }
}

/// What the order endpoint hands back once the order is stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub order_number: String,
    pub total: Decimal,
    pub estimated_delivery: NaiveDate,
}

/// Checks an incoming amount against the money column bounds. Rejected
/// amounts are recorded under `field` and read as zero.
fn amount_field(errors: &mut FieldErrors, field: impl Into<String>, label: &str, amount: Decimal) -> Money {
    Money::parse_amount(amount).unwrap_or_else(|e| {
        errors.add(field, format!("{label} {e}"));
        Money::ZERO
    })
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn first_present(primary: &Option<String>, fallback: Option<&String>) -> String {
    non_blank(primary).or_else(|| non_blank(&fallback.cloned())).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
}
