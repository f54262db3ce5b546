//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{AmountError, Money};

/// A catalog entry. Hidden products (`visible == false`) stay in the table but
/// never appear on the public surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub in_stock: bool,
    pub visible: bool,
    pub description: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn price(&self) -> Money { Money::new(self.price) }
    pub fn is_listed(&self) -> bool { self.visible }
}

/// Admin input for a new product.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewProduct {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    pub visible: Option<bool>,
}

/// A `NewProduct` with its required fields checked.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidNewProduct {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
    pub in_stock: bool,
    pub visible: bool,
}

impl NewProduct {
    pub fn validate(self) -> Result<ValidNewProduct, ProductError> {
        let name = required(self.name).ok_or(ProductError::MissingRequired)?;
        let category = required(self.category).ok_or(ProductError::MissingRequired)?;
        let price = Money::parse_amount(self.price.ok_or(ProductError::MissingRequired)?)?.amount();
        Ok(ValidNewProduct {
            name,
            category,
            price,
            description: self.description.unwrap_or_default(),
            image_url: self.image_url.unwrap_or_default(),
            in_stock: self.in_stock.unwrap_or(true),
            visible: self.visible.unwrap_or(true),
        })
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Partial update. Only allow-listed keys are read; anything else in the
/// payload is ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    pub visible: Option<bool>,
}

impl ProductPatch {
    pub const ALLOWED_FIELDS: [&'static str; 7] =
        ["name", "category", "price", "description", "image_url", "in_stock", "visible"];

    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ProductError> {
        let mut patch = Self::default();
        for (key, value) in body.iter().filter(|(k, _)| Self::ALLOWED_FIELDS.contains(&k.as_str())) {
            match key.as_str() {
                "name" => patch.name = Some(string_field("name", value)?),
                "category" => patch.category = Some(string_field("category", value)?),
                "description" => patch.description = Some(string_field("description", value)?),
                "image_url" => patch.image_url = Some(string_field("image_url", value)?),
                "price" => {
                    let price: Decimal = serde_json::from_value(value.clone())
                        .map_err(|_| ProductError::InvalidField("price"))?;
                    patch.price = Some(Money::parse_amount(price)?.amount());
                }
                "in_stock" => patch.in_stock = Some(bool_field("in_stock", value)?),
                "visible" => patch.visible = Some(bool_field("visible", value)?),
                _ => {}
            }
        }
        if patch.is_empty() { return Err(ProductError::NoFields); }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool { *self == Self::default() }
}

fn string_field(field: &'static str, value: &Value) -> Result<String, ProductError> {
    value.as_str().map(str::to_string).ok_or(ProductError::InvalidField(field))
}

// MySQL-era clients send 0/1 for flags.
fn bool_field(field: &'static str, value: &Value) -> Result<bool, ProductError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        _ => Err(ProductError::InvalidField(field)),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceSort { Ascending, Descending }

impl PriceSort {
    /// `price_asc` / `price_desc`; anything else means unsorted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "price_asc" => Some(Self::Ascending),
            "price_desc" => Some(Self::Descending),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub in_stock: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<PriceSort>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Name, category, and price are required")]
    MissingRequired,
    #[error("Price {0}")]
    InvalidPrice(#[from] AmountError),
    #[error("Invalid value for {0}")]
    InvalidField(&'static str),
    #[error("No valid fields to update")]
    NoFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> { v.as_object().cloned().unwrap() }

    #[test]
    fn test_new_product_defaults() {
        let p = NewProduct { name: Some("Latte".into()), category: Some("Hot".into()), price: Some(Decimal::new(450, 0)), ..Default::default() }
            .validate()
            .unwrap();
        assert!(p.in_stock && p.visible);
        assert_eq!(p.description, "");
    }

    #[test]
    fn test_new_product_requires_fields() {
        let err = NewProduct { name: Some("  ".into()), category: Some("Hot".into()), price: Some(Decimal::ONE), ..Default::default() }.validate();
        assert_eq!(err, Err(ProductError::MissingRequired));
        let err = NewProduct { name: Some("Mocha".into()), category: Some("Hot".into()), price: Some(Decimal::NEGATIVE_ONE), ..Default::default() }.validate();
        assert_eq!(err, Err(ProductError::InvalidPrice(AmountError::Negative)));
    }

    #[test]
    fn test_price_must_fit_the_column() {
        let base = NewProduct { name: Some("Flat White".into()), category: Some("Hot".into()), ..Default::default() };
        let err = NewProduct { price: Some(Decimal::new(4505, 3)), ..base.clone() }.validate();
        assert_eq!(err, Err(ProductError::InvalidPrice(AmountError::TooPrecise)));
        let err = NewProduct { price: Some(Decimal::from(100_000_000)), ..base }.validate();
        assert_eq!(err.unwrap_err().to_string(), "Price cannot exceed 99999999.99");

        let patch = ProductPatch::from_json(&object(json!({ "price": 1e20 })));
        assert_eq!(patch, Err(ProductError::InvalidPrice(AmountError::TooLarge)));
        let patch = ProductPatch::from_json(&object(json!({ "price": 4.999 })));
        assert_eq!(patch, Err(ProductError::InvalidPrice(AmountError::TooPrecise)));
    }

    #[test]
    fn test_patch_ignores_unknown_fields() {
        let patch = ProductPatch::from_json(&object(json!({ "price": 399.5, "sku": "X", "id": "abc", "visible": 0 }))).unwrap();
        assert_eq!(patch.price, Some(Decimal::new(3995, 1)));
        assert_eq!(patch.visible, Some(false));
        assert!(patch.name.is_none());
    }

    #[test]
    fn test_patch_without_known_fields() {
        assert_eq!(ProductPatch::from_json(&object(json!({ "colour": "red" }))), Err(ProductError::NoFields));
        assert_eq!(ProductPatch::from_json(&object(json!({ "in_stock": "yes" }))), Err(ProductError::InvalidField("in_stock")));
    }

    #[test]
    fn test_price_sort() {
        assert_eq!(PriceSort::parse("price_desc"), Some(PriceSort::Descending));
        assert_eq!(PriceSort::parse("name"), None);
    }
}
