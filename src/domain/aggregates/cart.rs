//! Cart Aggregate
//!
//! Held by the client (or by the server per session token) and recomputed on
//! every mutation. `totals()` is a pure function of the current state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, Quantity};
use crate::domain::voucher::{Voucher, VoucherError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
    voucher: Option<Voucher>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price(),
            quantity: quantity.value(),
            image_url: (!product.image_url.is_empty()).then(|| product.image_url.clone()),
        }
    }

    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub applied_voucher: Option<Voucher>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn voucher(&self) -> Option<&Voucher> { self.voucher.as_ref() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Adds `quantity` of a product, merging into an existing line.
    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Sets the quantity of a line. Values below one, and unknown products,
    /// leave the cart untouched. Returns whether anything changed.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i64) -> bool {
        let Ok(quantity) = Quantity::new(quantity) else { return false };
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity.value();
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    /// Empties the cart and drops any applied voucher.
    pub fn clear(&mut self) {
        self.items.clear();
        self.voucher = None;
    }

    /// A failed code leaves any previously applied voucher in place.
    pub fn apply_voucher(&mut self, code: &str) -> Result<&Voucher, VoucherError> {
        let voucher = Voucher::redeem(code)?;
        Ok(&*self.voucher.insert(voucher))
    }

    pub fn remove_voucher(&mut self) { self.voucher = None; }

    pub fn totals(&self) -> CartTotals {
        let item_count = self.items.iter().map(|i| i.quantity).sum();
        let subtotal: Money = self.items.iter().map(CartItem::line_total).sum();
        let discount = self.voucher.as_ref().map_or(Money::ZERO, |v| v.discount_on(subtotal));
        CartTotals {
            item_count,
            subtotal,
            discount,
            total: subtotal.subtract(discount),
            applied_voucher: self.voucher.clone(),
        }
    }
}
