//! Voucher evaluator: a fixed table of codes mapping to percentage discounts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::Money;

const VOUCHERS: &[(&str, u32)] = &[("SAVE10", 10), ("SAVE20", 20)];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub code: String,
    pub percent: u32,
}

impl Voucher {
    /// Looks up `code` after trimming and upper-casing it.
    pub fn redeem(code: &str) -> Result<Self, VoucherError> {
        let normalized = code.trim().to_uppercase();
        VOUCHERS
            .iter()
            .find(|(c, _)| *c == normalized)
            .map(|(c, pct)| Self { code: (*c).to_string(), percent: *pct })
            .ok_or(VoucherError::Invalid)
    }

    pub fn discount_on(&self, subtotal: Money) -> Money { subtotal.percent(self.percent) }

    pub fn message(&self) -> String { format!("{}% discount applied!", self.percent) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherError {
    #[error("Invalid voucher code")]
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(Voucher::redeem("SAVE10").unwrap().percent, 10);
        assert_eq!(Voucher::redeem("  save20 ").unwrap().percent, 20);
        assert_eq!(Voucher::redeem("SAVE10").unwrap().message(), "10% discount applied!");
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(Voucher::redeem("SAVE30"), Err(VoucherError::Invalid));
        assert_eq!(Voucher::redeem(""), Err(VoucherError::Invalid));
        assert_eq!(VoucherError::Invalid.to_string(), "Invalid voucher code");
    }
}
