//! Saved payment cards.
//!
//! Only a masked number and the last four digits are ever kept. A CVV sent by
//! a client is not part of [`CardDetails`] and is dropped at deserialization.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::field_errors::FieldErrors;

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub card_holder: String,
    pub masked_number: String,
    pub card_last4: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardDetails {
    pub card_number: String,
    pub card_holder: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
}

/// Card data safe to persist.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskedCard {
    pub card_holder: String,
    pub masked_number: String,
    pub last4: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
}

impl CardDetails {
    pub fn validate(&self) -> Result<MaskedCard, FieldErrors> {
        self.validate_at(Utc::now().year())
    }

    pub fn validate_at(&self, current_year: i32) -> Result<MaskedCard, FieldErrors> {
        let mut errors = FieldErrors::new();
        let digits: String = self.card_number.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if !(12..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            errors.add("cardNumber", "Card number must be 12 to 19 digits");
        }
        if self.card_holder.trim().is_empty() {
            errors.add("cardHolder", "Card holder is required");
        }
        if !(1..=12).contains(&self.expiry_month) {
            errors.add("expiryMonth", "Expiry month must be between 1 and 12");
        }
        if self.expiry_year < current_year {
            errors.add("expiryYear", "Card has expired");
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let last4 = digits[digits.len() - 4..].to_string();
        Ok(MaskedCard {
            card_holder: self.card_holder.trim().to_string(),
            masked_number: format!("**** **** **** {last4}"),
            last4,
            expiry_month: self.expiry_month,
            expiry_year: self.expiry_year,
        })
    }
}
