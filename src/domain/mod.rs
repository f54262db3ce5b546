//! Domain layer: aggregates, value objects and the checkout workflow.
pub mod aggregates;
pub mod checkout;
pub mod events;
pub mod field_errors;
pub mod value_objects;
pub mod voucher;

pub use field_errors::FieldErrors;
