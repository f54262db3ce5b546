//! Aggregates module
pub mod account;
pub mod cart;
pub mod order;
pub mod payment_method;
pub mod product;

pub use account::{Admin, User, UserProfile};
pub use cart::{Cart, CartItem, CartTotals};
pub use order::{LineItem, Order, OrderDetail, OrderError, OrderOwner, OrderReceipt, OrderStatus, OrderSummary, PlaceOrder};
pub use payment_method::{CardDetails, PaymentMethod};
pub use product::{Product, ProductError, ProductFilter, ProductPatch};
