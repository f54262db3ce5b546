//! Application services: order placement and its side effects, uploads,
//! cart expiry.
pub mod cart_sweeper;
pub mod email;
pub mod events;
pub mod orders;
pub mod uploads;

pub use email::EmailService;
pub use events::EventPublisher;
pub use orders::{InProcessGateway, OrderService};
pub use uploads::ImageStore;
