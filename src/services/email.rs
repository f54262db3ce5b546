//! Order confirmation email over SMTP.

use lettre::message::header::ContentType;
use lettre::message::{MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::domain::aggregates::order::Order;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(config.username.clone(), config.password.expose_secret().to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self { mailer, from_address: config.from.clone() })
    }

    pub async fn send_order_confirmation(&self, to: &str, greeting_name: &str, order: &Order) -> Result<(), EmailError> {
        let (subject, text, html) = order_confirmation(greeting_name, order);
        let email = Message::builder()
            .from(self.from_address.parse().map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?)
            .to(to.parse().map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
            )?;

        self.mailer.send(email).await?;
        tracing::info!(to = %to, order_number = %order.order_number, "Order confirmation sent");
        Ok(())
    }
}

/// Subject, plain-text body and HTML body.
fn order_confirmation(name: &str, order: &Order) -> (String, String, String) {
    let subject = format!("Order Confirmation - {}", order.order_number);
    let total = format!("Rs. {:.2}", order.total_amount);
    let text = format!(
        "Hi {name},\n\nThank you for your order!\nOrder #: {}\nTotal: {total}\nEstimated delivery: {}\n",
        order.order_number, order.estimated_delivery
    );
    let html = format!(
        "<h2>Order Confirmation</h2><p>Hi {name},</p><p>Order #: <strong>{}</strong></p>\
         <p>Total: {total}</p><p>Estimated delivery: {}</p><p>Thank you for your order!</p>",
        order.order_number, order.estimated_delivery
    );
    (subject, text, html)
}
