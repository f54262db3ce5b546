//! Best-effort event publishing over NATS.

use crate::domain::events::DomainEvent;

/// Publishes domain events when a NATS connection is configured; otherwise
/// does nothing. Failures are logged and swallowed.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    /// Connects to `url`, falling back to a disabled publisher.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(url = %url, "Connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "NATS unavailable, events disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: impl Into<DomainEvent>) {
        let Some(client) = &self.nats else { return };
        let event = event.into();
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(subject, error = %e, "Failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(subject, error = %e, "Failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::ProductEvent;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_disabled_publisher_is_a_no_op() {
        let publisher = EventPublisher::connect(None).await;
        assert!(!publisher.is_enabled());
        publisher.publish(ProductEvent::Deleted { product_id: Uuid::new_v4() }).await;
    }
}
