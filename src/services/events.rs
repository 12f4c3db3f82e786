//! Fire-and-forget domain event publishing

use crate::domain::events::DomainEvent;

const SUBJECT_PREFIX: &str = "basecamp";

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    /// Publishes when a broker is connected. Failures are logged, never returned.
    pub async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.nats else {
            tracing::debug!(subject = event.subject(), "No broker configured, event dropped");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, subject = event.subject(), "Failed to serialize event");
                return;
            }
        };
        let subject = format!("{SUBJECT_PREFIX}.{}", event.subject());
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(error = %e, %subject, "Failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_without_broker_is_a_no_op() {
        let events = EventPublisher::default();
        events.publish(DomainEvent::PaymentFailed { order_id: Uuid::nil(), order_number: "BC-20261016-000001".into() }).await;
    }
}
