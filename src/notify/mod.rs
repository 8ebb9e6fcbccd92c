pub mod inbox;
pub mod push;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::claim::Claim;
use crate::models::driver::Driver;
use crate::observability::metrics::Metrics;

pub use inbox::NotificationInbox;
pub use push::{ExpoPushTransport, LogPushTransport, PushTransport};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ClaimCreated,
    ClaimApproved,
    ClaimRejected,
    OrderAssigned,
}

impl EventKind {
    pub fn header(self) -> &'static str {
        match self {
            EventKind::ClaimCreated => "Claim Creation",
            EventKind::ClaimApproved => "Claim Approved",
            EventKind::ClaimRejected => "Claim Rejected",
            EventKind::OrderAssigned => "Order Assigned",
        }
    }

    pub fn event_type(self) -> &'static str {
        match self {
            EventKind::ClaimCreated | EventKind::ClaimApproved | EventKind::ClaimRejected => {
                "claim"
            }
            EventKind::OrderAssigned => "order",
        }
    }
}

/// Emitted after a dispatch change has committed.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    pub kind: EventKind,
    pub order_id: Uuid,
    pub driver_id: Uuid,
    pub claim_id: Option<Uuid>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl DispatchEvent {
    pub fn for_claim(kind: EventKind, claim: &Claim) -> Self {
        let verb = match kind {
            EventKind::ClaimCreated => "created",
            EventKind::ClaimApproved => "approved",
            EventKind::ClaimRejected => "rejected",
            EventKind::OrderAssigned => "assigned",
        };
        Self {
            kind,
            order_id: claim.order_id,
            driver_id: claim.driver_id,
            claim_id: Some(claim.id),
            message: format!(
                "Claim #{} for Order #{} has been {verb}",
                claim.id, claim.order_id
            ),
            occurred_at: Utc::now(),
        }
    }

    pub fn order_assigned(order_id: Uuid, driver_id: Uuid, claim_id: Option<Uuid>) -> Self {
        Self {
            kind: EventKind::OrderAssigned,
            order_id,
            driver_id,
            claim_id,
            message: format!("Order #{order_id} has been assigned to you"),
            occurred_at: Utc::now(),
        }
    }

    fn object_id(&self) -> Uuid {
        match self.kind {
            EventKind::OrderAssigned => self.order_id,
            _ => self.claim_id.unwrap_or(self.order_id),
        }
    }
}

/// An event addressed to one driver's user profile.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: DispatchEvent,
    pub recipient_id: Uuid,
    pub push: Option<PushMessage>,
}

#[derive(Debug, Clone)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
}

impl Envelope {
    pub fn to_driver(event: DispatchEvent, driver: &Driver) -> Self {
        Self {
            event,
            recipient_id: driver.user_id,
            push: None,
        }
    }

    /// Adds a push message when the driver has registered a device token.
    pub fn with_push(mut self, driver: &Driver, title: &str, body: &str) -> Self {
        self.push = driver.push_token.as_ref().map(|token| PushMessage {
            token: token.clone(),
            title: title.to_string(),
            body: body.to_string(),
        });
        self
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        recipient_id: Uuid,
        message: &str,
        header: &str,
        event_type: &str,
        object_id: Uuid,
    ) -> Result<(), AppError>;
}

/// Post-commit delivery of dispatch events.
///
/// Callers hand over envelopes only after their write has committed and the
/// order lock is released. Failures are logged and counted, never returned.
#[derive(Clone)]
pub struct Outbox {
    sink: Arc<dyn NotificationSink>,
    push: Arc<dyn PushTransport>,
    events_tx: broadcast::Sender<DispatchEvent>,
    metrics: Metrics,
}

impl Outbox {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        push: Arc<dyn PushTransport>,
        events_tx: broadcast::Sender<DispatchEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            sink,
            push,
            events_tx,
            metrics,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events_tx.subscribe()
    }

    pub async fn publish(&self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            let event = envelope.event;

            // No subscribers is not an error.
            let _ = self.events_tx.send(event.clone());

            if let Err(err) = self
                .sink
                .notify(
                    envelope.recipient_id,
                    &event.message,
                    event.kind.header(),
                    event.kind.event_type(),
                    event.object_id(),
                )
                .await
            {
                warn!(
                    order_id = %event.order_id,
                    recipient_id = %envelope.recipient_id,
                    error = %err,
                    "notification failed"
                );
                self.metrics
                    .notification_failures_total
                    .with_label_values(&["inbox"])
                    .inc();
            }

            if let Some(message) = envelope.push {
                let push = self.push.clone();
                let metrics = self.metrics.clone();
                let order_id = event.order_id;
                tokio::spawn(async move {
                    if let Err(err) = push
                        .send_push(&message.token, &message.title, &message.body)
                        .await
                    {
                        warn!(order_id = %order_id, error = %err, "push notification failed");
                        metrics
                            .notification_failures_total
                            .with_label_values(&["push"])
                            .inc();
                    }
                });
            }
        }
    }
}
