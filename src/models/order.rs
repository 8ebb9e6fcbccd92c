use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Shipped,
    Delivered,
    Completed,
}

impl DeliveryStatus {
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::Pending, DeliveryStatus::Shipped)
                | (DeliveryStatus::Shipped, DeliveryStatus::Delivered)
                | (DeliveryStatus::Shipped, DeliveryStatus::Completed)
                | (DeliveryStatus::Delivered, DeliveryStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Credit,
    Failed,
}

/// Result reported by the payment gateway for an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    Credit,
}

impl PaymentMethod {
    pub fn initial_payment_status(self) -> PaymentStatus {
        match self {
            PaymentMethod::Credit => PaymentStatus::Credit,
            PaymentMethod::Card | PaymentMethod::Cash => PaymentStatus::Unpaid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub destination: Option<GeoPoint>,
    pub destination_address: Option<String>,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: Uuid,
        destination: Option<GeoPoint>,
        destination_address: Option<String>,
        payment_method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            destination,
            destination_address,
            delivery_status: DeliveryStatus::Pending,
            payment_status: payment_method.initial_payment_status(),
            payment_method,
            driver_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.driver_id.is_some()
    }

    pub fn transition_delivery(&mut self, next: DeliveryStatus) -> Result<(), AppError> {
        if !self.delivery_status.can_transition_to(next) {
            return Err(AppError::InvalidTransition(format!(
                "order {} cannot move from {:?} to {:?}",
                self.id, self.delivery_status, next
            )));
        }
        self.delivery_status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
