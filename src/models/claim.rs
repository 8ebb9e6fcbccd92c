use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// Generated by proximity matching when the order is placed.
    System,
    /// Requested by the driver directly.
    Driver,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ClaimStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ClaimStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claim {
    pub id: Uuid,
    pub order_id: Uuid,
    pub driver_id: Uuid,
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    pub fn new(order_id: Uuid, driver_id: Uuid, claim_type: ClaimType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            driver_id,
            claim_type,
            status: ClaimStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ClaimStatus::Pending
    }

    /// Moves a pending claim into a terminal state.
    pub fn transition(&mut self, next: ClaimStatus) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::AlreadyResolved(format!(
                "claim {} is already {:?}",
                self.id, self.status
            )));
        }
        if next == ClaimStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "claim {} cannot move back to pending",
                self.id
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
