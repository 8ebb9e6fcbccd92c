use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::Driver;
use crate::models::order::Order;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// A pending claim was approved by the driver or an admin.
    Claim,
    /// An admin assigned the driver directly.
    Forced,
}

/// Order and driver as committed by the winning write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub order: Order,
    pub driver: Driver,
    pub claim_id: Option<Uuid>,
    pub source: AssignmentSource,
    pub assigned_at: DateTime<Utc>,
}
