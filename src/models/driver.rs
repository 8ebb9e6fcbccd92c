use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub id: Uuid,
    /// User profile that receives this driver's notifications.
    pub user_id: Uuid,
    pub name: String,
    pub vehicle_number: Option<String>,
    pub push_token: Option<String>,
    pub status: DriverStatus,
    pub location: Option<GeoPoint>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn new(user_id: Uuid, name: impl Into<String>, location: Option<GeoPoint>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            vehicle_number: None,
            push_token: None,
            status: DriverStatus::Available,
            location,
            updated_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == DriverStatus::Available
    }

    pub fn set_status(&mut self, status: DriverStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
