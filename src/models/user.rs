use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpSubscription {
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub amount: f64,
}

impl GpSubscription {
    /// `is_active` is only ever set at activation time, so expiry has to be
    /// checked against the clock as well.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub contact: String,
    pub is_verified: bool,
    pub is_gp: bool,
    pub gp_subscription: Option<GpSubscription>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
