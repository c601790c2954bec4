use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    Accepted,
    InTransit,
    Customs,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 7] = [
        ShipmentStatus::Pending,
        ShipmentStatus::Accepted,
        ShipmentStatus::InTransit,
        ShipmentStatus::Customs,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }

    /// Position along the forward delivery path. `Cancelled` sits off the path.
    pub fn stage(self) -> Option<u8> {
        match self {
            ShipmentStatus::Pending => Some(0),
            ShipmentStatus::Accepted => Some(1),
            ShipmentStatus::InTransit => Some(2),
            ShipmentStatus::Customs => Some(3),
            ShipmentStatus::OutForDelivery => Some(4),
            ShipmentStatus::Delivered => Some(5),
            ShipmentStatus::Cancelled => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Accepted => "accepted",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Customs => "customs",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub status: ShipmentStatus,
    pub location: String,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub request_id: String,
    pub gp_id: String,
    pub user_id: String,
    pub status: ShipmentStatus,
    pub tracking_number: String,
    pub tracking_history: Vec<TrackingEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn current_location(&self) -> Option<&str> {
        self.tracking_history
            .last()
            .map(|event| event.location.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentView {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub current_location: Option<String>,
    pub is_terminal: bool,
}

impl From<Shipment> for ShipmentView {
    fn from(shipment: Shipment) -> Self {
        let current_location = shipment.current_location().map(str::to_string);
        let is_terminal = shipment.status.is_terminal();
        Self {
            shipment,
            current_location,
            is_terminal,
        }
    }
}
