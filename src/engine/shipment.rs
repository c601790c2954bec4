//! Shipment status tracking.
//!
//! A shipment's history is an append-only list of tracking events and its
//! `status` always mirrors the last event. Which transitions are accepted is
//! decided by a pluggable [`TransitionValidator`]; the default accepts any
//! transition so operators can correct a mistaken status.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::engine::locks::KeyedLocks;
use crate::error::AppError;
use crate::ids;
use crate::models::shipment::{Shipment, ShipmentStatus, TrackingEvent};
use crate::observability::metrics::Metrics;
use crate::store::Stores;

pub type TransitionValidator = fn(ShipmentStatus, ShipmentStatus) -> bool;

pub fn allow_any(_from: ShipmentStatus, _to: ShipmentStatus) -> bool {
    true
}

/// Forward-only table: a non-terminal shipment may stay where it is (to
/// refresh its location), move forward along the delivery path (skipping
/// stages such as customs), or be cancelled. Terminal states are final.
pub fn forward_only(from: ShipmentStatus, to: ShipmentStatus) -> bool {
    if from.is_terminal() {
        return false;
    }
    if to == ShipmentStatus::Cancelled {
        return true;
    }

    match (from.stage(), to.stage()) {
        (Some(current), Some(next)) => next >= current,
        _ => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShipment {
    pub request_id: String,
    pub gp_id: String,
    pub user_id: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: ShipmentStatus,
    pub location: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub struct ShipmentTracker {
    stores: Stores,
    locks: KeyedLocks,
    validator: TransitionValidator,
    metrics: Metrics,
}

impl ShipmentTracker {
    pub fn new(stores: Stores, validator: TransitionValidator, metrics: Metrics) -> Self {
        Self {
            stores,
            locks: KeyedLocks::new(),
            validator,
            metrics,
        }
    }

    pub fn create_shipment(&self, input: NewShipment) -> Result<Shipment, AppError> {
        let now = Utc::now();
        let tracking_number = input
            .tracking_number
            .map(|number| number.trim().to_string())
            .filter(|number| !number.is_empty())
            .unwrap_or_else(ids::tracking_number);

        let shipment = self.stores.shipments.create(Shipment {
            id: ids::generate(ids::SHIPMENT),
            request_id: input.request_id,
            gp_id: input.gp_id,
            user_id: input.user_id,
            status: ShipmentStatus::Pending,
            tracking_number,
            tracking_history: Vec::new(),
            created_at: now,
            updated_at: now,
        })?;

        info!(
            shipment_id = %shipment.id,
            tracking_number = %shipment.tracking_number,
            gp_id = %shipment.gp_id,
            "shipment created"
        );

        Ok(shipment)
    }

    pub fn get(&self, shipment_id: &str) -> Result<Shipment, AppError> {
        self.stores
            .shipments
            .find_by_id(shipment_id)
            .ok_or_else(|| AppError::ShipmentNotFound(shipment_id.to_string()))
    }

    pub fn update_status(
        &self,
        shipment_id: &str,
        update: StatusUpdate,
    ) -> Result<Shipment, AppError> {
        let location = update.location.trim();
        if location.is_empty() {
            return Err(AppError::Validation("location is required".to_string()));
        }

        // Unknown ids fail before a lock entry is created.
        self.get(shipment_id)?;
        let _guard = self.locks.lock(shipment_id);

        let current = self.get(shipment_id)?;
        if !(self.validator)(current.status, update.status) {
            return Err(AppError::InvalidTransition {
                from: current.status,
                to: update.status,
            });
        }

        // Clamp to the previous event so the history stays non-decreasing.
        let now = Utc::now();
        let timestamp = match current.tracking_history.last() {
            Some(previous) if previous.timestamp > now => previous.timestamp,
            _ => now,
        };

        let event = TrackingEvent {
            status: update.status,
            location: location.to_string(),
            notes: update
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            timestamp,
        };

        let shipment = self
            .stores
            .shipments
            .update(shipment_id, &mut |s: &mut Shipment| {
                s.tracking_history.push(event.clone());
                s.status = event.status;
                s.updated_at = event.timestamp;
            })?;

        self.metrics
            .shipment_status_updates_total
            .with_label_values(&[update.status.as_str()])
            .inc();

        info!(
            shipment_id,
            from = %current.status,
            to = %update.status,
            location,
            "shipment status updated"
        );

        Ok(shipment)
    }

    /// Shipments sent by `user_id`, newest first.
    pub fn for_user(&self, user_id: &str) -> Vec<Shipment> {
        let mut shipments = self
            .stores
            .shipments
            .scan(&|s: &Shipment| s.user_id == user_id);
        shipments.reverse();
        shipments
    }

    /// Shipments carried by `gp_id`, newest first.
    pub fn for_gp(&self, gp_id: &str) -> Vec<Shipment> {
        let mut shipments = self.stores.shipments.scan(&|s: &Shipment| s.gp_id == gp_id);
        shipments.reverse();
        shipments
    }
}
