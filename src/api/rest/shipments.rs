use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;

use crate::engine::shipment::{NewShipment, StatusUpdate};
use crate::error::AppError;
use crate::models::shipment::ShipmentView;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shipments", post(create_shipment))
        .route("/shipments/:id", get(get_shipment))
        .route("/shipments/:id/status", post(update_status))
}

async fn create_shipment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewShipment>,
) -> Result<Json<ShipmentView>, AppError> {
    let shipment = state.shipments.create_shipment(payload)?;
    Ok(Json(shipment.into()))
}

async fn get_shipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentView>, AppError> {
    let shipment = state.shipments.get(&id)?;
    Ok(Json(shipment.into()))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<ShipmentView>, AppError> {
    let shipment = state.shipments.update_status(&id, payload)?;
    Ok(Json(shipment.into()))
}
