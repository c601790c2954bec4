use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::api::rest::{
    required, ActorQuery, ContactRequest, ContactResponse, DeleteResponse, RouteFilter,
};
use crate::engine::contact::{initiate_contact, ContactTarget};
use crate::engine::policy::{DenyReason, InteractionKind};
use crate::error::AppError;
use crate::ids;
use crate::models::request::RequestAnnouncement;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/:id", get(get_request).delete(delete_request))
        .route("/requests/:id/contact", post(contact_owner))
}

#[derive(Deserialize)]
pub struct CreateRequestRequest {
    pub user_id: String,
    pub from_country: String,
    pub to_country: String,
    pub weight: f64,
    pub date: NaiveDate,
    pub product_type: String,
    pub description: Option<String>,
    pub contact_info: String,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRequestRequest>,
) -> Result<Json<RequestAnnouncement>, AppError> {
    let owner = state.stores.users.find_by_id(&payload.user_id);
    state
        .policy
        .authorize(owner.as_ref(), None, InteractionKind::PublishRequest)?;
    let Some(owner) = owner else {
        return Err(AppError::UserNotFound(payload.user_id));
    };

    if payload.weight.is_nan() || payload.weight <= 0.0 {
        return Err(AppError::Validation("weight must be > 0".to_string()));
    }

    let request = RequestAnnouncement {
        id: ids::generate(ids::REQUEST),
        user_name: owner.full_name(),
        user_id: owner.id,
        from_country: required("from_country", &payload.from_country)?,
        to_country: required("to_country", &payload.to_country)?,
        weight: payload.weight,
        date: payload.date,
        product_type: required("product_type", &payload.product_type)?,
        description: payload
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        contact_info: required("contact_info", &payload.contact_info)?,
        created_at: Utc::now(),
    };

    let request = state.stores.requests.create(request)?;
    info!(request_id = %request.id, user_id = %request.user_id, "request published");
    Ok(Json(request))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RouteFilter>,
) -> Json<Vec<RequestAnnouncement>> {
    let mut requests = state.stores.requests.scan(&|r: &RequestAnnouncement| {
        filter.matches(&r.from_country, &r.to_country)
            && filter.owner.as_deref().is_none_or(|owner| r.user_id == owner)
    });
    requests.reverse();
    Json(requests)
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RequestAnnouncement>, AppError> {
    let request = state
        .stores
        .requests
        .find_by_id(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;
    Ok(Json(request))
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    let request = state
        .stores
        .requests
        .find_by_id(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    if request.user_id != actor.user_id {
        return Err(AppError::Forbidden(DenyReason::NotOwner));
    }

    let deleted = state.stores.requests.delete(&id);
    info!(request_id = %id, "request deleted");
    Ok(Json(DeleteResponse { deleted }))
}

async fn contact_owner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    let (conversation, created) =
        initiate_contact(&state, &payload.user_id, ContactTarget::Request(id))?;
    Ok(Json(ContactResponse {
        conversation,
        created,
    }))
}
