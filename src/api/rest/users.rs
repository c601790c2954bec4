use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::api::rest::{required, DeleteResponse};
use crate::error::AppError;
use crate::ids;
use crate::models::conversation::ConversationSummary;
use crate::models::shipment::ShipmentView;
use crate::models::user::UserProfile;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/subscription", post(activate_subscription))
        .route("/users/:id/conversations", get(list_conversations))
        .route("/users/:id/shipments", get(list_user_shipments))
        .route("/gps/:id/shipments", get(list_gp_shipments))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub contact: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub contact: Option<String>,
}

fn ensure_contact_free(
    state: &AppState,
    contact: &str,
    except_id: Option<&str>,
) -> Result<(), AppError> {
    let taken = state
        .stores
        .users
        .scan(&|u: &UserProfile| {
            u.contact.eq_ignore_ascii_case(contact) && Some(u.id.as_str()) != except_id
        })
        .into_iter()
        .next()
        .is_some();

    if taken {
        return Err(AppError::Conflict(format!("contact {contact} is already registered")));
    }
    Ok(())
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let contact = required("contact", &payload.contact)?;
    let user = UserProfile {
        id: ids::generate(ids::USER),
        first_name: required("first_name", &payload.first_name)?,
        last_name: required("last_name", &payload.last_name)?,
        country: required("country", &payload.country)?,
        contact,
        is_verified: false,
        is_gp: false,
        gp_subscription: None,
        created_at: Utc::now(),
    };

    let user = {
        let _guard = state.profile_locks.lock(&user.contact.to_ascii_lowercase());
        ensure_contact_free(&state, &user.contact, None)?;
        state.stores.users.create(user)?
    };

    info!(user_id = %user.id, "profile created");
    Ok(Json(user))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .stores
        .users
        .find_by_id(&id)
        .ok_or(AppError::UserNotFound(id))?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    if state.stores.users.find_by_id(&id).is_none() {
        return Err(AppError::UserNotFound(id));
    }

    let first_name = payload
        .first_name
        .as_deref()
        .map(|v| required("first_name", v))
        .transpose()?;
    let last_name = payload
        .last_name
        .as_deref()
        .map(|v| required("last_name", v))
        .transpose()?;
    let country = payload
        .country
        .as_deref()
        .map(|v| required("country", v))
        .transpose()?;
    let contact = payload
        .contact
        .as_deref()
        .map(|v| required("contact", v))
        .transpose()?;

    let _guard = contact
        .as_ref()
        .map(|contact| state.profile_locks.lock(&contact.to_ascii_lowercase()));

    if let Some(contact) = &contact {
        ensure_contact_free(&state, contact, Some(&id))?;
    }

    // Only the supplied fields are written, inside the store's per-entry update,
    // so concurrent patches to different fields both land.
    let user = state.stores.users.update(&id, &mut |user: &mut UserProfile| {
        if let Some(first_name) = &first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &last_name {
            user.last_name = last_name.clone();
        }
        if let Some(country) = &country {
            user.country = country.clone();
        }
        if let Some(contact) = &contact {
            user.contact = contact.clone();
        }
    })?;

    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.stores.users.delete(&id);
    if deleted {
        info!(user_id = %id, "profile deleted");
    }
    Json(DeleteResponse { deleted })
}

/// Simulated payment: activation always succeeds and turns the user into a GP.
async fn activate_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let subscription = state.subscription.starting_at(Utc::now());

    let user = state
        .stores
        .users
        .update(&id, &mut |user: &mut UserProfile| {
            user.is_gp = true;
            user.gp_subscription = Some(subscription.clone());
        })
        .map_err(|_| AppError::UserNotFound(id.clone()))?;

    info!(
        user_id = %user.id,
        until = %subscription.end_date,
        "gp subscription activated"
    );
    Ok(Json(user))
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<ConversationSummary>> {
    Json(state.messaging.conversations_for_user(&id))
}

async fn list_user_shipments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<ShipmentView>> {
    Json(
        state
            .shipments
            .for_user(&id)
            .into_iter()
            .map(ShipmentView::from)
            .collect(),
    )
}

async fn list_gp_shipments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<ShipmentView>> {
    Json(
        state
            .shipments
            .for_gp(&id)
            .into_iter()
            .map(ShipmentView::from)
            .collect(),
    )
}
