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
use crate::models::travel::TravelAnnouncement;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/travels", post(create_travel).get(list_travels))
        .route(
            "/travels/:id",
            get(get_travel).patch(update_travel).delete(delete_travel),
        )
        .route("/travels/:id/contact", post(contact_gp))
}

#[derive(Deserialize)]
pub struct CreateTravelRequest {
    pub gp_id: String,
    pub from_country: String,
    pub to_country: String,
    pub departure_date: NaiveDate,
    pub max_weight: f64,
    pub price_per_kg: f64,
    pub available_space: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateTravelRequest {
    pub gp_id: String,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub max_weight: Option<f64>,
    pub price_per_kg: Option<f64>,
    pub available_space: Option<f64>,
}

fn validate_capacity(
    max_weight: f64,
    price_per_kg: f64,
    available_space: f64,
) -> Result<(), AppError> {
    if max_weight.is_nan() || max_weight <= 0.0 {
        return Err(AppError::Validation("max_weight must be > 0".to_string()));
    }
    if price_per_kg.is_nan() || price_per_kg < 0.0 {
        return Err(AppError::Validation("price_per_kg must be >= 0".to_string()));
    }
    if !(0.0..=max_weight).contains(&available_space) {
        return Err(AppError::Validation(
            "available_space must be between 0 and max_weight".to_string(),
        ));
    }
    Ok(())
}

async fn create_travel(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTravelRequest>,
) -> Result<Json<TravelAnnouncement>, AppError> {
    let gp = state.stores.users.find_by_id(&payload.gp_id);
    state
        .policy
        .authorize(gp.as_ref(), None, InteractionKind::PublishTravel)?;

    let available_space = payload.available_space.unwrap_or(payload.max_weight);
    validate_capacity(payload.max_weight, payload.price_per_kg, available_space)?;

    let now = Utc::now();
    let travel = TravelAnnouncement {
        id: ids::generate(ids::TRAVEL),
        gp_id: payload.gp_id,
        from_country: required("from_country", &payload.from_country)?,
        to_country: required("to_country", &payload.to_country)?,
        departure_date: payload.departure_date,
        max_weight: payload.max_weight,
        price_per_kg: payload.price_per_kg,
        available_space,
        created_at: now,
        updated_at: now,
    };

    let travel = state.stores.travels.create(travel)?;
    info!(travel_id = %travel.id, gp_id = %travel.gp_id, "travel published");
    Ok(Json(travel))
}

async fn list_travels(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RouteFilter>,
) -> Json<Vec<TravelAnnouncement>> {
    let mut travels = state.stores.travels.scan(&|t: &TravelAnnouncement| {
        filter.matches(&t.from_country, &t.to_country)
            && filter.owner.as_deref().is_none_or(|owner| t.gp_id == owner)
    });
    travels.reverse();
    Json(travels)
}

async fn get_travel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TravelAnnouncement>, AppError> {
    let travel = state
        .stores
        .travels
        .find_by_id(&id)
        .ok_or_else(|| AppError::NotFound(format!("travel {id} not found")))?;
    Ok(Json(travel))
}

fn owned_travel(
    state: &AppState,
    id: &str,
    actor_id: &str,
) -> Result<TravelAnnouncement, AppError> {
    let travel = state
        .stores
        .travels
        .find_by_id(id)
        .ok_or_else(|| AppError::NotFound(format!("travel {id} not found")))?;

    if travel.gp_id != actor_id {
        return Err(AppError::Forbidden(DenyReason::NotOwner));
    }
    Ok(travel)
}

impl UpdateTravelRequest {
    /// Merges the supplied fields into `travel` if the caller owns it and the
    /// result still has a consistent capacity.
    fn merge_into(&self, travel: &TravelAnnouncement) -> Result<TravelAnnouncement, AppError> {
        if travel.gp_id != self.gp_id {
            return Err(AppError::Forbidden(DenyReason::NotOwner));
        }

        let mut next = travel.clone();
        if let Some(from_country) = &self.from_country {
            next.from_country = required("from_country", from_country)?;
        }
        if let Some(to_country) = &self.to_country {
            next.to_country = required("to_country", to_country)?;
        }
        if let Some(departure_date) = self.departure_date {
            next.departure_date = departure_date;
        }
        if let Some(max_weight) = self.max_weight {
            next.max_weight = max_weight;
        }
        if let Some(price_per_kg) = self.price_per_kg {
            next.price_per_kg = price_per_kg;
        }
        if let Some(available_space) = self.available_space {
            next.available_space = available_space;
        }
        validate_capacity(next.max_weight, next.price_per_kg, next.available_space)?;
        next.updated_at = Utc::now();
        Ok(next)
    }
}

/// Applies `patch` inside the store's per-entry update, so the ownership
/// check and the merge see the same version of the travel.
fn patch_travel(
    state: &AppState,
    id: &str,
    patch: &UpdateTravelRequest,
) -> Result<TravelAnnouncement, AppError> {
    let mut outcome = Ok(());
    let travel = state
        .stores
        .travels
        .update(id, &mut |travel: &mut TravelAnnouncement| {
            match patch.merge_into(travel) {
                Ok(next) => *travel = next,
                Err(err) => outcome = Err(err),
            }
        })?;
    outcome?;
    Ok(travel)
}

async fn update_travel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTravelRequest>,
) -> Result<Json<TravelAnnouncement>, AppError> {
    let travel = patch_travel(&state, &id, &payload)?;

    info!(travel_id = %travel.id, "travel updated");
    Ok(Json(travel))
}

async fn delete_travel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    owned_travel(&state, &id, &actor.user_id)?;
    let deleted = state.stores.travels.delete(&id);

    info!(travel_id = %id, "travel deleted");
    Ok(Json(DeleteResponse { deleted }))
}

async fn contact_gp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    let (conversation, created) =
        initiate_contact(&state, &payload.user_id, ContactTarget::Travel(id))?;
    Ok(Json(ContactResponse {
        conversation,
        created,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{NaiveDate, Utc};

    use super::{patch_travel, UpdateTravelRequest};
    use crate::config::Config;
    use crate::engine::policy::DenyReason;
    use crate::error::AppError;
    use crate::models::travel::TravelAnnouncement;
    use crate::state::AppState;

    fn travel(id: &str, gp_id: &str) -> TravelAnnouncement {
        let now = Utc::now();
        TravelAnnouncement {
            id: id.to_string(),
            gp_id: gp_id.to_string(),
            from_country: "Senegal".to_string(),
            to_country: "France".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            max_weight: 23.0,
            price_per_kg: 4000.0,
            available_space: 23.0,
            created_at: now,
            updated_at: now,
        }
    }

    fn patch(gp_id: &str) -> UpdateTravelRequest {
        UpdateTravelRequest {
            gp_id: gp_id.to_string(),
            from_country: None,
            to_country: None,
            departure_date: None,
            max_weight: None,
            price_per_kg: None,
            available_space: None,
        }
    }

    #[test]
    fn concurrent_patches_to_different_fields_both_land() {
        let state = Arc::new(AppState::new(&Config::default()));
        let ids: Vec<String> = (0..50).map(|i| format!("travel_{i}")).collect();
        for id in &ids {
            state.stores.travels.create(travel(id, "user_gp")).unwrap();
        }

        let price = {
            let state = state.clone();
            let ids = ids.clone();
            thread::spawn(move || {
                for id in &ids {
                    let mut update = patch("user_gp");
                    update.price_per_kg = Some(3000.0);
                    patch_travel(&state, id, &update).unwrap();
                }
            })
        };
        let space = {
            let state = state.clone();
            let ids = ids.clone();
            thread::spawn(move || {
                for id in &ids {
                    let mut update = patch("user_gp");
                    update.available_space = Some(10.0);
                    patch_travel(&state, id, &update).unwrap();
                }
            })
        };
        price.join().unwrap();
        space.join().unwrap();

        for id in &ids {
            let travel = state.stores.travels.find_by_id(id).unwrap();
            assert_eq!(travel.price_per_kg, 3000.0);
            assert_eq!(travel.available_space, 10.0);
        }
    }

    #[test]
    fn rejected_patch_leaves_the_travel_untouched() {
        let state = AppState::new(&Config::default());
        state.stores.travels.create(travel("travel_1", "user_gp")).unwrap();

        let mut by_stranger = patch("user_other");
        by_stranger.price_per_kg = Some(1.0);
        let err = patch_travel(&state, "travel_1", &by_stranger).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(DenyReason::NotOwner)));

        let mut too_much = patch("user_gp");
        too_much.available_space = Some(40.0);
        let err = patch_travel(&state, "travel_1", &too_much).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stored = state.stores.travels.find_by_id("travel_1").unwrap();
        assert_eq!(stored.price_per_kg, 4000.0);
        assert_eq!(stored.available_space, 23.0);
    }

    #[test]
    fn patching_a_deleted_travel_is_not_found() {
        let state = AppState::new(&Config::default());

        let err = patch_travel(&state, "travel_gone", &patch("user_gp")).unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
