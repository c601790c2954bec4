pub mod conversations;
pub mod requests;
pub mod shipments;
pub mod travels;
pub mod users;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::models::conversation::Conversation;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(users::router())
        .merge(travels::router())
        .merge(requests::router())
        .merge(conversations::router())
        .merge(shipments::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Acting user for requests without a body.
#[derive(Deserialize)]
pub struct ActorQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub conversation: Conversation,
    pub created: bool,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Optional route filters for announcement feeds. Countries match
/// case-insensitively.
#[derive(Deserialize, Default)]
pub struct RouteFilter {
    pub from: Option<String>,
    pub to: Option<String>,
    pub owner: Option<String>,
}

impl RouteFilter {
    pub fn matches(&self, from_country: &str, to_country: &str) -> bool {
        let same = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .is_none_or(|wanted| wanted.trim().eq_ignore_ascii_case(actual))
        };
        same(&self.from, from_country) && same(&self.to, to_country)
    }
}

pub(crate) fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: usize,
    travels: usize,
    requests: usize,
    conversations: usize,
    messages: usize,
    shipments: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stores = &state.stores;
    Json(HealthResponse {
        status: "ok",
        users: stores.users.len(),
        travels: stores.travels.len(),
        requests: stores.requests.len(),
        conversations: stores.conversations.len(),
        messages: stores.messages.len(),
        shipments: stores.shipments.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::RouteFilter;

    #[test]
    fn route_filter_is_case_insensitive_and_optional() {
        let any = RouteFilter::default();
        assert!(any.matches("Senegal", "France"));

        let filter = RouteFilter {
            from: Some("senegal".to_string()),
            to: None,
            owner: None,
        };
        assert!(filter.matches("Senegal", "France"));
        assert!(!filter.matches("Mali", "France"));
    }
}
