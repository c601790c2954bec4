use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::rest::ContactResponse;
use crate::engine::contact::open_conversation;
use crate::engine::matcher::OpenConversation;
use crate::engine::messaging::MessageWindow;
use crate::error::AppError;
use crate::models::conversation::Conversation;
use crate::models::message::Message;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", post(create_conversation))
        .route("/conversations/:id", get(get_conversation))
        .route(
            "/conversations/:id/messages",
            get(get_messages).post(send_message),
        )
        .route("/conversations/:id/read", post(mark_as_read))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub user_id: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct MarkReadRequest {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OpenConversation>,
) -> Result<Json<ContactResponse>, AppError> {
    let (conversation, created) = open_conversation(&state, payload)?;
    Ok(Json(ContactResponse {
        conversation,
        created,
    }))
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, AppError> {
    let conversation = state
        .stores
        .conversations
        .find_by_id(&id)
        .ok_or(AppError::ConversationNotFound(id))?;
    Ok(Json(conversation))
}

async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(window): Query<MessageWindow>,
) -> Json<Vec<Message>> {
    Json(state.messaging.get_messages(&id, window))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let message = state
        .messaging
        .send_message(&id, &payload.user_id, &payload.content)?;
    Ok(Json(message))
}

async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let marked = state.messaging.mark_as_read(&id, &payload.user_id)?;
    Ok(Json(MarkReadResponse { marked }))
}
