use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::engine::locks::{pair_key, KeyedLocks};
use crate::error::AppError;
use crate::ids;
use crate::models::conversation::{Conversation, Participant};
use crate::observability::metrics::Metrics;
use crate::store::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenConversation {
    pub user_id: String,
    pub other_user_id: String,
    pub other_user_name: String,
    pub other_user_is_gp: bool,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub travel_id: Option<String>,
}

/// Keeps at most one conversation per unordered pair of users.
pub struct ConversationMatcher {
    stores: Stores,
    locks: KeyedLocks,
    metrics: Metrics,
}

impl ConversationMatcher {
    pub fn new(stores: Stores, metrics: Metrics) -> Self {
        Self {
            stores,
            locks: KeyedLocks::new(),
            metrics,
        }
    }

    /// Returns the existing conversation between the two users, or creates
    /// one. The boolean is `true` when a new conversation was created.
    ///
    /// An existing conversation is returned untouched, including its origin
    /// context, even if `input` names a different request or travel.
    pub fn find_or_create(&self, input: OpenConversation) -> Result<(Conversation, bool), AppError> {
        let user = self
            .stores
            .users
            .find_by_id(&input.user_id)
            .ok_or_else(|| AppError::UserNotFound(input.user_id.clone()))?;

        if input.other_user_id.trim().is_empty() {
            return Err(AppError::Validation("other_user_id is required".to_string()));
        }
        if input.user_id == input.other_user_id {
            return Err(AppError::Validation(
                "a conversation needs two distinct participants".to_string(),
            ));
        }

        let _guard = self
            .locks
            .lock(&pair_key(&input.user_id, &input.other_user_id));

        if let Some(existing) = self.find_between(&input.user_id, &input.other_user_id) {
            self.metrics
                .conversations_total
                .with_label_values(&["existing"])
                .inc();
            return Ok((existing, false));
        }

        let conversation = Conversation {
            id: ids::generate(ids::CONVERSATION),
            participants: [
                Participant {
                    user_id: user.id.clone(),
                    user_name: user.full_name(),
                    is_gp: user.is_gp,
                },
                Participant {
                    user_id: input.other_user_id,
                    user_name: input.other_user_name,
                    is_gp: input.other_user_is_gp,
                },
            ],
            last_message: None,
            last_message_time: None,
            created_at: Utc::now(),
            request_id: input.request_id,
            travel_id: input.travel_id,
        };

        let conversation = self.stores.conversations.create(conversation)?;
        self.metrics
            .conversations_total
            .with_label_values(&["created"])
            .inc();

        info!(
            conversation_id = %conversation.id,
            initiator = %conversation.participants[0].user_id,
            other = %conversation.participants[1].user_id,
            "conversation created"
        );

        Ok((conversation, true))
    }

    pub fn find_between(&self, a: &str, b: &str) -> Option<Conversation> {
        self.stores
            .conversations
            .scan(&|c: &Conversation| c.is_between(a, b))
            .into_iter()
            .next()
    }
}
