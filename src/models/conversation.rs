use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Participant snapshot taken when the conversation is opened. Names and
/// roles are not refreshed when the profile changes later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub is_gp: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participants: [Participant; 2],
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub request_id: Option<String>,
    pub travel_id: Option<String>,
}

impl Conversation {
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    /// Order-independent check for the unordered pair `{a, b}`.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        self.has_participant(a) && self.has_participant(b)
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message_time.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub unread_count: usize,
}
