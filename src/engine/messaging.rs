use std::cmp::Reverse;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::engine::locks::KeyedLocks;
use crate::error::AppError;
use crate::ids;
use crate::models::conversation::{Conversation, ConversationSummary};
use crate::models::message::Message;
use crate::observability::metrics::Metrics;
use crate::store::Stores;

/// Optional projection over a conversation's ordered log.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MessageWindow {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Append-only chat log per conversation.
///
/// Writes to one conversation are serialized, so the conversation's
/// `last_message` preview always matches the last appended message and
/// timestamps never go backwards within a conversation.
pub struct MessagingService {
    stores: Stores,
    locks: KeyedLocks,
    metrics: Metrics,
}

impl MessagingService {
    pub fn new(stores: Stores, metrics: Metrics) -> Self {
        Self {
            stores,
            locks: KeyedLocks::new(),
            metrics,
        }
    }

    pub fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("message content is required".to_string()));
        }

        // Unknown ids fail before a lock entry is created; re-read under the lock.
        self.conversation(conversation_id)?;
        let _guard = self.locks.lock(conversation_id);
        let conversation = self.conversation(conversation_id)?;

        let participant =
            conversation
                .participant(sender_id)
                .ok_or_else(|| AppError::NotParticipant {
                    conversation_id: conversation_id.to_string(),
                    user_id: sender_id.to_string(),
                })?;

        let sender_name = self
            .stores
            .users
            .find_by_id(sender_id)
            .map(|user| user.full_name())
            .unwrap_or_else(|| participant.user_name.clone());

        // Clamp to the previous message so the log stays non-decreasing.
        let now = Utc::now();
        let timestamp = match conversation.last_message_time {
            Some(previous) if previous > now => previous,
            _ => now,
        };

        let message = self.stores.messages.create(Message {
            id: ids::generate(ids::MESSAGE),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name,
            content: content.to_string(),
            timestamp,
            read: false,
        })?;

        self.stores
            .conversations
            .update(conversation_id, &mut |c: &mut Conversation| {
                c.last_message = Some(message.content.clone());
                c.last_message_time = Some(message.timestamp);
            })?;

        self.metrics.messages_sent_total.inc();
        debug!(
            conversation_id,
            message_id = %message.id,
            sender_id,
            "message appended"
        );

        Ok(message)
    }

    /// The conversation's log in insertion order. Unknown conversations
    /// yield an empty log.
    pub fn get_messages(&self, conversation_id: &str, window: MessageWindow) -> Vec<Message> {
        self.stores
            .messages
            .scan(&|m: &Message| m.conversation_id == conversation_id)
            .into_iter()
            .skip(window.offset.unwrap_or(0))
            .take(window.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Marks every message in the conversation that `reader_id` did not send
    /// as read. Returns how many messages changed state.
    pub fn mark_as_read(&self, conversation_id: &str, reader_id: &str) -> Result<usize, AppError> {
        if self.conversation(conversation_id).is_err() {
            return Ok(0);
        }
        let _guard = self.locks.lock(conversation_id);

        let unread = self.stores.messages.scan(&|m: &Message| {
            m.conversation_id == conversation_id && m.sender_id != reader_id && !m.read
        });

        for message in &unread {
            self.stores
                .messages
                .update(&message.id, &mut |m: &mut Message| m.read = true)?;
        }

        if !unread.is_empty() {
            info!(
                conversation_id,
                reader_id,
                marked = unread.len(),
                "messages marked as read"
            );
        }

        Ok(unread.len())
    }

    fn conversation(&self, conversation_id: &str) -> Result<Conversation, AppError> {
        self.stores
            .conversations
            .find_by_id(conversation_id)
            .ok_or_else(|| AppError::ConversationNotFound(conversation_id.to_string()))
    }

    pub fn unread_count(&self, conversation_id: &str, user_id: &str) -> usize {
        self.stores
            .messages
            .scan(&|m: &Message| {
                m.conversation_id == conversation_id && m.sender_id != user_id && !m.read
            })
            .len()
    }

    /// Conversations the user takes part in, most recent activity first.
    pub fn conversations_for_user(&self, user_id: &str) -> Vec<ConversationSummary> {
        let mut conversations = self
            .stores
            .conversations
            .scan(&|c: &Conversation| c.has_participant(user_id));

        // Newest first among equal activity times.
        conversations.reverse();
        conversations.sort_by_key(|c| Reverse(c.last_activity()));

        conversations
            .into_iter()
            .map(|conversation| ConversationSummary {
                unread_count: self.unread_count(&conversation.id, user_id),
                conversation,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Utc;

    use super::{MessageWindow, MessagingService};
    use crate::error::AppError;
    use crate::models::conversation::{Conversation, Participant};
    use crate::models::user::UserProfile;
    use crate::observability::metrics::Metrics;
    use crate::store::Stores;

    fn user(id: &str, first: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: "Fall".to_string(),
            country: "Senegal".to_string(),
            contact: format!("{id}@example.com"),
            is_verified: false,
            is_gp: false,
            gp_subscription: None,
            created_at: Utc::now(),
        }
    }

    fn conversation(id: &str, a: &str, b: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            participants: [
                Participant {
                    user_id: a.to_string(),
                    user_name: format!("{a} snapshot"),
                    is_gp: false,
                },
                Participant {
                    user_id: b.to_string(),
                    user_name: format!("{b} snapshot"),
                    is_gp: true,
                },
            ],
            last_message: None,
            last_message_time: None,
            created_at: Utc::now(),
            request_id: None,
            travel_id: None,
        }
    }

    fn setup() -> (Stores, MessagingService) {
        let stores = Stores::in_memory();
        stores.users.create(user("user_a", "Awa")).unwrap();
        stores.users.create(user("user_b", "Ibrahima")).unwrap();
        stores
            .conversations
            .create(conversation("conv_1", "user_a", "user_b"))
            .unwrap();
        let service = MessagingService::new(stores.clone(), Metrics::new());
        (stores, service)
    }

    #[test]
    fn send_updates_conversation_preview() {
        let (stores, service) = setup();

        let message = service.send_message("conv_1", "user_a", "Bonjour").unwrap();

        assert!(!message.read);
        assert_eq!(message.sender_name, "Awa Fall");
        let conversation = stores.conversations.find_by_id("conv_1").unwrap();
        assert_eq!(conversation.last_message.as_deref(), Some("Bonjour"));
        assert_eq!(conversation.last_message_time, Some(message.timestamp));
    }

    #[test]
    fn sender_name_falls_back_to_participant_snapshot() {
        let (stores, service) = setup();
        stores
            .conversations
            .create(conversation("conv_2", "user_a", "user_gone"))
            .unwrap();

        let message = service.send_message("conv_2", "user_gone", "hello").unwrap();

        assert_eq!(message.sender_name, "user_gone snapshot");
    }

    #[test]
    fn non_participant_cannot_send() {
        let (stores, service) = setup();
        stores.users.create(user("user_c", "Cheikh")).unwrap();

        let err = service.send_message("conv_1", "user_c", "hi").unwrap_err();

        assert!(matches!(err, AppError::NotParticipant { .. }));
        assert!(service.get_messages("conv_1", MessageWindow::default()).is_empty());
    }

    #[test]
    fn unknown_conversation_is_reported() {
        let (_stores, service) = setup();
        let err = service.send_message("conv_x", "user_a", "hi").unwrap_err();
        assert!(matches!(err, AppError::ConversationNotFound(_)));
    }

    #[test]
    fn unknown_conversations_leave_no_lock_entries() {
        let (_stores, service) = setup();

        for i in 0..10_000 {
            let err = service
                .send_message(&format!("conv_missing_{i}"), "user_a", "hi")
                .unwrap_err();
            assert!(matches!(err, AppError::ConversationNotFound(_)));
            assert_eq!(service.mark_as_read(&format!("conv_missing_{i}"), "user_a").unwrap(), 0);
        }
        service.send_message("conv_1", "user_a", "hi").unwrap();
        service.mark_as_read("conv_1", "user_b").unwrap();

        assert!(service.locks.is_empty());
    }

    #[test]
    fn blank_content_is_rejected() {
        let (_stores, service) = setup();
        let err = service.send_message("conv_1", "user_a", "   ").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn log_is_in_insertion_order_with_non_decreasing_timestamps() {
        let (_stores, service) = setup();
        let sent: Vec<String> = (0..20)
            .map(|i| {
                let sender = if i % 2 == 0 { "user_a" } else { "user_b" };
                service
                    .send_message("conv_1", sender, &format!("message {i}"))
                    .unwrap()
                    .id
            })
            .collect();

        let log = service.get_messages("conv_1", MessageWindow::default());
        let ids: Vec<String> = log.iter().map(|m| m.id.clone()).collect();

        assert_eq!(ids, sent);
        assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn window_projects_the_log() {
        let (_stores, service) = setup();
        for i in 0..5 {
            service
                .send_message("conv_1", "user_a", &format!("m{i}"))
                .unwrap();
        }

        let page = service.get_messages(
            "conv_1",
            MessageWindow {
                offset: Some(1),
                limit: Some(2),
            },
        );

        let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[test]
    fn mark_as_read_only_touches_the_other_participants_messages() {
        let (_stores, service) = setup();
        service.send_message("conv_1", "user_a", "from a").unwrap();
        service.send_message("conv_1", "user_b", "from b 1").unwrap();
        service.send_message("conv_1", "user_b", "from b 2").unwrap();

        assert_eq!(service.mark_as_read("conv_1", "user_a").unwrap(), 2);

        for message in service.get_messages("conv_1", MessageWindow::default()) {
            if message.sender_id == "user_a" {
                assert!(!message.read);
            } else {
                assert!(message.read);
            }
        }

        assert_eq!(service.mark_as_read("conv_1", "user_a").unwrap(), 0);
        assert_eq!(service.unread_count("conv_1", "user_b"), 1);
    }

    #[test]
    fn inbox_is_sorted_by_last_activity() {
        let (stores, service) = setup();
        stores.users.create(user("user_c", "Coumba")).unwrap();
        stores
            .conversations
            .create(conversation("conv_2", "user_a", "user_c"))
            .unwrap();

        service.send_message("conv_2", "user_c", "first").unwrap();
        service.send_message("conv_1", "user_b", "latest").unwrap();

        let inbox = service.conversations_for_user("user_a");
        let ids: Vec<&str> = inbox.iter().map(|s| s.conversation.id.as_str()).collect();

        assert_eq!(ids, vec!["conv_1", "conv_2"]);
        assert!(inbox.iter().all(|s| s.unread_count == 1));
        assert!(service.conversations_for_user("user_z").is_empty());
    }

    #[test]
    fn concurrent_sends_keep_preview_consistent() {
        let (stores, service) = setup();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                thread::spawn(move || {
                    let sender = if i % 2 == 0 { "user_a" } else { "user_b" };
                    for j in 0..10 {
                        service
                            .send_message("conv_1", sender, &format!("{i}-{j}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let log = service.get_messages("conv_1", MessageWindow::default());
        let conversation = stores.conversations.find_by_id("conv_1").unwrap();
        let last = log.last().unwrap();

        assert_eq!(log.len(), 80);
        assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(conversation.last_message.as_deref(), Some(last.content.as_str()));
        assert_eq!(conversation.last_message_time, Some(last.timestamp));
    }
}
