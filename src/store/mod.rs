//! Keyed entity storage.
//!
//! Each entity type is stored behind a [`Repository`] so the services only
//! depend on the contract: O(1) lookup by id, closure-based partial updates,
//! idempotent deletes, and scans that return entities in insertion order.

pub mod memory;

use std::sync::Arc;

use thiserror::Error;

use crate::models::conversation::Conversation;
use crate::models::message::Message;
use crate::models::request::RequestAnnouncement;
use crate::models::shipment::Shipment;
use crate::models::travel::TravelAnnouncement;
use crate::models::user::UserProfile;

pub use memory::MemoryRepository;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} {id} already exists")]
    DuplicateKey { kind: &'static str, id: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
}

pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> &str;
}

pub trait Repository<T: Entity>: Send + Sync {
    fn create(&self, entity: T) -> Result<T, StoreError>;

    fn find_by_id(&self, id: &str) -> Option<T>;

    /// Applies `apply` to the stored entity while holding its write lock and
    /// returns the updated copy.
    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut T)) -> Result<T, StoreError>;

    fn delete(&self, id: &str) -> bool;

    /// Entities matching `filter`, in insertion order.
    fn scan(&self, filter: &dyn Fn(&T) -> bool) -> Vec<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Entity for UserProfile {
    const KIND: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for TravelAnnouncement {
    const KIND: &'static str = "travel";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for RequestAnnouncement {
    const KIND: &'static str = "request";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Conversation {
    const KIND: &'static str = "conversation";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Message {
    const KIND: &'static str = "message";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Shipment {
    const KIND: &'static str = "shipment";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One repository per entity type.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn Repository<UserProfile>>,
    pub travels: Arc<dyn Repository<TravelAnnouncement>>,
    pub requests: Arc<dyn Repository<RequestAnnouncement>>,
    pub conversations: Arc<dyn Repository<Conversation>>,
    pub messages: Arc<dyn Repository<Message>>,
    pub shipments: Arc<dyn Repository<Shipment>>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryRepository::new()),
            travels: Arc::new(MemoryRepository::new()),
            requests: Arc::new(MemoryRepository::new()),
            conversations: Arc::new(MemoryRepository::new()),
            messages: Arc::new(MemoryRepository::new()),
            shipments: Arc::new(MemoryRepository::new()),
        }
    }
}
