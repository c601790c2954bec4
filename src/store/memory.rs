use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Entity, Repository, StoreError};

struct Slot<T> {
    seq: u64,
    entity: T,
}

/// In-process repository backed by a `DashMap`. Every slot remembers the
/// sequence number it was inserted with so scans can restore insertion order.
pub struct MemoryRepository<T> {
    entries: DashMap<String, Slot<T>>,
    next_seq: AtomicU64,
}

impl<T> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Repository<T> for MemoryRepository<T> {
    fn create(&self, entity: T) -> Result<T, StoreError> {
        match self.entries.entry(entity.id().to_string()) {
            Entry::Occupied(occupied) => Err(StoreError::DuplicateKey {
                kind: T::KIND,
                id: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                vacant.insert(Slot {
                    seq,
                    entity: entity.clone(),
                });
                Ok(entity)
            }
        }
    }

    fn find_by_id(&self, id: &str) -> Option<T> {
        self.entries.get(id).map(|slot| slot.entity.clone())
    }

    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut T)) -> Result<T, StoreError> {
        let mut slot = self.entries.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })?;

        apply(&mut slot.entity);
        Ok(slot.entity.clone())
    }

    fn delete(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    fn scan(&self, filter: &dyn Fn(&T) -> bool) -> Vec<T> {
        let mut matched: Vec<(u64, T)> = self
            .entries
            .iter()
            .filter(|entry| filter(&entry.value().entity))
            .map(|entry| (entry.value().seq, entry.value().entity.clone()))
            .collect();

        matched.sort_by_key(|(seq, _)| *seq);
        matched.into_iter().map(|(_, entity)| entity).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
