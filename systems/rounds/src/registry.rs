use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use tank_catch_core::RoundId;

use crate::SpawnRound;

/// Result of looking up a round by identity.
#[derive(Clone, Debug)]
pub enum Lookup {
    /// The round is registered.
    Active(Arc<SpawnRound>),
    /// The identity was reserved but its round has not been published yet.
    Opening,
    /// The round existed and has since been removed.
    Concluded,
    /// The identity was never handed out.
    Unknown,
}

#[derive(Debug)]
enum Slot {
    Opening,
    Active(Arc<SpawnRound>),
}

/// Table of live rounds keyed by identity.
///
/// Identities are allocated monotonically and never reused, which lets the
/// registry tell a concluded round apart from one that never existed.
#[derive(Debug)]
pub struct RoundRegistry {
    next: AtomicU64,
    slots: RwLock<HashMap<RoundId, Slot>>,
}

impl Default for RoundRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundRegistry {
    /// Creates an empty registry; the first identity handed out is `1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates a fresh identity and marks it as opening.
    pub fn reserve(&self) -> RoundId {
        let id = RoundId::new(self.next.fetch_add(1, Ordering::SeqCst));
        let _ = self.write().insert(id, Slot::Opening);
        id
    }

    /// Publishes a round under its reserved identity.
    pub fn register(&self, round: Arc<SpawnRound>) {
        let _ = self.write().insert(round.id(), Slot::Active(round));
    }

    /// Drops a reservation whose round was never published.
    pub fn release(&self, id: RoundId) {
        let mut slots = self.write();
        if matches!(slots.get(&id), Some(Slot::Opening)) {
            let _ = slots.remove(&id);
        }
    }

    /// Looks up the round registered under `id`.
    #[must_use]
    pub fn lookup(&self, id: RoundId) -> Lookup {
        match self.read().get(&id) {
            Some(Slot::Active(round)) => Lookup::Active(Arc::clone(round)),
            Some(Slot::Opening) => Lookup::Opening,
            None if id.get() > 0 && id.get() < self.next.load(Ordering::SeqCst) => {
                Lookup::Concluded
            }
            None => Lookup::Unknown,
        }
    }

    /// Removes a published round, returning it if it was registered.
    pub fn unregister(&self, id: RoundId) -> Option<Arc<SpawnRound>> {
        let mut slots = self.write();
        if !matches!(slots.get(&id), Some(Slot::Active(_))) {
            return None;
        }
        match slots.remove(&id) {
            Some(Slot::Active(round)) => Some(round),
            Some(Slot::Opening) | None => None,
        }
    }

    /// Identities of the published rounds, in ascending order.
    #[must_use]
    pub fn active_ids(&self) -> Vec<RoundId> {
        let mut ids: Vec<RoundId> = self
            .read()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of published rounds.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.read()
            .values()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RoundId, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RoundId, Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Lookup, RoundRegistry};
    use crate::SpawnRound;
    use tank_catch_core::{ChannelId, Challenge, ItemKind, MessageHandle, RoundId};
    use tokio::time::Instant;

    fn round(id: RoundId) -> Arc<SpawnRound> {
        let kind = |name: &str| ItemKind::new(name);
        let challenge =
            Challenge::new(kind("A"), vec![kind("A"), kind("B"), kind("C")]).expect("challenge");
        Arc::new(SpawnRound::new(
            id,
            ChannelId::new("general"),
            challenge,
            Instant::now(),
            MessageHandle::new(id.get()),
        ))
    }

    #[test]
    fn lifecycle_distinguishes_concluded_from_unknown() {
        let registry = RoundRegistry::new();
        assert!(matches!(registry.lookup(RoundId::new(1)), Lookup::Unknown));

        let id = registry.reserve();
        assert_eq!(id, RoundId::new(1));
        assert!(matches!(registry.lookup(id), Lookup::Opening));

        registry.register(round(id));
        assert!(matches!(registry.lookup(id), Lookup::Active(_)));
        assert_eq!(registry.active_ids(), vec![id]);

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(matches!(registry.lookup(id), Lookup::Concluded));
        assert!(matches!(registry.lookup(RoundId::new(2)), Lookup::Unknown));
        assert!(matches!(registry.lookup(RoundId::new(0)), Lookup::Unknown));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn released_reservation_reads_as_concluded() {
        let registry = RoundRegistry::new();
        let id = registry.reserve();
        registry.release(id);
        assert!(matches!(registry.lookup(id), Lookup::Concluded));
        assert!(registry.unregister(id).is_none());
    }

    #[test]
    fn identities_are_never_reused() {
        let registry = RoundRegistry::new();
        let first = registry.reserve();
        registry.release(first);
        let second = registry.reserve();
        assert!(second > first);
    }
}
