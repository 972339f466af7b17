//! Allocation of touch pointer ids.

use std::collections::{BTreeSet, HashMap};

use crate::WidgetId;

/// Number of concurrent touch points handed out by default.
pub const POOL_SIZE: u64 = 10;

/// Something that holds a pointer id while its finger is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerOwner {
    /// The widget's own finger.
    Widget(WidgetId),
    /// A scripted touch point at fixed coordinates, owned by a widget.
    Point { widget: WidgetId, x: i32, y: i32 },
}

impl PointerOwner {
    #[must_use]
    pub fn widget(&self) -> WidgetId {
        match *self {
            Self::Widget(id) | Self::Point { widget: id, .. } => id,
        }
    }
}

/// Snapshot of the pool for debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    pub available: Vec<u64>,
    pub allocated: Vec<(PointerOwner, u64)>,
}

/// Pool of pointer ids `1..=POOL_SIZE`.
///
/// Each owner holds at most one id; allocating again returns the same id.
/// The lowest free id is always handed out first.
#[derive(Debug, Clone)]
pub struct PointerIdPool {
    available: BTreeSet<u64>,
    allocated: HashMap<PointerOwner, u64>,
}

impl Default for PointerIdPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerIdPool {
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(POOL_SIZE)
    }

    #[must_use]
    pub fn with_size(size: u64) -> Self {
        Self {
            available: (1..=size).collect(),
            allocated: HashMap::new(),
        }
    }

    /// Allocate an id for `owner`, or return the one it already holds.
    ///
    /// Returns `None` when the pool is exhausted.
    pub fn allocate(&mut self, owner: PointerOwner) -> Option<u64> {
        if let Some(&id) = self.allocated.get(&owner) {
            return Some(id);
        }
        let id = self.available.pop_first()?;
        self.allocated.insert(owner, id);
        tracing::trace!(?owner, id, "Pointer id allocated");
        Some(id)
    }

    /// The id held by `owner`, without allocating.
    #[must_use]
    pub fn get_allocated_id(&self, owner: &PointerOwner) -> Option<u64> {
        self.allocated.get(owner).copied()
    }

    /// Return the id held by `owner` to the pool. Releasing twice is a no-op.
    pub fn release(&mut self, owner: &PointerOwner) -> bool {
        match self.allocated.remove(owner) {
            Some(id) => {
                self.available.insert(id);
                tracing::trace!(?owner, id, "Pointer id released");
                true
            }
            None => false,
        }
    }

    /// Release every id held on behalf of `widget`.
    pub fn release_widget(&mut self, widget: WidgetId) -> usize {
        let owners: Vec<PointerOwner> = self
            .allocated
            .keys()
            .filter(|owner| owner.widget() == widget)
            .copied()
            .collect();
        for owner in &owners {
            self.release(owner);
        }
        owners.len()
    }

    /// Number of ids currently handed out.
    #[must_use]
    pub fn active(&self) -> usize {
        self.allocated.len()
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let mut allocated: Vec<(PointerOwner, u64)> =
            self.allocated.iter().map(|(o, id)| (*o, *id)).collect();
        allocated.sort_by_key(|&(_, id)| id);
        PoolStatus {
            available: self.available.iter().copied().collect(),
            allocated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owner(n: u64) -> PointerOwner {
        PointerOwner::Widget(WidgetId(n))
    }

    #[test]
    fn lowest_free_first_and_idempotent() {
        let mut pool = PointerIdPool::new();
        assert_eq!(pool.allocate(owner(7)), Some(1));
        assert_eq!(pool.allocate(owner(8)), Some(2));
        assert_eq!(pool.allocate(owner(7)), Some(1));
        assert!(pool.release(&owner(7)));
        assert!(!pool.release(&owner(7)));
        assert_eq!(pool.allocate(owner(9)), Some(1));
        assert_eq!(pool.get_allocated_id(&owner(8)), Some(2));
        assert_eq!(pool.get_allocated_id(&owner(7)), None);
    }

    #[test]
    fn exhaustion() {
        let mut pool = PointerIdPool::new();
        for n in 0..POOL_SIZE {
            assert!(pool.allocate(owner(n)).is_some());
        }
        assert_eq!(pool.allocate(owner(99)), None);
        assert_eq!(pool.status().available, Vec::<u64>::new());
    }

    #[test]
    fn release_widget_drops_points() {
        let mut pool = PointerIdPool::new();
        let w = WidgetId(3);
        pool.allocate(PointerOwner::Widget(w));
        pool.allocate(PointerOwner::Point { widget: w, x: 10, y: 20 });
        pool.allocate(owner(4));
        assert_eq!(pool.release_widget(w), 2);
        assert_eq!(pool.active(), 1);
        assert_eq!(pool.status().available.first(), Some(&1));
    }

    proptest! {
        #[test]
        fn accounting_holds(ops in prop::collection::vec((any::<bool>(), 0u64..16), 1..200)) {
            let mut pool = PointerIdPool::new();
            let mut allocs = 0usize;
            let mut releases = 0usize;
            for (alloc, n) in ops {
                if alloc {
                    let before = pool.get_allocated_id(&owner(n));
                    if pool.allocate(owner(n)).is_some() && before.is_none() {
                        allocs += 1;
                    }
                } else if pool.release(&owner(n)) {
                    releases += 1;
                }
                prop_assert_eq!(allocs - releases, pool.active());
                prop_assert!(pool.active() <= POOL_SIZE as usize);
                let status = pool.status();
                let mut ids: Vec<u64> = status.allocated.iter().map(|&(_, id)| id).collect();
                ids.dedup();
                prop_assert_eq!(ids.len(), status.allocated.len());
                prop_assert!(status.available.iter().all(|id| !ids.contains(id)));
            }
        }
    }
}
