//! Bounded, insertion-ordered recent-interaction store (C4).

use uuid::Uuid;

use crate::interaction::Interaction;

/// Outcome of inserting into a tier at capacity. The promoted/evicted
/// variants carry the item's former index so a caller whose durable
/// notification (`backend.promote`/`backend.purge`) fails can reinsert it at
/// the same spot via [`ShortTermTier::insert_at`], rolling back the overflow.
#[derive(Debug)]
pub enum Overflow {
    /// The tier had room; nothing left it.
    None,
    /// An item satisfying the promotion predicate was moved out. The caller
    /// is responsible for inserting it into [`crate::tiers::LongTermTier`]
    /// and notifying the storage backend.
    Promoted(Interaction, usize),
    /// No item qualified for promotion; the oldest item was dropped. The
    /// caller is responsible for notifying the storage backend to purge it.
    Evicted(Interaction, usize),
}

/// Ordered sequence of recent interactions, capacity `N_short`.
#[derive(Debug, Default)]
pub struct ShortTermTier {
    items: Vec<Interaction>,
    capacity: usize,
}

impl ShortTermTier {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.items.iter()
    }

    pub fn find(&self, id: Uuid) -> Option<&Interaction> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut Interaction> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    /// Rebuilds a tier from previously persisted items, preserving their
    /// relative order (oldest first), without re-running overflow policy.
    pub fn from_items(capacity: usize, items: Vec<Interaction>) -> Self {
        Self { items, capacity }
    }

    /// Appends `interaction`. If the tier is now over capacity, runs the
    /// overflow policy: the first item (scanning oldest to newest) that
    /// satisfies `predicate` is promoted out; if none do, the oldest item
    /// is evicted.
    pub fn push_with_overflow(
        &mut self,
        interaction: Interaction,
        predicate: impl Fn(&Interaction) -> bool,
    ) -> Overflow {
        self.items.push(interaction);
        if self.items.len() <= self.capacity {
            return Overflow::None;
        }
        if let Some(pos) = self.items.iter().position(&predicate) {
            Overflow::Promoted(self.items.remove(pos), pos)
        } else {
            Overflow::Evicted(self.items.remove(0), 0)
        }
    }

    /// Reinserts `interaction` at `pos`, clamped to the tier's current
    /// length. Used to roll back an overflow outcome whose durable
    /// notification to the storage backend failed.
    pub fn insert_at(&mut self, pos: usize, interaction: Interaction) {
        let pos = pos.min(self.items.len());
        self.items.insert(pos, interaction);
    }

    /// Recomputes `decay_factor` for every item as of `now_ms`, without
    /// touching access bookkeeping. Run opportunistically before retrieval.
    pub fn refresh_decay(&mut self, now_ms: i64, decay_lambda_per_second: f32) {
        for item in self.items.iter_mut() {
            item.decay_factor = item.decay_factor_at(now_ms, decay_lambda_per_second);
        }
    }

    /// The last `exclude_last_n` entries by insertion order, to be excluded
    /// from retrieval candidacy. Returns an empty set if `exclude_last_n` is
    /// `0` or exceeds the tier's length.
    pub fn excluded_ids(&self, exclude_last_n: usize) -> Vec<Uuid> {
        if exclude_last_n == 0 {
            return Vec::new();
        }
        let start = self.items.len().saturating_sub(exclude_last_n);
        self.items[start..].iter().map(|i| i.id).collect()
    }

    /// The most recent `n` items, newest last — used by the context
    /// assembler's history window.
    pub fn recent(&self, n: usize) -> Vec<&Interaction> {
        let start = self.items.len().saturating_sub(n);
        self.items[start..].iter().collect()
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Interaction> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }
}
