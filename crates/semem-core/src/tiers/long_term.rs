//! Unbounded, read-mostly store of promoted interactions (C5).

use std::collections::HashMap;

use uuid::Uuid;

use crate::interaction::Interaction;

/// Interactions promoted from [`crate::tiers::ShortTermTier`]. Append-only
/// from the core's perspective; purge is an admin operation off the hot path.
#[derive(Debug, Default)]
pub struct LongTermTier {
    items: HashMap<Uuid, Interaction>,
}

impl LongTermTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, interaction: Interaction) {
        self.items.insert(interaction.id, interaction);
    }

    pub fn get(&self, id: Uuid) -> Option<&Interaction> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Interaction> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Interaction> {
        self.items.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.items.values()
    }

    pub fn from_items(items: Vec<Interaction>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id, i)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn insert_then_get_roundtrips() {
        let mut tier = LongTermTier::new();
        let i = Interaction::new("p", "o", vec![0.0; 4], BTreeSet::new(), 0);
        let id = i.id;
        tier.insert(i);
        assert_eq!(tier.get(id).unwrap().prompt, "p");
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut tier = LongTermTier::new();
        let i = Interaction::new("p", "o", vec![0.0; 4], BTreeSet::new(), 0);
        let id = i.id;
        tier.insert(i);
        assert!(tier.remove(id).is_some());
        assert!(tier.get(id).is_none());
    }
}
