//! The two-tier interaction store (C4, C5).

mod long_term;
mod short_term;

pub use long_term::LongTermTier;
pub use short_term::{Overflow, ShortTermTier};

/// Which tier an interaction currently resides in. Carried across the
/// [`crate::storage::StorageBackend`] boundary so backends can namespace
/// durable records per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TierKind {
    ShortTerm,
    LongTerm,
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierKind::ShortTerm => write!(f, "short_term"),
            TierKind::LongTerm => write!(f, "long_term"),
        }
    }
}
