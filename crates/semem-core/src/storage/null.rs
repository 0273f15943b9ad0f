//! In-memory no-op backend. Zero-dependency default; used by the crate's
//! own unit tests and by callers that want pure in-process memory with no
//! durability at all.

use async_trait::async_trait;
use uuid::Uuid;

use super::{PersistedState, StorageBackend};
use crate::error::Result;
use crate::interaction::Interaction;
use crate::tiers::TierKind;

#[derive(Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageBackend for NullBackend {
    async fn load(&self) -> Result<PersistedState> {
        Ok(PersistedState::default())
    }

    async fn append(&self, _interaction: &Interaction, _tier: TierKind) -> Result<()> {
        Ok(())
    }

    async fn promote(&self, _id: Uuid, _from: TierKind, _to: TierKind) -> Result<()> {
        Ok(())
    }

    async fn update_access(
        &self,
        _id: Uuid,
        _access_count: u32,
        _last_access_ms: i64,
    ) -> Result<()> {
        Ok(())
    }

    async fn purge(&self, _id: Uuid) -> Result<()> {
        Ok(())
    }

    async fn verify(&self) -> Result<bool> {
        Ok(true)
    }
}
