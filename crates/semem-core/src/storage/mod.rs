//! Pluggable durability contract (C8).
//!
//! The core depends only on [`StorageBackend`]; it does not know or care
//! which concrete implementation is in use. Three conforming backends ship
//! with this crate: [`NullBackend`] (tests, zero-dependency default),
//! [`JsonFileBackend`] (single-file snapshot), and [`SqliteBackend`]
//! (WAL-mode SQLite).

mod json_file;
mod null;
mod sqlite;

pub use json_file::JsonFileBackend;
pub use null::NullBackend;
pub use sqlite::SqliteBackend;

use std::path::PathBuf;

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::interaction::Interaction;
use crate::tiers::TierKind;

/// The platform-specific data directory `open_default()` constructors use
/// when the caller doesn't supply an explicit path, restricted to
/// owner-only access on Unix. `None` if the platform has no notion of a
/// user data directory.
pub(crate) fn default_data_dir() -> Option<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "semem", "core")?;
    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir).ok()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        let _ = std::fs::set_permissions(&data_dir, perms);
    }
    Some(data_dir)
}

/// The serializable union of both tiers. A conforming backend must
/// round-trip this without semantic loss. The concept graph is not part of
/// this state: per §4.7, `Manager::init` reconstructs it from the concepts of
/// the loaded interactions, so every backend round-trips it identically
/// without needing its own graph storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub short_term: Vec<Interaction>,
    pub long_term: Vec<Interaction>,
}

/// A pluggable durability provider. Single-process, single-manager
/// consistency model: concurrent mutation across processes is undefined
/// unless a specific backend documents otherwise.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns all interactions from both tiers. Called once during
    /// `Manager::init`, which reconstructs the concept graph from them.
    async fn load(&self) -> Result<PersistedState>;

    /// Durably records a new interaction in the named tier. Atomic at
    /// interaction granularity.
    async fn append(&self, interaction: &Interaction, tier: TierKind) -> Result<()>;

    /// Moves an interaction between tiers. Atomic; on failure the caller
    /// must roll back the in-memory tier transfer.
    async fn promote(&self, id: Uuid, from: TierKind, to: TierKind) -> Result<()>;

    /// Updates access bookkeeping for an interaction. May be lossy under
    /// crash (best-effort) but must eventually converge after a clean
    /// `dispose`.
    async fn update_access(&self, id: Uuid, access_count: u32, last_access_ms: i64)
    -> Result<()>;

    /// Removes an interaction from durable storage entirely.
    async fn purge(&self, id: Uuid) -> Result<()>;

    /// Cheap reachability check, invoked during `Manager::init`.
    async fn verify(&self) -> Result<bool>;
}
