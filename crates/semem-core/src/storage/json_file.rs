//! Single-file snapshot backend: the full [`PersistedState`] is rewritten on
//! every mutating call. Simple, O(N) per write — the spec's "simple but
//! O(N) per write" backend.
//!
//! Crash-safety: the new content is written to a `.tmp` sibling file,
//! `fsync`'d, then renamed over the original. A crash before the rename
//! leaves the original file untouched; a crash after leaves a consistent
//! new file. The `.tmp` file is cleaned up on any error path.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{PersistedState, StorageBackend};
use crate::error::Result;
use crate::interaction::Interaction;
use crate::tiers::TierKind;

pub struct JsonFileBackend {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl JsonFileBackend {
    /// Opens (or prepares to create) a snapshot file at `path`. Does not
    /// read the file yet — the initial state is empty until [`Self::load`]
    /// or a mutating call populates it. Callers typically call `load()`
    /// immediately after construction to pick up an existing snapshot.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(PersistedState::default()),
        }
    }

    /// Points at `state.json` in the platform's default data directory.
    pub fn open_default() -> Result<Self> {
        let data_dir = super::default_data_dir().ok_or_else(|| {
            crate::error::MemoryError::StorageError(
                "could not determine a platform data directory".into(),
            )
        })?;
        Ok(Self::new(data_dir.join("state.json")))
    }

    async fn read_from_disk(&self) -> Result<PersistedState> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(PersistedState::default());
        }
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn overwrite(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = {
            let filename = self
                .path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "semem_state.json".to_string());
            self.path.with_file_name(format!("{filename}.tmp"))
        };

        let write_result: Result<()> = async {
            let bytes = serde_json::to_vec_pretty(state)?;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .await?;
            file.write_all(&bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;

        if let Err(err) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn load(&self) -> Result<PersistedState> {
        let loaded = self.read_from_disk().await?;
        *self.state.lock().await = loaded.clone();
        Ok(loaded)
    }

    async fn append(&self, interaction: &Interaction, tier: TierKind) -> Result<()> {
        let mut state = self.state.lock().await;
        match tier {
            TierKind::ShortTerm => state.short_term.push(interaction.clone()),
            TierKind::LongTerm => state.long_term.push(interaction.clone()),
        }
        self.overwrite(&state).await
    }

    async fn promote(&self, id: Uuid, from: TierKind, to: TierKind) -> Result<()> {
        let mut state = self.state.lock().await;
        let source = match from {
            TierKind::ShortTerm => &mut state.short_term,
            TierKind::LongTerm => &mut state.long_term,
        };
        let Some(pos) = source.iter().position(|i| i.id == id) else {
            return Ok(());
        };
        let moved = source.remove(pos);
        match to {
            TierKind::ShortTerm => state.short_term.push(moved),
            TierKind::LongTerm => state.long_term.push(moved),
        }
        self.overwrite(&state).await
    }

    async fn update_access(
        &self,
        id: Uuid,
        access_count: u32,
        last_access_ms: i64,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        for item in state.short_term.iter_mut().chain(state.long_term.iter_mut()) {
            if item.id == id {
                item.access_count = access_count;
                item.last_access_ms = last_access_ms;
                break;
            }
        }
        self.overwrite(&state).await
    }

    async fn purge(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.short_term.retain(|i| i.id != id);
        state.long_term.retain(|i| i.id != id);
        self.overwrite(&state).await
    }

    async fn verify(&self) -> Result<bool> {
        Ok(self.read_from_disk().await.is_ok())
    }
}
