//! WAL-mode SQLite backend, grounded on the PRAGMA setup and
//! `Mutex<Connection>` discipline of a sibling cognitive-memory engine's
//! SQLite storage layer.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{PersistedState, StorageBackend};
use crate::error::Result;
use crate::interaction::Interaction;
use crate::tiers::TierKind;

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens `semem.db` in the platform's default data directory, creating
    /// it (and restricting it to owner-only access on Unix) if needed.
    pub fn open_default() -> Result<Self> {
        let data_dir = super::default_data_dir().ok_or_else(|| {
            crate::error::MemoryError::StorageError(
                "could not determine a platform data directory".into(),
            )
        })?;
        let path = data_dir.join("semem.db");
        let backend = Self::open(path.clone())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(perms) = std::fs::metadata(&path).map(|m| m.permissions()) {
                let _ = std::fs::set_permissions(&path, {
                    let mut p = perms;
                    p.set_mode(0o600);
                    p
                });
            }
        }
        Ok(backend)
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn migrate(conn: &Connection) -> Result<()> {
        // The concept graph has no table of its own: `Manager::init`
        // reconstructs it from the `concepts` column of every loaded
        // interaction (§4.7), so this backend only needs to store
        // interactions themselves to round-trip fully.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS interactions (
                id TEXT PRIMARY KEY,
                prompt TEXT NOT NULL,
                output TEXT NOT NULL,
                embedding BLOB NOT NULL,
                concepts TEXT NOT NULL,
                metadata TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                access_count INTEGER NOT NULL,
                last_access_ms INTEGER NOT NULL,
                decay_factor REAL NOT NULL,
                tier TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn row_to_interaction(row: &rusqlite::Row) -> rusqlite::Result<Interaction> {
        let id: String = row.get("id")?;
        let embedding_blob: Vec<u8> = row.get("embedding")?;
        let concepts_json: String = row.get("concepts")?;
        let metadata_json: String = row.get("metadata")?;
        let concepts: BTreeSet<String> = serde_json::from_str(&concepts_json).unwrap_or_default();
        let metadata = serde_json::from_str(&metadata_json).unwrap_or_default();

        Ok(Interaction {
            id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
            prompt: row.get("prompt")?,
            output: row.get("output")?,
            embedding: Self::blob_to_embedding(&embedding_blob),
            concepts,
            timestamp_ms: row.get("timestamp_ms")?,
            access_count: row.get("access_count")?,
            last_access_ms: row.get("last_access_ms")?,
            decay_factor: row.get("decay_factor")?,
            metadata,
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn load(&self) -> Result<PersistedState> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare("SELECT * FROM interactions WHERE tier = ?1")?;
        let short_term = stmt
            .query_map(params!["short_term"], Self::row_to_interaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let long_term = stmt
            .query_map(params!["long_term"], Self::row_to_interaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(PersistedState {
            short_term,
            long_term,
        })
    }

    async fn append(&self, interaction: &Interaction, tier: TierKind) -> Result<()> {
        let conn = self.conn.lock().await;
        let concepts_json = serde_json::to_string(&interaction.concepts)?;
        let metadata_json = serde_json::to_string(&interaction.metadata)?;
        conn.execute(
            "INSERT INTO interactions
             (id, prompt, output, embedding, concepts, metadata, timestamp_ms, access_count, last_access_ms, decay_factor, tier)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                interaction.id.to_string(),
                interaction.prompt,
                interaction.output,
                Self::embedding_to_blob(&interaction.embedding),
                concepts_json,
                metadata_json,
                interaction.timestamp_ms,
                interaction.access_count,
                interaction.last_access_ms,
                interaction.decay_factor,
                tier.to_string(),
            ],
        )?;
        Ok(())
    }

    async fn promote(&self, id: Uuid, _from: TierKind, to: TierKind) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE interactions SET tier = ?1 WHERE id = ?2",
            params![to.to_string(), id.to_string()],
        )?;
        Ok(())
    }

    async fn update_access(
        &self,
        id: Uuid,
        access_count: u32,
        last_access_ms: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE interactions SET access_count = ?1, last_access_ms = ?2 WHERE id = ?3",
            params![access_count, last_access_ms, id.to_string()],
        )?;
        Ok(())
    }

    async fn purge(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM interactions WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    async fn verify(&self) -> Result<bool> {
        let conn = self.conn.lock().await;
        let _: Option<i64> = conn
            .query_row("SELECT 1 FROM sqlite_master LIMIT 1", [], |r| r.get(0))
            .optional()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn interaction() -> Interaction {
        Interaction::new("p", "o", vec![1.0, 2.0, 3.0, 4.0], BTreeSet::new(), 0)
    }

    #[tokio::test]
    async fn append_then_load_roundtrips() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let i = interaction();
        backend.append(&i, TierKind::ShortTerm).await.unwrap();

        let state = backend.load().await.unwrap();
        assert_eq!(state.short_term.len(), 1);
        assert_eq!(state.short_term[0].embedding, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn promote_changes_tier() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let i = interaction();
        backend.append(&i, TierKind::ShortTerm).await.unwrap();
        backend
            .promote(i.id, TierKind::ShortTerm, TierKind::LongTerm)
            .await
            .unwrap();

        let state = backend.load().await.unwrap();
        assert!(state.short_term.is_empty());
        assert_eq!(state.long_term.len(), 1);
    }

    #[tokio::test]
    async fn purge_removes_row() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let i = interaction();
        backend.append(&i, TierKind::ShortTerm).await.unwrap();
        backend.purge(i.id).await.unwrap();

        let state = backend.load().await.unwrap();
        assert!(state.short_term.is_empty());
    }

    #[tokio::test]
    async fn concepts_round_trip_so_the_manager_can_rebuild_the_graph() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let concepts: BTreeSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        let i = Interaction::new("p", "o", vec![0.0; 4], concepts.clone(), 0);
        backend.append(&i, TierKind::ShortTerm).await.unwrap();

        let state = backend.load().await.unwrap();
        assert_eq!(state.short_term[0].concepts, concepts);
    }
}
