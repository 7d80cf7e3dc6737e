//! Snapshot persistence.
//!
//! A persisted snapshot is a directory holding three co-located artifacts
//! that are always read and written as a set:
//!
//! - `vectors.bin` — the raw `f32` vector matrix (native byte order)
//! - `chunks.json` — the ordered chunk list
//! - `meta.json`   — embedding-model tag, dimension, and chunk count
//!
//! Writes go to a fresh temp directory beside the target which is then
//! swapped into place by renames, so a partial write is never observable as
//! a valid snapshot. On load, "nothing there" is reported as `Ok(None)`
//! (the caller rebuilds); any incomplete or inconsistent artifact set is a
//! hard [`IndexError::Corrupt`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use triage_context::DocChunk;

use super::snapshot::{IndexError, IndexSnapshot};

const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";
const META_FILE: &str = "meta.json";

/// Metadata persisted alongside the vector matrix and chunk list.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotMeta {
    model_id: String,
    dimension: usize,
    chunk_count: usize,
}

/// Directory-backed store for one [`IndexSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `dir` (e.g. `data/vector_store`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The snapshot directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn corrupt(&self, reason: impl Into<String>) -> IndexError {
        IndexError::Corrupt {
            path: self.dir.clone(),
            reason: reason.into(),
        }
    }

    /// Persist `snapshot`, atomically replacing any previous snapshot.
    ///
    /// All three artifacts are staged in a temp directory first; the staged
    /// directory is renamed into place and the previous snapshot (if any) is
    /// renamed aside and removed. A crash mid-swap can leave the snapshot
    /// absent, but never half-written-as-valid.
    pub fn save(&self, snapshot: &IndexSnapshot) -> Result<(), IndexError> {
        let parent = self.dir.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let staging = tempfile::Builder::new()
            .prefix(".snapshot-")
            .tempdir_in(parent)?;

        let meta = SnapshotMeta {
            model_id: snapshot.model_id().to_string(),
            dimension: snapshot.dimension(),
            chunk_count: snapshot.len(),
        };
        fs::write(
            staging.path().join(VECTORS_FILE),
            bytemuck::cast_slice::<f32, u8>(snapshot.vectors()),
        )?;
        fs::write(
            staging.path().join(CHUNKS_FILE),
            serde_json::to_vec_pretty(snapshot.chunks())
                .map_err(|e| self.corrupt(format!("failed to encode chunk list: {e}")))?,
        )?;
        fs::write(
            staging.path().join(META_FILE),
            serde_json::to_vec_pretty(&meta)
                .map_err(|e| self.corrupt(format!("failed to encode metadata: {e}")))?,
        )?;

        let staged = staging.keep();
        let previous = parent.join(".snapshot-previous");
        if previous.exists() {
            fs::remove_dir_all(&previous)?;
        }
        if self.dir.exists() {
            fs::rename(&self.dir, &previous)?;
        }
        fs::rename(&staged, &self.dir)?;
        if previous.exists() {
            fs::remove_dir_all(&previous)?;
        }

        tracing::info!(
            dir = %self.dir.display(),
            chunks = meta.chunk_count,
            model = %meta.model_id,
            "Persisted index snapshot"
        );
        Ok(())
    }

    /// Load the persisted snapshot.
    ///
    /// Returns `Ok(None)` only when no artifact exists at all; a snapshot
    /// with missing or inconsistent artifacts is a hard
    /// [`IndexError::Corrupt`] and must not be silently rebuilt.
    pub fn load(&self) -> Result<Option<IndexSnapshot>, IndexError> {
        let vectors_path = self.dir.join(VECTORS_FILE);
        let chunks_path = self.dir.join(CHUNKS_FILE);
        let meta_path = self.dir.join(META_FILE);

        let present = [
            vectors_path.exists(),
            chunks_path.exists(),
            meta_path.exists(),
        ];
        if present.iter().all(|p| !p) {
            return Ok(None);
        }
        if present.iter().any(|p| !p) {
            return Err(self.corrupt("snapshot artifact set is incomplete"));
        }

        let meta: SnapshotMeta = serde_json::from_slice(&fs::read(&meta_path)?)
            .map_err(|e| self.corrupt(format!("unreadable metadata: {e}")))?;
        let chunks: Vec<DocChunk> = serde_json::from_slice(&fs::read(&chunks_path)?)
            .map_err(|e| self.corrupt(format!("unreadable chunk list: {e}")))?;
        if chunks.len() != meta.chunk_count {
            return Err(self.corrupt(format!(
                "chunk list has {} entries, metadata says {}",
                chunks.len(),
                meta.chunk_count
            )));
        }

        let bytes = fs::read(&vectors_path)?;
        let expected = meta.chunk_count * meta.dimension * std::mem::size_of::<f32>();
        if bytes.len() != expected {
            return Err(self.corrupt(format!(
                "vector file is {} bytes, expected {expected}",
                bytes.len()
            )));
        }
        let vectors: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);

        tracing::info!(
            dir = %self.dir.display(),
            chunks = meta.chunk_count,
            model = %meta.model_id,
            "Loaded index snapshot"
        );
        Ok(Some(IndexSnapshot::from_parts(
            meta.model_id,
            meta.dimension,
            vectors,
            chunks,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use triage_embed::{Embedder, HashEmbedder};

    fn chunk(doc_id: &str, text: &str) -> DocChunk {
        DocChunk {
            doc_id: doc_id.to_string(),
            text: text.to_string(),
        }
    }

    async fn build_sample(embedder: &HashEmbedder) -> IndexSnapshot {
        IndexSnapshot::build(
            vec![
                chunk("swg.md#chunk0", "steering configuration for the web gateway"),
                chunk("swg.md#chunk1", "ssl inspection bypass list management"),
                chunk("casb.md#chunk0", "api data protection connector setup"),
            ],
            embedder,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn save_then_load_round_trips_query_results() {
        let temp = tempdir().unwrap();
        let store = SnapshotStore::new(temp.path().join("vector_store"));
        let embedder = HashEmbedder::new(64);
        let snapshot = build_sample(&embedder).await;

        let before = snapshot.query("ssl inspection", 3, &embedder).await.unwrap();
        store.save(&snapshot).unwrap();

        // Simulate a fresh process: reload from disk and re-query.
        let reloaded = store.load().unwrap().expect("snapshot should exist");
        assert_eq!(reloaded.model_id(), embedder.model_id());
        assert_eq!(reloaded.len(), snapshot.len());

        let after = reloaded.query("ssl inspection", 3, &embedder).await.unwrap();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.chunk.doc_id, a.chunk.doc_id);
            assert!((b.score - a.score).abs() <= 1e-5);
        }
    }

    #[test]
    fn load_on_missing_snapshot_is_absent_not_error() {
        let temp = tempdir().unwrap();
        let store = SnapshotStore::new(temp.path().join("vector_store"));
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn incomplete_artifact_set_is_corrupt() {
        let temp = tempdir().unwrap();
        let store = SnapshotStore::new(temp.path().join("vector_store"));
        let embedder = HashEmbedder::new(64);
        store.save(&build_sample(&embedder).await).unwrap();

        fs::remove_file(store.dir().join("chunks.json")).unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn truncated_vector_file_is_corrupt() {
        let temp = tempdir().unwrap();
        let store = SnapshotStore::new(temp.path().join("vector_store"));
        let embedder = HashEmbedder::new(64);
        store.save(&build_sample(&embedder).await).unwrap();

        let vectors_path = store.dir().join("vectors.bin");
        let bytes = fs::read(&vectors_path).unwrap();
        fs::write(&vectors_path, &bytes[..bytes.len() / 2]).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn save_replaces_previous_snapshot() {
        let temp = tempdir().unwrap();
        let store = SnapshotStore::new(temp.path().join("vector_store"));
        let embedder = HashEmbedder::new(64);

        store.save(&build_sample(&embedder).await).unwrap();
        let small = IndexSnapshot::build(vec![chunk("only.md#chunk0", "single doc")], &embedder)
            .await
            .unwrap();
        store.save(&small).unwrap();

        let reloaded = store.load().unwrap().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.chunks()[0].doc_id, "only.md#chunk0");
    }
}
