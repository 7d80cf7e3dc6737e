//! Immutable embedding index snapshots.

use std::cmp::Ordering;
use std::path::PathBuf;

use triage_context::DocChunk;
use triage_embed::Embedder;

/// One retrieval hit: a chunk and its similarity score against the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocChunk,
    pub score: f32,
}

/// Errors from index build, persistence, and query paths.
///
/// `Corrupt` is deliberately distinct from the "absent" state
/// ([`super::SnapshotStore::load`] returns `Ok(None)` for absent): a
/// half-written or damaged snapshot must be surfaced to the operator, never
/// silently treated as empty.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A snapshot exists on disk but cannot be trusted
    #[error("index snapshot at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The query embedder is not the model the index was built with
    #[error("embedding model mismatch: index built with '{index_model}', queried with '{query_model}'")]
    ModelMismatch {
        index_model: String,
        query_model: String,
    },

    /// Vector dimensionality does not match the index
    #[error("embedding dimension mismatch: index has {index_dim}, embedder produces {embedder_dim}")]
    DimensionMismatch {
        index_dim: usize,
        embedder_dim: usize,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error(transparent)]
    Embed(#[from] triage_embed::EmbedError),
}

/// An immutable vector index over documentation chunks.
///
/// Vectors are stored row-major (`dimension * chunks.len()` floats) in chunk
/// insertion order; the vector at row `i` and `chunks[i]` stay in lockstep
/// and are never reordered independently. All vectors are L2-normalized, so
/// the inner product used by [`search`](Self::search) is cosine similarity.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    model_id: String,
    dimension: usize,
    vectors: Vec<f32>,
    chunks: Vec<DocChunk>,
}

impl IndexSnapshot {
    /// Assemble a snapshot from pre-computed vectors.
    ///
    /// Used by [`super::SnapshotStore`] when reloading from disk; callers
    /// normally go through [`build`](Self::build).
    pub(crate) fn from_parts(
        model_id: String,
        dimension: usize,
        vectors: Vec<f32>,
        chunks: Vec<DocChunk>,
    ) -> Self {
        debug_assert_eq!(vectors.len(), dimension * chunks.len());
        Self {
            model_id,
            dimension,
            vectors,
            chunks,
        }
    }

    /// Embed every chunk and build the index.
    ///
    /// Chunk texts are embedded in insertion order with the given embedder;
    /// its model tag is recorded so mismatched queries can be rejected later.
    pub async fn build(chunks: Vec<DocChunk>, embedder: &dyn Embedder) -> Result<Self, IndexError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batch = embedder.embed_batch(&texts).await?;

        let dimension = embedder.dimension();
        let mut vectors = Vec::with_capacity(dimension * chunks.len());
        for embedding in batch.embeddings {
            if embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    index_dim: dimension,
                    embedder_dim: embedding.len(),
                });
            }
            vectors.extend_from_slice(&embedding);
        }

        tracing::info!(
            chunks = chunks.len(),
            dimension,
            model = embedder.model_id(),
            "Built index snapshot"
        );

        Ok(Self {
            model_id: embedder.model_id().to_string(),
            dimension,
            vectors,
            chunks,
        })
    }

    /// The embedding-model tag this index was built with.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The ordered chunk list.
    pub fn chunks(&self) -> &[DocChunk] {
        &self.chunks
    }

    pub(crate) fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// Exact inner-product search over all rows.
    ///
    /// Returns at most `min(k, len)` results sorted by descending score;
    /// ties keep insertion order (earlier-ingested chunk wins). An empty
    /// index yields an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension.max(1))
            .enumerate()
            .map(|(i, row)| {
                let score: f32 = row.iter().zip(query).map(|(a, b)| a * b).sum();
                (i, score)
            })
            .collect();

        // Stable sort: equal scores keep index (insertion) order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect()
    }

    /// Embed `text` with `embedder` and search.
    ///
    /// Rejects an embedder whose model tag or dimension differs from the one
    /// recorded at build time instead of silently producing garbage scores.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if embedder.model_id() != self.model_id {
            return Err(IndexError::ModelMismatch {
                index_model: self.model_id.clone(),
                query_model: embedder.model_id().to_string(),
            });
        }
        if embedder.dimension() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                index_dim: self.dimension,
                embedder_dim: embedder.dimension(),
            });
        }
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = embedder.embed(text).await?;
        Ok(self.search(&query_vec, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_embed::HashEmbedder;

    fn chunk(doc_id: &str, text: &str) -> DocChunk {
        DocChunk {
            doc_id: doc_id.to_string(),
            text: text.to_string(),
        }
    }

    fn sample_chunks() -> Vec<DocChunk> {
        vec![
            chunk("vpn.md#chunk0", "vpn tunnel configuration and steering"),
            chunk("vpn.md#chunk1", "tunnel drops and reconnect behavior"),
            chunk("dlp.md#chunk0", "data loss prevention policy ordering"),
        ]
    }

    #[tokio::test]
    async fn build_keeps_chunks_and_vectors_in_lockstep() {
        let embedder = HashEmbedder::new(64);
        let snapshot = IndexSnapshot::build(sample_chunks(), &embedder).await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.vectors().len(), 3 * 64);
        assert_eq!(snapshot.model_id(), embedder.model_id());
        assert_eq!(snapshot.chunks()[1].doc_id, "vpn.md#chunk1");
    }

    #[tokio::test]
    async fn query_returns_at_most_min_k_n_with_non_increasing_scores() {
        let embedder = HashEmbedder::new(64);
        let snapshot = IndexSnapshot::build(sample_chunks(), &embedder).await.unwrap();

        let results = snapshot
            .query("vpn tunnel drops", 10, &embedder)
            .await
            .unwrap();
        assert_eq!(results.len(), 3); // min(k=10, N=3)

        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        let top_two = snapshot.query("vpn tunnel drops", 2, &embedder).await.unwrap();
        assert_eq!(top_two.len(), 2);
        assert_eq!(top_two[0].chunk.doc_id, results[0].chunk.doc_id);
    }

    #[tokio::test]
    async fn requery_is_idempotent() {
        let embedder = HashEmbedder::new(64);
        let snapshot = IndexSnapshot::build(sample_chunks(), &embedder).await.unwrap();

        let first = snapshot.query("policy ordering", 3, &embedder).await.unwrap();
        let second = snapshot.query("policy ordering", 3, &embedder).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn ties_break_by_insertion_order() {
        // Two identical chunk texts embed identically; the earlier row must
        // win the tie.
        let embedder = HashEmbedder::new(64);
        let chunks = vec![
            chunk("a.md#chunk0", "identical text"),
            chunk("b.md#chunk0", "identical text"),
        ];
        let snapshot = IndexSnapshot::build(chunks, &embedder).await.unwrap();
        let results = snapshot.query("identical text", 2, &embedder).await.unwrap();
        assert_eq!(results[0].chunk.doc_id, "a.md#chunk0");
        assert_eq!(results[1].chunk.doc_id, "b.md#chunk0");
        assert_eq!(results[0].score, results[1].score);
    }

    #[tokio::test]
    async fn empty_index_yields_empty_results() {
        let embedder = HashEmbedder::new(64);
        let snapshot = IndexSnapshot::build(vec![], &embedder).await.unwrap();
        assert!(snapshot.is_empty());
        let results = snapshot.query("anything", 4, &embedder).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn mismatched_embedder_is_rejected() {
        let build_embedder = HashEmbedder::new(64);
        let snapshot = IndexSnapshot::build(sample_chunks(), &build_embedder)
            .await
            .unwrap();

        let other_model = HashEmbedder::with_config(
            triage_embed::EmbedConfig::new("some-other-model", 64),
        );
        let err = snapshot.query("vpn", 4, &other_model).await.unwrap_err();
        assert!(matches!(err, IndexError::ModelMismatch { .. }));

        let other_dim = HashEmbedder::new(32);
        let err = snapshot.query("vpn", 4, &other_dim).await.unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }
}
