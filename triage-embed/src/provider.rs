//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::Result;
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

/// Result of batch embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingBatch {
    /// Create a new batch from a vector of embeddings.
    ///
    /// The dimension is inferred from the first embedding vector; an empty
    /// batch has dimension 0.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this batch.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this batch contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// The same model (identified by [`model_id`](Embedder::model_id)) must be
/// used at index build time and query time; the caller is responsible for
/// checking the tag recorded in index metadata.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate a normalized embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate normalized embeddings for multiple texts (batch processing)
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatch>;

    /// Get the dimension of embeddings produced by this provider
    fn dimension(&self) -> usize;

    /// Get the model tag recorded in index metadata
    fn model_id(&self) -> &str;
}

/// Deterministic feature-hash embedder.
///
/// Hashes lowercase word tokens into `dimension` buckets with FNV and
/// L2-normalizes the result. The same text always produces the same vector,
/// which makes it suitable for offline use and tests; it stands in for the
/// external sentence-transformer collaborator behind the same trait.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    config: EmbedConfig,
}

impl HashEmbedder {
    /// Create a hash embedder with the default model tag and the given
    /// dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            config: EmbedConfig::default().with_dimension(dimension),
        }
    }

    /// Create a hash embedder from an explicit configuration.
    pub fn with_config(config: EmbedConfig) -> Self {
        Self { config }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let dim = self.config.dimension;
        let mut vector = vec![0f32; dim];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let lowered = token.to_lowercase();
            let mut hasher = FnvHasher::default();
            hasher.write(lowered.as_bytes());
            let hash = hasher.finish();
            let bucket = (hash % dim as u64) as usize;
            // Signed hashing keeps bucket collisions from only accumulating
            // in one direction.
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

/// Normalize a vector in place. A zero vector is left as-is; downstream
/// inner products against it score 0.0.
fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch::new(vec![]));
        }
        tracing::debug!("Generating embeddings for {} texts", texts.len());
        let embeddings = texts.iter().map(|t| self.embed_sync(t)).collect();
        Ok(EmbeddingBatch::new(embeddings))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}
