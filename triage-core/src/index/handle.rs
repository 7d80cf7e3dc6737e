//! Shared, swappable access to the current index snapshot.

use std::sync::Arc;

use tokio::sync::RwLock;
use triage_embed::Embedder;

use super::snapshot::{IndexError, IndexSnapshot, ScoredChunk};

/// Cheaply clonable handle to the snapshot currently being served.
///
/// Queries read against whichever snapshot was installed when they started;
/// [`IndexHandle::install`] swaps in a rebuilt snapshot without blocking
/// readers mid-search. A handle may be empty (no snapshot installed yet),
/// in which case queries return no results rather than failing.
#[derive(Debug, Clone, Default)]
pub struct IndexHandle {
    inner: Arc<RwLock<Option<Arc<IndexSnapshot>>>>,
}

impl IndexHandle {
    /// An empty handle; queries succeed with no results until a snapshot is
    /// installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle already serving `snapshot`.
    pub fn with_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(Arc::new(snapshot)))),
        }
    }

    /// Atomically replace the served snapshot. In-flight queries keep the
    /// snapshot they started with; new queries see the replacement.
    pub async fn install(&self, snapshot: IndexSnapshot) {
        let mut guard = self.inner.write().await;
        *guard = Some(Arc::new(snapshot));
    }

    /// The currently served snapshot, if any.
    pub async fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.inner.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Query the current snapshot, releasing the lock before embedding so a
    /// slow query never holds up a snapshot swap.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        let snapshot = match self.current().await {
            Some(snapshot) => snapshot,
            None => return Ok(Vec::new()),
        };
        snapshot.query(text, k, embedder).await
    }
}
