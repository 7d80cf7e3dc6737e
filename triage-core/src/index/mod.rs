//! Embedding index over documentation chunks.
//!
//! An [`IndexSnapshot`] pairs an ordered chunk list with a row-major matrix
//! of normalized embedding vectors; row `i` always belongs to `chunks[i]`.
//! Snapshots are built once per ingestion run and are immutable afterwards.
//! [`SnapshotStore`] persists the snapshot as three co-located artifacts
//! written as a unit, and [`IndexHandle`] lets concurrent readers query one
//! consistent version while a rebuild swaps in the next.

pub mod handle;
pub mod snapshot;
pub mod store;

pub use handle::IndexHandle;
pub use snapshot::{IndexError, IndexSnapshot, ScoredChunk};
pub use store::SnapshotStore;
