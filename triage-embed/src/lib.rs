//! # triage-embed
//!
//! Embedding abstractions for the ticket triage retrieval pipeline. The
//! vector index only ever talks to the [`Embedder`] trait; the concrete
//! sentence-transformer model is an external collaborator behind that seam,
//! identified by a model tag the index records at build time and verifies at
//! query time.
//!
//! ## Quick Start
//!
//! ```
//! use triage_embed::{Embedder, HashEmbedder};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let embedder = HashEmbedder::new(256);
//! let vector = embedder.embed("VPN tunnel drops every 5 minutes").await?;
//! assert_eq!(vector.len(), 256);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: Embedding model configuration (model tag, dimension)
//! - [`provider`]: The [`Embedder`] trait and the deterministic
//!   [`HashEmbedder`] used offline and in tests
//! - [`error`]: Error types and result handling
//!
//! All embeddings are L2-normalized `f32` vectors, so inner product equals
//! cosine similarity downstream.

pub mod config;
pub mod error;
pub mod provider;

// Re-export main types for easy access
pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
pub use provider::{Embedder, EmbeddingBatch, HashEmbedder};
