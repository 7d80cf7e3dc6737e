pub mod chunk;

// Re-export the main chunking types for external use
pub use chunk::{ChunkConfig, ChunkConfigError, ChunkWindows, DocChunk, chunk_document, chunk_text};
