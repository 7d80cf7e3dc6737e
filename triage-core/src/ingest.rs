//! Documentation ingestion: turn docs into chunks and build a snapshot.
//!
//! Two ingestion sources are supported: a directory of plain-text files
//! (each file becomes one source document) and a crawled-docs JSON array of
//! `{url, title, text}` pages.

use std::path::Path;

use serde::{Deserialize, Serialize};
use triage_context::{ChunkConfig, DocChunk, chunk_document};
use triage_embed::Embedder;

use crate::index::{IndexError, IndexSnapshot};

/// One crawled documentation page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    pub title: String,
    pub text: String,
}

/// Chunk every regular file under `docs_dir` and build an index snapshot.
///
/// Files are processed in name order so repeated ingestion of the same
/// directory produces the same chunk ordering. The file name is the source
/// id; empty files are skipped.
pub async fn ingest_dir(
    docs_dir: &Path,
    config: &ChunkConfig,
    embedder: &dyn Embedder,
) -> Result<IndexSnapshot, IndexError> {
    let mut entries: Vec<_> = std::fs::read_dir(docs_dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|entry| entry.path().is_file())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut chunks: Vec<DocChunk> = Vec::new();
    for entry in entries {
        let path = entry.path();
        let source_id = entry.file_name().to_string_lossy().to_string();
        let text = std::fs::read_to_string(&path)?;
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(file = %path.display(), "Skipping empty docs file");
            continue;
        }
        chunks.extend(chunk_document(&source_id, None, text, config));
    }

    tracing::info!(
        docs_dir = %docs_dir.display(),
        chunks = chunks.len(),
        "Chunked documentation directory"
    );
    IndexSnapshot::build(chunks, embedder).await
}

/// Build an index snapshot from a crawled-docs JSON file.
///
/// Each page's URL is its source id, and the page title is prefixed onto
/// every chunk so retrieval can match titles too.
pub async fn ingest_crawled(
    crawled_file: &Path,
    config: &ChunkConfig,
    embedder: &dyn Embedder,
) -> Result<IndexSnapshot, IndexError> {
    let raw = std::fs::read(crawled_file)?;
    let pages: Vec<CrawledPage> = serde_json::from_slice(&raw).map_err(|e| IndexError::Corrupt {
        path: crawled_file.to_path_buf(),
        reason: format!("unreadable crawled docs file: {e}"),
    })?;

    let mut chunks: Vec<DocChunk> = Vec::new();
    for page in &pages {
        let text = page.text.trim();
        if text.is_empty() {
            continue;
        }
        chunks.extend(chunk_document(&page.url, Some(&page.title), text, config));
    }

    tracing::info!(
        file = %crawled_file.display(),
        pages = pages.len(),
        chunks = chunks.len(),
        "Chunked crawled documentation"
    );
    IndexSnapshot::build(chunks, embedder).await
}
