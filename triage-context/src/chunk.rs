//! Overlapping fixed-size window chunking for documentation text.
//!
//! Source documents are split into character-offset windows so that each
//! window can be embedded and retrieved independently. The first window
//! covers `[0, chunk_size)`; each subsequent window starts `overlap`
//! characters before the previous window's end and runs for at most
//! `chunk_size` characters. Chunking stops once a window reaches the end of
//! the input, so the last window may be shorter.
//!
//! Windows are character-based (not byte-based) and always fall on UTF-8
//! boundaries. The sequence is finite and restartable: calling
//! [`chunk_text`] again on the same input produces the same windows.
//!
//! Each chunk produced by [`chunk_document`] is tagged with a sequential
//! index used to build its `doc_id` (`"<source-id>#chunk<N>"`), which is the
//! stable identifier retrieval logs and citations refer back to.

use serde::{Deserialize, Serialize};

/// A bounded substring of a source document, the unit of retrieval.
///
/// Immutable once created. The `doc_id` is globally unique in the form
/// `"<source-id>#chunk<N>"`, where `N` preserves chunk order within the
/// source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocChunk {
    pub doc_id: String,
    pub text: String,
}

/// Configuration for window chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum window length in characters. `0` disables windowing: the
    /// whole input becomes a single chunk.
    pub chunk_size: usize,
    /// Characters shared between adjacent windows. Must be strictly less
    /// than `chunk_size` when `chunk_size > 0`.
    pub overlap: usize,
}

/// Error for an invalid chunking configuration.
#[derive(Debug, thiserror::Error)]
pub enum ChunkConfigError {
    #[error("overlap ({overlap}) must be less than chunk_size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

impl ChunkConfig {
    /// Create a validated configuration.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkConfigError> {
        if chunk_size > 0 && overlap >= chunk_size {
            return Err(ChunkConfigError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }
}

impl Default for ChunkConfig {
    /// Ingestion defaults: 800-character windows with 150 characters of
    /// overlap.
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 150,
        }
    }
}

/// Iterator over the chunk windows of a text.
///
/// Produced by [`chunk_text`]. Yields `&str` slices of the original input in
/// order; no allocation per window.
#[derive(Debug, Clone)]
pub struct ChunkWindows<'a> {
    text: &'a str,
    /// Byte offset of each character boundary, plus the final text length.
    bounds: Vec<usize>,
    config: ChunkConfig,
    start: usize,
    done: bool,
}

impl<'a> Iterator for ChunkWindows<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        let n = self.bounds.len() - 1;

        if self.config.chunk_size == 0 {
            // Windowing disabled: the whole text is a single chunk.
            self.done = true;
            return Some(self.text);
        }
        if self.start >= n {
            self.done = true;
            return None;
        }

        let end = (self.start + self.config.chunk_size).min(n);
        let window = &self.text[self.bounds[self.start]..self.bounds[end]];
        if end == n {
            self.done = true;
        } else {
            self.start = end.saturating_sub(self.config.overlap);
        }
        Some(window)
    }
}

/// Split `text` into overlapping character windows.
///
/// The returned iterator is finite and restartable; call again to re-walk
/// the same windows. Empty input with a positive `chunk_size` yields no
/// windows; with `chunk_size == 0` it yields the (empty) text once.
pub fn chunk_text<'a>(text: &'a str, config: &ChunkConfig) -> ChunkWindows<'a> {
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    ChunkWindows {
        text,
        bounds,
        config: *config,
        start: 0,
        done: false,
    }
}

/// Chunk one source document into [`DocChunk`]s.
///
/// Chunk `N` gets `doc_id = "<source_id>#chunk<N>"`. When `title` is given,
/// each chunk's text is prefixed with `"<title>\n"` so the embedding carries
/// the document title alongside the window (ingestion convention).
pub fn chunk_document(
    source_id: &str,
    title: Option<&str>,
    text: &str,
    config: &ChunkConfig,
) -> Vec<DocChunk> {
    chunk_text(text, config)
        .enumerate()
        .map(|(i, window)| DocChunk {
            doc_id: format!("{source_id}#chunk{i}"),
            text: match title {
                Some(t) => format!("{t}\n{window}"),
                None => window.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(chunk_size: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig::new(chunk_size, overlap).unwrap()
    }

    #[test]
    fn windows_cover_input_with_exact_overlap() {
        let text: String = (0..137).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (chunk_size, overlap) in [(10, 0), (10, 3), (40, 15), (200, 50)] {
            let windows: Vec<&str> = chunk_text(&text, &cfg(chunk_size, overlap)).collect();

            // First window starts at 0, last window ends at the input end.
            assert!(text.starts_with(windows[0]));
            assert!(text.ends_with(windows.last().unwrap()));

            // Adjacent windows share exactly `overlap` characters.
            let mut covered = windows[0].chars().count();
            for pair in windows.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                let prev_tail: String = prev
                    .chars()
                    .skip(prev.chars().count() - overlap.min(prev.chars().count()))
                    .collect();
                let next_head: String = next.chars().take(overlap).collect();
                assert_eq!(prev_tail, next_head);
                covered += next.chars().count() - overlap;
            }
            assert_eq!(covered, text.chars().count());
        }
    }

    #[test]
    fn window_starts_follow_prev_end_minus_overlap() {
        let text: String = "x".repeat(100);
        let windows: Vec<&str> = chunk_text(&text, &cfg(30, 10)).collect();
        // Starts: 0, 20, 40, 60, 80; last window is 100-80 = 20 chars.
        assert_eq!(windows.len(), 5);
        assert_eq!(windows[0].len(), 30);
        assert_eq!(windows[4].len(), 20);
    }

    #[test]
    fn zero_chunk_size_yields_whole_text() {
        let windows: Vec<&str> = chunk_text("hello world", &cfg(0, 0)).collect();
        assert_eq!(windows, vec!["hello world"]);
    }

    #[test]
    fn empty_input_yields_no_windows() {
        assert_eq!(chunk_text("", &cfg(100, 10)).count(), 0);
    }

    #[test]
    fn short_input_is_a_single_window() {
        let windows: Vec<&str> = chunk_text("short", &cfg(100, 10)).collect();
        assert_eq!(windows, vec!["short"]);
    }

    #[test]
    fn windows_respect_utf8_boundaries() {
        let text = "héllo wörld ✓ ümläut téxt repeated ".repeat(8);
        let windows: Vec<&str> = chunk_text(&text, &cfg(13, 4)).collect();
        assert!(windows.len() > 1);
        for w in &windows {
            assert!(w.chars().count() <= 13);
        }
        // Re-running yields the same sequence (restartable).
        let again: Vec<&str> = chunk_text(&text, &cfg(13, 4)).collect();
        assert_eq!(windows, again);
    }

    #[test]
    fn overlap_must_be_less_than_chunk_size() {
        assert!(ChunkConfig::new(10, 10).is_err());
        assert!(ChunkConfig::new(10, 11).is_err());
        assert!(ChunkConfig::new(10, 9).is_ok());
        // Irrelevant when windowing is disabled.
        assert!(ChunkConfig::new(0, 5).is_ok());
    }

    #[test]
    fn chunk_document_tags_sequential_doc_ids() {
        let text = "a".repeat(50);
        let chunks = chunk_document("kb/vpn.md", None, &text, &cfg(20, 5));
        // Windows: [0,20), [15,35), [30,50).
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.doc_id, format!("kb/vpn.md#chunk{i}"));
        }
    }

    #[test]
    fn chunk_document_prefixes_title() {
        let chunks = chunk_document(
            "https://docs.example.com/ztna",
            Some("ZTNA Connector Guide"),
            "Install the connector.",
            &ChunkConfig::default(),
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "ZTNA Connector Guide\nInstall the connector.");
        assert_eq!(chunks[0].doc_id, "https://docs.example.com/ztna#chunk0");
    }
}
