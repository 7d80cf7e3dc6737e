//! triage-core: retrieval-augmented support ticket triage
//!
//! This crate implements the core pipeline that classifies incoming support
//! tickets by product area and urgency, retrieves relevant documentation
//! chunks from a vector index, and assembles a grounded, citation-backed
//! suggested response. Answers are never free-generated: the synthesizer
//! only rearranges retrieved evidence.
//!
//! ## Key Modules
//!
//! - **[`index`]**: Embedding index over document chunks with snapshot
//!   persistence and an atomically swappable read handle
//! - **[`classify`]**: Retry-protected gateway to the external
//!   classification service with strict output validation and safe fallback
//! - **[`respond`]**: Deterministic answer synthesizer with per-chunk
//!   citations
//! - **[`pipeline`]**: Orchestrator sequencing classify → retrieve →
//!   synthesize → persist
//! - **[`storage`]**: Append-only SQLite store for tickets, retrieval logs,
//!   and response logs
//! - **[`ingest`]**: Batch ingestion of source documents into a new index
//!   snapshot
//!
//! ## Architecture
//!
//! ```text
//! Ticket → ClassifierGateway ─┐
//!        → IndexHandle.query ─┴→ synthesize → TriageStore (SQLite)
//!                ↑
//! Docs → chunk → IndexSnapshot::build → SnapshotStore (vectors/chunks/meta)
//! ```

pub mod classify;
pub mod config;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod respond;
pub mod storage;
