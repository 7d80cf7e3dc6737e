//! Persistence of triage outcomes.

pub mod sqlite_store;

pub use sqlite_store::SqliteTriageStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classify::ClassificationResult;
use crate::respond::Citation;

/// Row id of a persisted ticket.
pub type TicketRef = i64;

/// A classified ticket ready to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Caller-supplied identifier from the source ticketing system.
    pub external_id: Option<String>,
    pub text: String,
    pub product_area: String,
    pub urgency: String,
    pub reason: String,
    pub model: String,
}

impl TicketRecord {
    pub fn new(
        external_id: Option<String>,
        text: impl Into<String>,
        classification: &ClassificationResult,
    ) -> Self {
        Self {
            external_id,
            text: text.into(),
            product_area: classification.product_area.as_str().to_string(),
            urgency: classification.urgency.as_str().to_string(),
            reason: classification.reason.clone(),
            model: classification.model.clone(),
        }
    }
}

/// One retrieved chunk logged against a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRecord {
    pub ticket_ref: TicketRef,
    pub doc_id: String,
    pub score: f32,
    /// 1-based position in the retrieval results.
    pub rank: u32,
}

/// A synthesized answer logged against a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub ticket_ref: TicketRef,
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Durable log of tickets, their retrievals, and their answers.
#[async_trait]
pub trait TriageStore: Send + Sync {
    async fn insert_ticket(&self, ticket: &TicketRecord) -> anyhow::Result<TicketRef>;

    async fn record_retrievals(&self, retrievals: &[RetrievalRecord]) -> anyhow::Result<()>;

    async fn record_response(&self, response: &ResponseRecord) -> anyhow::Result<()>;
}
