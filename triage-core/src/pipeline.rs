//! Ticket triage pipeline.
//!
//! One ticket flows through classification and retrieval concurrently, then
//! answer synthesis, then persistence. Nothing is persisted unless the whole
//! pipeline completes: a ticket that fails classification leaves no partial
//! rows behind.

use std::sync::Arc;

use metrics::counter;

use crate::classify::{ClassificationClient, ClassificationResult, ClassifierGateway, ClassifyError};
use crate::index::{IndexError, IndexHandle};
use crate::respond::{Citation, synthesize};
use crate::storage::{ResponseRecord, RetrievalRecord, TicketRecord, TicketRef, TriageStore};

pub const DEFAULT_TOP_K: usize = 4;

/// Where a failed ticket stopped in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FailedClassify,
    Retrieving,
    Synthesizing,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Classification failed after all retries; the ticket was not triaged.
    #[error("classifier unavailable")]
    ClassifierUnavailable {
        #[source]
        source: ClassifyError,
    },

    #[error("retrieval failed")]
    Retrieval(#[from] IndexError),

    #[error("failed to persist triage outcome")]
    Persistence(#[from] anyhow::Error),
}

impl PipelineError {
    /// The stage the failed ticket stopped at.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::ClassifierUnavailable { .. } => PipelineStage::FailedClassify,
            PipelineError::Retrieval(_) => PipelineStage::Retrieving,
            PipelineError::Persistence(_) => PipelineStage::Synthesizing,
        }
    }
}

/// Result of a fully triaged ticket.
#[derive(Debug, Clone)]
pub struct TriageOutcome {
    pub ticket_ref: TicketRef,
    pub classification: ClassificationResult,
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// The assembled triage pipeline.
pub struct TriagePipeline<C> {
    gateway: ClassifierGateway<C>,
    index: IndexHandle,
    embedder: Arc<dyn triage_embed::Embedder>,
    store: Arc<dyn TriageStore>,
    top_k: usize,
}

impl<C: ClassificationClient> TriagePipeline<C> {
    pub fn new(
        gateway: ClassifierGateway<C>,
        index: IndexHandle,
        embedder: Arc<dyn triage_embed::Embedder>,
        store: Arc<dyn TriageStore>,
    ) -> Self {
        Self {
            gateway,
            index,
            embedder,
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Classify a ticket and persist it, without retrieval or synthesis.
    pub async fn classify_only(
        &self,
        ticket_text: &str,
        external_id: Option<&str>,
    ) -> Result<(TicketRef, ClassificationResult), PipelineError> {
        let classification = self
            .gateway
            .classify(ticket_text)
            .await
            .map_err(|source| PipelineError::ClassifierUnavailable { source })?;

        let ticket = TicketRecord::new(
            external_id.map(str::to_string),
            ticket_text,
            &classification,
        );
        let ticket_ref = self.store.insert_ticket(&ticket).await?;
        Ok((ticket_ref, classification))
    }

    /// Run the full pipeline for one ticket.
    ///
    /// Classification and retrieval run concurrently; both must succeed
    /// before synthesis. Persistence happens last, so a failed ticket never
    /// leaves partial rows.
    pub async fn respond(
        &self,
        ticket_text: &str,
        external_id: Option<&str>,
    ) -> Result<TriageOutcome, PipelineError> {
        let (classified, retrieved) = tokio::join!(
            self.gateway.classify(ticket_text),
            self.index
                .query(ticket_text, self.top_k, self.embedder.as_ref())
        );

        let classification = match classified {
            Ok(classification) => classification,
            Err(source) => {
                counter!("triage_pipeline_tickets_total", "outcome" => "failed_classify")
                    .increment(1);
                tracing::error!(error = %source, "Ticket triage aborted at classification");
                return Err(PipelineError::ClassifierUnavailable { source });
            }
        };
        let retrieved = retrieved?;
        tracing::info!(
            product_area = classification.product_area.as_str(),
            urgency = classification.urgency.as_str(),
            retrieved = retrieved.len(),
            "Ticket classified"
        );

        let (answer, citations) = synthesize(ticket_text, &retrieved);

        let ticket = TicketRecord::new(
            external_id.map(str::to_string),
            ticket_text,
            &classification,
        );
        let ticket_ref = self.store.insert_ticket(&ticket).await?;

        let retrievals: Vec<RetrievalRecord> = retrieved
            .iter()
            .enumerate()
            .map(|(i, scored)| RetrievalRecord {
                ticket_ref,
                doc_id: scored.chunk.doc_id.clone(),
                score: scored.score,
                rank: (i + 1) as u32,
            })
            .collect();
        self.store.record_retrievals(&retrievals).await?;

        self.store
            .record_response(&ResponseRecord {
                ticket_ref,
                answer: answer.clone(),
                citations: citations.clone(),
            })
            .await?;

        counter!("triage_pipeline_tickets_total", "outcome" => "complete").increment(1);
        Ok(TriageOutcome {
            ticket_ref,
            classification,
            answer,
            citations,
        })
    }
}
