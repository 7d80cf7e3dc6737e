//! SQLite-backed [`TriageStore`].
//!
//! Three tables mirror the pipeline's outputs: `tickets` (the classified
//! ticket), `retrieval_logs` (one row per retrieved chunk, ranked), and
//! `response_logs` (the synthesized answer with its citations as JSON).

use std::path::Path;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use super::{ResponseRecord, RetrievalRecord, TicketRecord, TicketRef, TriageStore};

#[derive(Clone, Debug)]
pub struct SqliteTriageStore {
    pool: SqlitePool,
}

impl SqliteTriageStore {
    /// Open (or create) the triage database at `db_path`.
    pub async fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// In-memory database for tests.
    pub async fn open_memory() -> anyhow::Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT,
                text TEXT NOT NULL,
                product_area TEXT,
                urgency TEXT,
                classification_reason TEXT,
                classifier_model TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS retrieval_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticket_id INTEGER NOT NULL,
                doc_id TEXT NOT NULL,
                score REAL NOT NULL,
                rank INTEGER NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS response_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticket_id INTEGER NOT NULL,
                answer TEXT NOT NULL,
                citations_json TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tickets_external ON tickets(external_id)")
            .execute(pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_retrieval_ticket ON retrieval_logs(ticket_id)",
        )
        .execute(pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_response_ticket ON response_logs(ticket_id)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Number of persisted tickets.
    pub async fn ticket_count(&self) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Logged retrievals for a ticket, ordered by rank.
    pub async fn retrievals_for(&self, ticket_ref: TicketRef) -> anyhow::Result<Vec<RetrievalRecord>> {
        let rows = sqlx::query(
            "SELECT doc_id, score, rank FROM retrieval_logs WHERE ticket_id = ?1 ORDER BY rank",
        )
        .bind(ticket_ref)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(RetrievalRecord {
                    ticket_ref,
                    doc_id: row.try_get("doc_id")?,
                    score: row.try_get::<f64, _>("score")? as f32,
                    rank: row.try_get::<i64, _>("rank")? as u32,
                })
            })
            .collect()
    }

    /// Logged answer for a ticket, if one was recorded.
    pub async fn response_for(&self, ticket_ref: TicketRef) -> anyhow::Result<Option<ResponseRecord>> {
        let row = sqlx::query(
            "SELECT answer, citations_json FROM response_logs WHERE ticket_id = ?1 \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(ticket_ref)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let citations_json: String = row.try_get("citations_json")?;
                Ok(Some(ResponseRecord {
                    ticket_ref,
                    answer: row.try_get("answer")?,
                    citations: serde_json::from_str(&citations_json)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Creation timestamp of a ticket row.
    pub async fn ticket_created_at(
        &self,
        ticket_ref: TicketRef,
    ) -> anyhow::Result<Option<chrono::NaiveDateTime>> {
        let created_at = sqlx::query_scalar("SELECT created_at FROM tickets WHERE id = ?1")
            .bind(ticket_ref)
            .fetch_optional(&self.pool)
            .await?;
        Ok(created_at)
    }

    /// The persisted ticket row, if present.
    pub async fn get_ticket(&self, ticket_ref: TicketRef) -> anyhow::Result<Option<TicketRecord>> {
        let row = sqlx::query(
            "SELECT external_id, text, product_area, urgency, classification_reason, \
             classifier_model FROM tickets WHERE id = ?1",
        )
        .bind(ticket_ref)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(TicketRecord {
                external_id: row.try_get("external_id")?,
                text: row.try_get("text")?,
                product_area: row
                    .try_get::<Option<String>, _>("product_area")?
                    .unwrap_or_default(),
                urgency: row
                    .try_get::<Option<String>, _>("urgency")?
                    .unwrap_or_default(),
                reason: row
                    .try_get::<Option<String>, _>("classification_reason")?
                    .unwrap_or_default(),
                model: row
                    .try_get::<Option<String>, _>("classifier_model")?
                    .unwrap_or_default(),
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TriageStore for SqliteTriageStore {
    async fn insert_ticket(&self, ticket: &TicketRecord) -> anyhow::Result<TicketRef> {
        let result = sqlx::query(
            r#"
            INSERT INTO tickets
                (external_id, text, product_area, urgency, classification_reason, classifier_model)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&ticket.external_id)
        .bind(&ticket.text)
        .bind(&ticket.product_area)
        .bind(&ticket.urgency)
        .bind(&ticket.reason)
        .bind(&ticket.model)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn record_retrievals(&self, retrievals: &[RetrievalRecord]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for retrieval in retrievals {
            sqlx::query(
                "INSERT INTO retrieval_logs (ticket_id, doc_id, score, rank) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(retrieval.ticket_ref)
            .bind(&retrieval.doc_id)
            .bind(retrieval.score as f64)
            .bind(retrieval.rank as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn record_response(&self, response: &ResponseRecord) -> anyhow::Result<()> {
        let citations_json = serde_json::to_string(&response.citations)?;
        sqlx::query(
            "INSERT INTO response_logs (ticket_id, answer, citations_json) VALUES (?1, ?2, ?3)",
        )
        .bind(response.ticket_ref)
        .bind(&response.answer)
        .bind(&citations_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassificationResult, ProductArea, Urgency};
    use crate::respond::Citation;

    fn sample_classification() -> ClassificationResult {
        ClassificationResult {
            product_area: ProductArea::Ztna,
            urgency: Urgency::P0,
            reason: "service blocking users".to_string(),
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn ticket_round_trips() {
        let store = SqliteTriageStore::open_memory().await.unwrap();
        let record = TicketRecord::new(
            Some("JIRA-42".to_string()),
            "VPN tunnel drops every 5 minutes",
            &sample_classification(),
        );
        let ticket_ref = store.insert_ticket(&record).await.unwrap();

        let loaded = store.get_ticket(ticket_ref).await.unwrap().unwrap();
        assert_eq!(loaded.external_id.as_deref(), Some("JIRA-42"));
        assert_eq!(loaded.product_area, "ZTNA");
        assert_eq!(loaded.urgency, "P0");
        assert_eq!(loaded.model, "test-model");
        assert_eq!(store.ticket_count().await.unwrap(), 1);
        assert!(store.ticket_created_at(ticket_ref).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn retrievals_come_back_in_rank_order() {
        let store = SqliteTriageStore::open_memory().await.unwrap();
        let ticket_ref = store
            .insert_ticket(&TicketRecord::new(None, "ticket", &sample_classification()))
            .await
            .unwrap();

        let retrievals = vec![
            RetrievalRecord {
                ticket_ref,
                doc_id: "b.md#chunk0".to_string(),
                score: 0.74,
                rank: 2,
            },
            RetrievalRecord {
                ticket_ref,
                doc_id: "a.md#chunk0".to_string(),
                score: 0.81,
                rank: 1,
            },
        ];
        store.record_retrievals(&retrievals).await.unwrap();

        let loaded = store.retrievals_for(ticket_ref).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].doc_id, "a.md#chunk0");
        assert_eq!(loaded[0].rank, 1);
        assert_eq!(loaded[1].doc_id, "b.md#chunk0");
        assert!((loaded[0].score - 0.81).abs() < 1e-6);
    }

    #[tokio::test]
    async fn response_with_citations_round_trips() {
        let store = SqliteTriageStore::open_memory().await.unwrap();
        let ticket_ref = store
            .insert_ticket(&TicketRecord::new(None, "ticket", &sample_classification()))
            .await
            .unwrap();

        let response = ResponseRecord {
            ticket_ref,
            answer: "Suggested approach...".to_string(),
            citations: vec![Citation {
                doc_id: "vpn.md#chunk1".to_string(),
                score: 0.81,
                excerpt: "tunnel keepalive guidance".to_string(),
            }],
        };
        store.record_response(&response).await.unwrap();

        let loaded = store.response_for(ticket_ref).await.unwrap().unwrap();
        assert_eq!(loaded.answer, response.answer);
        assert_eq!(loaded.citations, response.citations);
    }

    #[tokio::test]
    async fn missing_rows_are_none() {
        let store = SqliteTriageStore::open_memory().await.unwrap();
        assert!(store.get_ticket(999).await.unwrap().is_none());
        assert!(store.response_for(999).await.unwrap().is_none());
        assert!(store.retrievals_for(999).await.unwrap().is_empty());
    }
}
