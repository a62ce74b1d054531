use crate::types::{Result, ScreenError, SubmissionState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Durable home of submission rows.
///
/// The pipeline only pushes transitions; it never reads state back.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Create a `pending` row for a new submission.
    async fn insert_pending(&self, id: Uuid, memo: &str, address: &str) -> Result<()>;

    /// Move a submission into `state`.
    async fn transition(&self, id: Uuid, state: SubmissionState) -> Result<()>;

    /// Store the neutral description and move to `got_main1`.
    async fn record_description(&self, id: Uuid, description: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub memo: String,
    pub address: String,
    pub status: SubmissionState,
    pub descriptive_output: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-process store used by the CLI when no database is configured, and by tests.
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, SubmissionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<SubmissionRecord> {
        self.records.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn apply(&self, id: Uuid, state: SubmissionState, description: Option<&str>) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| ScreenError::Persistence(format!("submission {} not found", id)))?;

        if !record.status.can_transition_to(state) {
            return Err(ScreenError::Persistence(format!(
                "submission {} cannot move from {} to {}",
                id, record.status, state
            )));
        }

        record.status = state;
        if let Some(description) = description {
            record.descriptive_output = Some(description.to_string());
        }
        record.updated_at = Utc::now();
        debug!("Submission {} is now {}", id, state);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert_pending(&self, id: Uuid, memo: &str, address: &str) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(ScreenError::Persistence(format!("submission {} already exists", id)));
        }

        let now = Utc::now();
        records.insert(
            id,
            SubmissionRecord {
                id,
                memo: memo.to_string(),
                address: address.to_string(),
                status: SubmissionState::Pending,
                descriptive_output: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn transition(&self, id: Uuid, state: SubmissionState) -> Result<()> {
        self.apply(id, state, None).await
    }

    async fn record_description(&self, id: Uuid, description: &str) -> Result<()> {
        self.apply(id, SubmissionState::GotMain1, Some(description)).await
    }
}

/// Postgres-backed store for the `submissions` table.
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submissions (
                id UUID PRIMARY KEY,
                memo TEXT NOT NULL,
                address VARCHAR(255) NOT NULL,
                status VARCHAR(32) NOT NULL DEFAULT 'pending',
                descriptive_output TEXT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("Submissions schema ready");
        Ok(())
    }

    fn predecessor_labels(state: SubmissionState) -> Vec<String> {
        state
            .predecessors()
            .iter()
            .map(|previous| previous.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn insert_pending(&self, id: Uuid, memo: &str, address: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO submissions (id, memo, address, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(memo)
        .bind(address)
        .bind(SubmissionState::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn transition(&self, id: Uuid, state: SubmissionState) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(id)
        .bind(state.as_str())
        .bind(Self::predecessor_labels(state))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ScreenError::Persistence(format!(
                "submission {} could not move to {}",
                id, state
            )));
        }
        Ok(())
    }

    async fn record_description(&self, id: Uuid, description: &str) -> Result<()> {
        let state = SubmissionState::GotMain1;
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET descriptive_output = $2, status = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($4)
            "#,
        )
        .bind(id)
        .bind(description)
        .bind(state.as_str())
        .bind(Self::predecessor_labels(state))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ScreenError::Persistence(format!(
                "submission {} could not record its description",
                id
            )));
        }
        Ok(())
    }
}
