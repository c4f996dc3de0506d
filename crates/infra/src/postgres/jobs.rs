use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use schoolbill_core::{Error, attributes};

use super::map_sqlx_error;
use crate::jobs::JobExecutionResult;
use crate::records::JobExecutionRecord;
use crate::repository::JobRepository;

const ERROR_CODE: &str = "JobRepositoryError";

#[derive(Debug, Clone)]
pub struct PostgresJobRepository {
    pool: Arc<PgPool>,
}

impl PostgresJobRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    #[instrument(
        skip(self, result),
        fields(job_id = %result.id(), job_name = result.job_name(), kind = result.kind()),
        err
    )]
    async fn save(&self, result: &JobExecutionResult) -> Result<(), Error> {
        let record = JobExecutionRecord::from_domain(result)?;
        sqlx::query(
            r#"
            INSERT INTO job_executions (
                id, name, kind, items, error, succeed_items, failed_items, started_at, finished_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.kind)
        .bind(&record.items)
        .bind(&record.error)
        .bind(record.succeed_items)
        .bind(record.failed_items)
        .bind(record.started_at)
        .bind(record.finished_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(ERROR_CODE, "save", attributes([("id", record.id.to_string())]), e))?;
        Ok(())
    }
}
