use async_trait::async_trait;

use schoolbill_core::Error;

use crate::jobs::JobExecutionResult;

/// Audit log of finished job executions.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn save(&self, result: &JobExecutionResult) -> Result<(), Error>;
}
