use std::sync::RwLock;

use async_trait::async_trait;

use schoolbill_core::Error;

use super::poisoned;
use crate::jobs::JobExecutionResult;
use crate::records::JobExecutionRecord;
use crate::repository::JobRepository;

const ERROR_CODE: &str = "JobRepositoryError";

#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    executions: RwLock<Vec<JobExecutionRecord>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved executions, oldest first.
    pub fn executions(&self) -> Result<Vec<JobExecutionRecord>, Error> {
        let guard = self.executions.read().map_err(|_| poisoned(ERROR_CODE))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn save(&self, result: &JobExecutionResult) -> Result<(), Error> {
        let record = JobExecutionRecord::from_domain(result)?;
        let mut guard = self.executions.write().map_err(|_| poisoned(ERROR_CODE))?;
        guard.push(record);
        Ok(())
    }
}
