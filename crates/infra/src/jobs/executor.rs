//! Job executor.
//!
//! Runs one job over a stream of item results. Item failures are recorded and
//! never stop the job; a failure of the item source itself does.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use tracing::{debug, error, info, warn};

use schoolbill_core::{Error, JobId};

use super::model::{JobExecutionResult, JobItemResult, StartedJob, StartedJobItem};
use crate::repository::JobRepository;

#[derive(Clone)]
pub struct JobExecutor {
    jobs: Arc<dyn JobRepository>,
}

impl JobExecutor {
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self { jobs }
    }

    /// Drain `items` and record the execution.
    ///
    /// The result is always saved. An `Err` from the stream aborts the drain
    /// and yields a failed execution; only a failure to save is returned as
    /// an error.
    pub async fn run<S>(
        &self,
        job_id: JobId,
        job_name: &str,
        items: S,
    ) -> Result<JobExecutionResult, Error>
    where
        S: Stream<Item = Result<JobItemResult, Error>> + Send,
    {
        let started = StartedJob::start(job_id, job_name, Utc::now());
        info!(job_id = %job_id, job_name, "job started");

        pin_mut!(items);
        let mut collected = Vec::new();
        let mut aborted = None;

        while let Some(item) = items.next().await {
            match item {
                Ok(item) => {
                    debug!(job_id = %job_id, item_id = item.id(), success = item.is_success(), "job item finished");
                    collected.push(item);
                }
                Err(err) => {
                    aborted = Some(err);
                    break;
                }
            }
        }

        let result = match aborted {
            None => started.succeeded(Utc::now(), collected),
            Some(err) => {
                error!(
                    job_id = %job_id,
                    job_name,
                    code = err.code(),
                    error = %err,
                    processed = collected.len(),
                    "job aborted"
                );
                started.failed(Utc::now(), err.to_string())
            }
        };

        if let JobExecutionResult::Success(execution) = &result {
            info!(
                job_id = %job_id,
                job_name,
                succeed_items = execution.succeed_items,
                failed_items = execution.failed_items,
                "job finished"
            );
        }

        self.jobs.save(&result).await?;
        Ok(result)
    }

    /// Run one item, turning its error into a failed item result.
    pub async fn execute_item<T, F>(id: String, work: F) -> JobItemResult
    where
        F: Future<Output = Result<T, Error>>,
    {
        let item = StartedJobItem::start(id, Utc::now());
        match work.await {
            Ok(_) => item.succeeded(Utc::now()),
            Err(err) => {
                warn!(item_id = %item.id, code = err.code(), error = %err, "job item failed");
                item.failed(Utc::now(), err.to_string())
            }
        }
    }
}
