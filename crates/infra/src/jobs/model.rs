//! Job execution results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolbill_core::JobId;

/// An item whose processing has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedJobItem {
    pub id: String,
    pub started_at: DateTime<Utc>,
}

impl StartedJobItem {
    pub fn start(id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            started_at,
        }
    }

    pub fn succeeded(self, finished_at: DateTime<Utc>) -> JobItemResult {
        JobItemResult::Success {
            id: self.id,
            started_at: self.started_at,
            finished_at,
        }
    }

    pub fn failed(self, finished_at: DateTime<Utc>, error: impl Into<String>) -> JobItemResult {
        JobItemResult::Failure {
            id: self.id,
            started_at: self.started_at,
            finished_at,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobItemResult {
    Success {
        id: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    Failure {
        id: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        error: String,
    },
}

impl JobItemResult {
    pub fn id(&self) -> &str {
        match self {
            JobItemResult::Success { id, .. } | JobItemResult::Failure { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobItemResult::Success { .. })
    }
}

/// A job whose execution has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedJob {
    pub id: JobId,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
}

impl StartedJob {
    pub fn start(id: JobId, job_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            job_name: job_name.into(),
            started_at,
        }
    }

    /// All items were processed; individual items may still have failed.
    pub fn succeeded(self, finished_at: DateTime<Utc>, items: Vec<JobItemResult>) -> JobExecutionResult {
        let succeed_items = items.iter().filter(|item| item.is_success()).count();
        let failed_items = items.len() - succeed_items;

        JobExecutionResult::Success(SuccessJobExecution {
            id: self.id,
            job_name: self.job_name,
            started_at: self.started_at,
            finished_at,
            items,
            succeed_items,
            failed_items,
        })
    }

    /// The item source itself broke; the job stopped early.
    pub fn failed(self, finished_at: DateTime<Utc>, error: impl Into<String>) -> JobExecutionResult {
        JobExecutionResult::Failure(FailureJobExecution {
            id: self.id,
            job_name: self.job_name,
            started_at: self.started_at,
            finished_at,
            error: error.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessJobExecution {
    pub id: JobId,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<JobItemResult>,
    pub succeed_items: usize,
    pub failed_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureJobExecution {
    pub id: JobId,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobExecutionResult {
    Success(SuccessJobExecution),
    Failure(FailureJobExecution),
}

impl JobExecutionResult {
    pub fn id(&self) -> JobId {
        match self {
            JobExecutionResult::Success(e) => e.id,
            JobExecutionResult::Failure(e) => e.id,
        }
    }

    pub fn job_name(&self) -> &str {
        match self {
            JobExecutionResult::Success(e) => &e.job_name,
            JobExecutionResult::Failure(e) => &e.job_name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobExecutionResult::Success(_) => "SUCCESS",
            JobExecutionResult::Failure(_) => "FAILURE",
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        match self {
            JobExecutionResult::Success(e) => e.started_at,
            JobExecutionResult::Failure(e) => e.started_at,
        }
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        match self {
            JobExecutionResult::Success(e) => e.finished_at,
            JobExecutionResult::Failure(e) => e.finished_at,
        }
    }
}
