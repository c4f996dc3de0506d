//! Batch jobs with per-item failure isolation.
//!
//! ## Components
//!
//! - `StartedJob` / `StartedJobItem`: in-flight bookkeeping turned into results
//! - `JobExecutor`: drains a stream of item results and records the execution
//! - `GenerateInvoices`: bills every active enrollment of a school for a period
//! - `DropStudentEnrollmentsSubscriber`: drops the enrollments of dropped students

pub mod drop_student_enrollments;
pub mod executor;
pub mod generate_invoices;
pub mod model;

pub use drop_student_enrollments::{
    DROP_STUDENT_ENROLLMENTS_JOB, DropStudentEnrollments, DropStudentEnrollmentsSubscriber,
};
pub use executor::JobExecutor;
pub use generate_invoices::{GENERATE_INVOICES_JOB, GenerateInvoices, GenerateInvoicesRequest};
pub use model::{
    FailureJobExecution, JobExecutionResult, JobItemResult, StartedJob, StartedJobItem,
    SuccessJobExecution,
};
