//! Monthly invoice generation for a school.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::{TryStreamExt, stream};
use tracing::info;

use schoolbill_core::{Error, JobId, SchoolId};
use schoolbill_schools::{ActiveEnrollmentProjection, SchoolError};

use super::executor::JobExecutor;
use super::model::{JobExecutionResult, JobItemResult};
use crate::id_generator::IdGenerator;
use crate::repository::{
    EnrollmentRepository, EnrollmentsQuery, SchoolQuery, SchoolRepository, active_enrollments,
};
use crate::use_cases::{CreateInvoice, CreateInvoiceRequest, rejected};

pub const GENERATE_INVOICES_JOB: &str = "GenerateInvoices";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateInvoicesRequest {
    pub school_id: SchoolId,
    /// Due date of every generated invoice; its month is the billed period.
    pub period: NaiveDate,
}

/// Creates one invoice per active enrollment of a school.
///
/// Enrollments are read page by page. A failing enrollment (inactive student,
/// invoice already generated, ...) is recorded as a failed item and the job
/// moves on.
pub struct GenerateInvoices {
    schools: Arc<dyn SchoolRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    create_invoice: Arc<CreateInvoice>,
    executor: JobExecutor,
    ids: Arc<dyn IdGenerator>,
}

impl GenerateInvoices {
    pub fn new(
        schools: Arc<dyn SchoolRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        create_invoice: Arc<CreateInvoice>,
        executor: JobExecutor,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            schools,
            enrollments,
            create_invoice,
            executor,
            ids,
        }
    }

    pub async fn execute(&self, request: GenerateInvoicesRequest) -> Result<JobExecutionResult, Error> {
        info!(
            school_id = %request.school_id,
            period = %request.period,
            "About to generate invoices"
        );

        let school = self.schools.get(&SchoolQuery::ById(request.school_id)).await?;
        if !school.is_active() {
            return Err(rejected(SchoolError::InvalidStatus { school_id: school.id }));
        }

        let job_id = JobId::from_uuid(self.ids.generate().await);
        let create_invoice = self.create_invoice.clone();
        let period = request.period;

        let items = active_enrollments(
            self.enrollments.clone(),
            EnrollmentsQuery::BySchoolId(school.id),
        )
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
        .and_then(move |enrollment| {
            let create_invoice = create_invoice.clone();
            async move { Ok(generate_invoice(&create_invoice, enrollment, period).await) }
        });

        self.executor.run(job_id, GENERATE_INVOICES_JOB, items).await
    }
}

async fn generate_invoice(
    create_invoice: &CreateInvoice,
    enrollment: ActiveEnrollmentProjection,
    period: NaiveDate,
) -> JobItemResult {
    let request = CreateInvoiceRequest {
        school_id: enrollment.school_id,
        student_id: enrollment.student_id,
        amount: enrollment.monthly_fee,
        due_date: period,
    };

    JobExecutor::execute_item(
        format!("enrollment:{}", enrollment.id),
        create_invoice.execute(request),
    )
    .await
}
