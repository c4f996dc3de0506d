//! Infrastructure wiring: repositories, use cases and background subscribers.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::task::JoinHandle;

use schoolbill_events::{Publisher, Subscriber};
use schoolbill_infra::IdGenerator;
use schoolbill_infra::in_memory::{
    InMemoryEnrollmentRepository, InMemoryInvoiceRepository, InMemoryJobRepository,
    InMemorySchoolRepository, InMemoryStudentRepository,
};
use schoolbill_infra::jobs::{
    DropStudentEnrollments, DropStudentEnrollmentsSubscriber, GenerateInvoices, JobExecutor,
};
use schoolbill_infra::postgres::{
    PostgresEnrollmentRepository, PostgresInvoiceRepository, PostgresJobRepository,
    PostgresSchoolRepository, PostgresStudentRepository,
};
use schoolbill_infra::repository::{
    EnrollmentRepository, InvoiceRepository, JobRepository, SchoolRepository, StudentRepository,
};
use schoolbill_infra::use_cases::{
    AddInvoicePayment, AdjustEnrollmentFee, CancelInvoice, CreateInvoice, DropEnrollment,
    DropSchool, DropStudent, EnrollStudentToSchool, EnrollmentQueryHandler, FailInvoicePayment,
    InvoiceQueryHandler, RegisterSchool, RegisterStudent, SchoolQueryHandler,
    StudentQueryHandler, SucceedInvoicePayment, UpdateSchool, UpdateStudent,
};

/// One adapter per repository port.
#[derive(Clone)]
pub struct Repositories {
    pub schools: Arc<dyn SchoolRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub jobs: Arc<dyn JobRepository>,
}

impl Repositories {
    pub fn in_memory(enrollment_page_size: usize) -> Self {
        Self {
            schools: Arc::new(InMemorySchoolRepository::new()),
            students: Arc::new(InMemoryStudentRepository::new()),
            enrollments: Arc::new(InMemoryEnrollmentRepository::with_page_size(
                enrollment_page_size,
            )),
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
            jobs: Arc::new(InMemoryJobRepository::new()),
        }
    }

    pub fn postgres(pool: Arc<PgPool>, enrollment_page_size: usize) -> Self {
        Self {
            schools: Arc::new(PostgresSchoolRepository::new(pool.clone())),
            students: Arc::new(PostgresStudentRepository::new(pool.clone())),
            enrollments: Arc::new(PostgresEnrollmentRepository::with_page_size(
                pool.clone(),
                enrollment_page_size,
            )),
            invoices: Arc::new(PostgresInvoiceRepository::new(pool.clone())),
            jobs: Arc::new(PostgresJobRepository::new(pool)),
        }
    }
}

/// Every use case the HTTP surface exposes.
pub struct AppServices {
    pub register_school: RegisterSchool,
    pub update_school: UpdateSchool,
    pub drop_school: DropSchool,
    pub schools: SchoolQueryHandler,

    pub register_student: RegisterStudent,
    pub update_student: UpdateStudent,
    pub drop_student: DropStudent,
    pub students: StudentQueryHandler,

    pub enroll_student: EnrollStudentToSchool,
    pub adjust_enrollment_fee: AdjustEnrollmentFee,
    pub drop_enrollment: Arc<DropEnrollment>,
    pub enrollments: EnrollmentQueryHandler,

    pub create_invoice: Arc<CreateInvoice>,
    pub add_invoice_payment: AddInvoicePayment,
    pub succeed_invoice_payment: SucceedInvoicePayment,
    pub fail_invoice_payment: FailInvoicePayment,
    pub cancel_invoice: CancelInvoice,
    pub invoices: InvoiceQueryHandler,

    pub generate_invoices: GenerateInvoices,
    pub drop_student_enrollments: Arc<DropStudentEnrollments>,
}

impl AppServices {
    pub fn new(
        repositories: Repositories,
        publisher: Arc<dyn Publisher>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let Repositories {
            schools,
            students,
            enrollments,
            invoices,
            jobs,
        } = repositories;

        let executor = JobExecutor::new(jobs);
        let create_invoice = Arc::new(CreateInvoice::new(
            schools.clone(),
            students.clone(),
            invoices.clone(),
        ));
        let drop_enrollment = Arc::new(DropEnrollment::new(enrollments.clone()));

        Self {
            register_school: RegisterSchool::new(schools.clone(), ids.clone()),
            update_school: UpdateSchool::new(schools.clone()),
            drop_school: DropSchool::new(schools.clone()),
            schools: SchoolQueryHandler::new(schools.clone()),

            register_student: RegisterStudent::new(students.clone(), ids.clone()),
            update_student: UpdateStudent::new(students.clone()),
            drop_student: DropStudent::new(students.clone(), publisher),
            students: StudentQueryHandler::new(students.clone()),

            enroll_student: EnrollStudentToSchool::new(
                schools.clone(),
                students,
                enrollments.clone(),
            ),
            adjust_enrollment_fee: AdjustEnrollmentFee::new(enrollments.clone()),
            drop_enrollment: drop_enrollment.clone(),
            enrollments: EnrollmentQueryHandler::new(enrollments.clone()),

            create_invoice: create_invoice.clone(),
            add_invoice_payment: AddInvoicePayment::new(invoices.clone(), ids.clone()),
            succeed_invoice_payment: SucceedInvoicePayment::new(invoices.clone()),
            fail_invoice_payment: FailInvoicePayment::new(invoices.clone()),
            cancel_invoice: CancelInvoice::new(invoices.clone()),
            invoices: InvoiceQueryHandler::new(invoices),

            generate_invoices: GenerateInvoices::new(
                schools,
                enrollments.clone(),
                create_invoice,
                executor.clone(),
                ids.clone(),
            ),
            drop_student_enrollments: Arc::new(DropStudentEnrollments::new(
                enrollments,
                drop_enrollment,
                executor,
                ids,
            )),
        }
    }

    /// Start the background subscribers. Each handle lives until the bus
    /// closes its subscription.
    pub fn spawn_subscribers(&self, subscriber: &dyn Subscriber) -> Vec<JoinHandle<()>> {
        vec![
            DropStudentEnrollmentsSubscriber::new(self.drop_student_enrollments.clone())
                .spawn(subscriber),
        ]
    }
}
