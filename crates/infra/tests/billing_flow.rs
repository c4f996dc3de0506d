use std::sync::Arc;

use chrono::NaiveDate;

use schoolbill_core::{AggregateRoot, ErrorKind, Money, SchoolId, StudentId};
use schoolbill_events::InMemoryEventBus;
use schoolbill_infra::in_memory::{
    InMemoryEnrollmentRepository, InMemoryInvoiceRepository, InMemoryJobRepository,
    InMemorySchoolRepository, InMemoryStudentRepository,
};
use schoolbill_infra::jobs::{
    DropStudentEnrollments, DropStudentEnrollmentsSubscriber, GenerateInvoices,
    GenerateInvoicesRequest, JobExecutionResult, JobExecutor,
};
use schoolbill_infra::repository::{EnrollmentsQuery, InvoiceQuery, InvoicesQuery};
use schoolbill_infra::use_cases::{
    AddInvoicePayment, AddInvoicePaymentRequest, ContactDetails, CreateInvoice, DropEnrollment,
    DropStudent, EnrollStudentToSchool, EnrollStudentToSchoolRequest, EnrollmentQueryHandler,
    InvoicePaymentRequest, InvoiceQueryHandler, RegisterSchool, RegisterSchoolRequest,
    RegisterStudent, RegisterStudentRequest, SucceedInvoicePayment,
};
use schoolbill_infra::{IdGenerator, SequenceIdGenerator};
use schoolbill_invoicing::{InvoiceStatus, PaymentStatus};
use schoolbill_students::{Identity, IdentityKind};

struct Billing {
    bus: Arc<InMemoryEventBus>,
    jobs: Arc<InMemoryJobRepository>,
    register_school: RegisterSchool,
    register_student: RegisterStudent,
    enroll: EnrollStudentToSchool,
    drop_student: DropStudent,
    enrollments: EnrollmentQueryHandler,
    generate_invoices: GenerateInvoices,
    drop_student_enrollments: Arc<DropStudentEnrollments>,
    add_payment: AddInvoicePayment,
    succeed_payment: SucceedInvoicePayment,
    invoices: InvoiceQueryHandler,
}

impl Billing {
    /// Wires every use case over in-memory adapters. A page size of 2 makes
    /// the jobs walk several pages.
    fn new() -> Self {
        let schools = Arc::new(InMemorySchoolRepository::new());
        let students = Arc::new(InMemoryStudentRepository::new());
        let enrollments = Arc::new(InMemoryEnrollmentRepository::with_page_size(2));
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let jobs = Arc::new(InMemoryJobRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let ids: Arc<dyn IdGenerator> = Arc::new(SequenceIdGenerator::new());
        let executor = JobExecutor::new(jobs.clone());

        let create_invoice = Arc::new(CreateInvoice::new(
            schools.clone(),
            students.clone(),
            invoices.clone(),
        ));
        let drop_enrollment = Arc::new(DropEnrollment::new(enrollments.clone()));

        Self {
            register_school: RegisterSchool::new(schools.clone(), ids.clone()),
            register_student: RegisterStudent::new(students.clone(), ids.clone()),
            enroll: EnrollStudentToSchool::new(
                schools.clone(),
                students.clone(),
                enrollments.clone(),
            ),
            drop_student: DropStudent::new(students.clone(), bus.clone()),
            enrollments: EnrollmentQueryHandler::new(enrollments.clone()),
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
                ids.clone(),
            )),
            add_payment: AddInvoicePayment::new(invoices.clone(), ids),
            succeed_payment: SucceedInvoicePayment::new(invoices.clone()),
            invoices: InvoiceQueryHandler::new(invoices),
            bus,
            jobs,
        }
    }

    async fn school(&self, name: &str) -> SchoolId {
        self.register_school
            .execute(RegisterSchoolRequest {
                name: name.to_string(),
                contact: contact(&format!("office@{}.edu", name.to_lowercase())),
            })
            .await
            .unwrap()
            .id
    }

    async fn student(&self, code: &str) -> StudentId {
        self.register_student
            .execute(RegisterStudentRequest {
                first_name: "Ana".to_string(),
                last_name: code.to_string(),
                age: 12,
                contact: contact(&format!("{}@mail.com", code.to_lowercase())),
                identity: Identity::new(IdentityKind::Curp, code).unwrap(),
            })
            .await
            .unwrap()
            .id
    }

    async fn enroll(&self, school_id: SchoolId, student_id: StudentId, fee_cents: u64) {
        self.enroll
            .execute(EnrollStudentToSchoolRequest {
                school_id,
                student_id,
                monthly_fee: Money::from_cents(fee_cents),
            })
            .await
            .unwrap();
    }
}

fn contact(email: &str) -> ContactDetails {
    ContactDetails {
        email: email.to_string(),
        phone: "+52 55 1234 5678".to_string(),
        address: "Av. Reforma 1".to_string(),
    }
}

fn june() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

fn succeeded(result: &JobExecutionResult) -> (usize, usize) {
    match result {
        JobExecutionResult::Success(execution) => {
            (execution.succeed_items, execution.failed_items)
        }
        JobExecutionResult::Failure(execution) => {
            panic!("job failed: {}", execution.error)
        }
    }
}

#[tokio::test]
async fn bills_a_month_and_settles_it() {
    let billing = Billing::new();
    let school_id = billing.school("Lincoln").await;
    let student_id = billing.student("ABCD010101HDFXYZ01").await;
    billing.enroll(school_id, student_id, 150_000).await;

    let result = billing
        .generate_invoices
        .execute(GenerateInvoicesRequest {
            school_id,
            period: june(),
        })
        .await
        .unwrap();
    assert_eq!(succeeded(&result), (1, 0));

    let pending = billing
        .invoices
        .account_statement(&InvoicesQuery::ByStudentId(student_id))
        .await
        .unwrap();
    assert_eq!(pending.due_amount, Money::from_cents(150_000));
    assert_eq!(pending.invoices.len(), 1);
    let invoice_id = pending.invoices[0].id.clone();

    let mut invoice = billing
        .add_payment
        .execute(AddInvoicePaymentRequest {
            invoice_id: invoice_id.clone(),
            amount: Money::from_cents(150_000),
        })
        .await
        .unwrap();
    let payment_id = invoice.payments()[0].id();

    invoice = billing
        .succeed_payment
        .execute(InvoicePaymentRequest {
            invoice_id: invoice_id.clone(),
            payment_id,
        })
        .await
        .unwrap();
    assert_eq!(invoice.status(), InvoiceStatus::Paid);
    assert_eq!(invoice.payments()[0].status(), PaymentStatus::Succeed);
    assert_eq!(invoice.version(), 4);

    let stored = billing
        .invoices
        .get(&InvoiceQuery::ById(invoice_id))
        .await
        .unwrap();
    assert_eq!(stored, invoice);

    let settled = billing
        .invoices
        .account_statement(&InvoicesQuery::BySchoolId(school_id))
        .await
        .unwrap();
    assert!(settled.due_amount.is_zero());
}

#[tokio::test]
async fn one_failing_enrollment_does_not_stop_generation() {
    let billing = Billing::new();
    let school_id = billing.school("Roosevelt").await;
    let mut students = Vec::new();
    for code in ["AAAA000000HDFAAA01", "BBBB000000HDFBBB01", "CCCC000000HDFCCC01"] {
        let student_id = billing.student(code).await;
        billing.enroll(school_id, student_id, 90_000).await;
        students.push(student_id);
    }
    billing.drop_student.execute(students[1]).await.unwrap();

    let result = billing
        .generate_invoices
        .execute(GenerateInvoicesRequest {
            school_id,
            period: june(),
        })
        .await
        .unwrap();
    assert_eq!(succeeded(&result), (2, 1));

    // Regenerating the same period only hits existing invoices.
    let again = billing
        .generate_invoices
        .execute(GenerateInvoicesRequest {
            school_id,
            period: june(),
        })
        .await
        .unwrap();
    assert_eq!(succeeded(&again), (0, 3));

    let invoices = billing
        .invoices
        .list(&InvoicesQuery::BySchoolId(school_id))
        .await
        .unwrap();
    assert_eq!(invoices.len(), 2);
    assert!(invoices.iter().all(|i| i.student_id() != students[1]));

    let recorded = billing.jobs.executions().unwrap();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].succeed_items, Some(2));
    assert_eq!(recorded[0].failed_items, Some(1));
}

#[tokio::test]
async fn dropping_a_student_drops_their_enrollments() {
    let billing = Billing::new();
    let first = billing.school("Jefferson").await;
    let second = billing.school("Madison").await;
    let third = billing.school("Monroe").await;
    let student_id = billing.student("DDDD000000HDFDDD01").await;
    for school_id in [first, second, third] {
        billing.enroll(school_id, student_id, 50_000).await;
    }

    let subscriber = DropStudentEnrollmentsSubscriber::new(billing.drop_student_enrollments.clone())
        .spawn(billing.bus.as_ref());

    billing.drop_student.execute(student_id).await.unwrap();

    let query = EnrollmentsQuery::ByStudentId(student_id);
    let mut remaining = usize::MAX;
    for _ in 0..50 {
        remaining = billing
            .enrollments
            .list(&query, None)
            .await
            .unwrap()
            .items
            .len();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    subscriber.abort();

    assert_eq!(remaining, 0, "enrollments were not dropped in time");
    let err = billing
        .enroll
        .execute(EnrollStudentToSchoolRequest {
            school_id: first,
            student_id,
            monthly_fee: Money::from_cents(50_000),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn generation_requires_an_existing_school() {
    let billing = Billing::new();
    let missing = billing
        .generate_invoices
        .execute(GenerateInvoicesRequest {
            school_id: SchoolId::new(),
            period: june(),
        })
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert!(billing.jobs.executions().unwrap().is_empty());
}
