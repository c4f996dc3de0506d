use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use schoolbill_core::{
    ApplicationError, Error, Money, PaymentId, SchoolId, StudentId, attributes,
};
use schoolbill_invoicing::{Invoice, InvoiceError, InvoiceId};

use super::rejected;
use crate::id_generator::IdGenerator;
use crate::repository::{
    AccountStatement, InvoiceQuery, InvoiceRepository, InvoicesQuery, SchoolQuery,
    SchoolRepository, StudentQuery, StudentRepository,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvoiceRequest {
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// Bill a student for one period. At most one invoice exists per school,
/// student and month.
pub struct CreateInvoice {
    schools: Arc<dyn SchoolRepository>,
    students: Arc<dyn StudentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
}

impl CreateInvoice {
    pub fn new(
        schools: Arc<dyn SchoolRepository>,
        students: Arc<dyn StudentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
    ) -> Self {
        Self {
            schools,
            students,
            invoices,
        }
    }

    pub async fn execute(&self, request: CreateInvoiceRequest) -> Result<Invoice, Error> {
        info!(
            school_id = %request.school_id,
            student_id = %request.student_id,
            amount = %request.amount,
            due_date = %request.due_date,
            "About to create an invoice"
        );

        let invoice_id = Invoice::build_id(request.school_id, request.student_id, request.due_date);
        if self.invoices.exists(&InvoiceQuery::ById(invoice_id)).await? {
            return Err(rejected(ApplicationError::already_exists(
                "Invoice",
                attributes([
                    ("school_id", request.school_id.to_string()),
                    ("student_id", request.student_id.to_string()),
                    ("due_date", request.due_date.to_string()),
                ]),
            )));
        }

        let school = self.schools.get(&SchoolQuery::ById(request.school_id)).await?;
        let student = self.students.get(&StudentQuery::ById(request.student_id)).await?;

        if !school.is_active() || !student.is_active() {
            return Err(rejected(InvoiceError::InvalidParties {
                school_id: school.id,
                student_id: student.id,
            }));
        }

        let (event, invoice) = Invoice::of(
            student.id,
            school.id,
            request.amount,
            request.due_date,
            Utc::now(),
        );
        self.invoices.update(&event).await?;

        Ok(invoice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddInvoicePaymentRequest {
    pub invoice_id: InvoiceId,
    pub amount: Money,
}

pub struct AddInvoicePayment {
    invoices: Arc<dyn InvoiceRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl AddInvoicePayment {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { invoices, ids }
    }

    pub async fn execute(&self, request: AddInvoicePaymentRequest) -> Result<Invoice, Error> {
        info!(invoice_id = %request.invoice_id, amount = %request.amount, "About to add an invoice payment");

        let invoice = self
            .invoices
            .get(&InvoiceQuery::ById(request.invoice_id))
            .await?;
        let payment_id = PaymentId::from_uuid(self.ids.generate().await);

        let (event, invoice) = invoice
            .add_payment(payment_id, request.amount, Utc::now())
            .map_err(rejected)?;
        self.invoices.update(&event).await?;

        Ok(invoice)
    }
}

/// Identifies a payment within an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePaymentRequest {
    pub invoice_id: InvoiceId,
    pub payment_id: PaymentId,
}

pub struct SucceedInvoicePayment {
    invoices: Arc<dyn InvoiceRepository>,
}

impl SucceedInvoicePayment {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoices }
    }

    pub async fn execute(&self, request: InvoicePaymentRequest) -> Result<Invoice, Error> {
        info!(invoice_id = %request.invoice_id, payment_id = %request.payment_id, "About to succeed an invoice payment");

        let invoice = self
            .invoices
            .get(&InvoiceQuery::ById(request.invoice_id))
            .await?;
        let (events, invoice) = invoice
            .succeed_payment(request.payment_id, Utc::now())
            .map_err(rejected)?;

        // PaymentSucceed and InvoicePaid land together or not at all.
        self.invoices.update_all(&events).await?;

        Ok(invoice)
    }
}

pub struct FailInvoicePayment {
    invoices: Arc<dyn InvoiceRepository>,
}

impl FailInvoicePayment {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoices }
    }

    pub async fn execute(&self, request: InvoicePaymentRequest) -> Result<Invoice, Error> {
        info!(invoice_id = %request.invoice_id, payment_id = %request.payment_id, "About to fail an invoice payment");

        let invoice = self
            .invoices
            .get(&InvoiceQuery::ById(request.invoice_id))
            .await?;
        let (event, invoice) = invoice
            .fail_payment(request.payment_id, Utc::now())
            .map_err(rejected)?;
        self.invoices.update(&event).await?;

        Ok(invoice)
    }
}

pub struct CancelInvoice {
    invoices: Arc<dyn InvoiceRepository>,
}

impl CancelInvoice {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoices }
    }

    pub async fn execute(&self, invoice_id: InvoiceId) -> Result<Invoice, Error> {
        info!(invoice_id = %invoice_id, "About to cancel an invoice");

        let invoice = self.invoices.get(&InvoiceQuery::ById(invoice_id)).await?;
        let (event, invoice) = invoice.cancel(Utc::now()).map_err(rejected)?;
        self.invoices.update(&event).await?;

        Ok(invoice)
    }
}

pub struct InvoiceQueryHandler {
    invoices: Arc<dyn InvoiceRepository>,
}

impl InvoiceQueryHandler {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoices }
    }

    pub async fn get(&self, query: &InvoiceQuery) -> Result<Invoice, Error> {
        self.invoices.get(query).await
    }

    pub async fn find(&self, query: &InvoiceQuery) -> Result<Option<Invoice>, Error> {
        self.invoices.find(query).await
    }

    pub async fn list(&self, query: &InvoicesQuery) -> Result<Vec<Invoice>, Error> {
        self.invoices.list(query).await
    }

    pub async fn account_statement(&self, query: &InvoicesQuery) -> Result<AccountStatement, Error> {
        self.invoices.account_statement(query).await
    }
}
