use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use schoolbill_core::{
    AggregateRoot, ApplicationError, Attributes, DomainError, Error, Money, SchoolId, StudentId,
    attributes,
};
use schoolbill_invoicing::{Invoice, InvoiceEvent, InvoiceId, InvoiceStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceQuery {
    ById(InvoiceId),
}

impl InvoiceQuery {
    pub fn attributes(&self) -> Attributes {
        match self {
            InvoiceQuery::ById(id) => attributes([("id", id.to_string())]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoicesQuery {
    BySchoolId(SchoolId),
    ByStudentId(StudentId),
}

impl InvoicesQuery {
    pub fn attributes(&self) -> Attributes {
        match self {
            InvoicesQuery::BySchoolId(id) => attributes([("school_id", id.to_string())]),
            InvoicesQuery::ByStudentId(id) => attributes([("student_id", id.to_string())]),
        }
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        match self {
            InvoicesQuery::BySchoolId(id) => invoice.school_id() == *id,
            InvoicesQuery::ByStudentId(id) => invoice.student_id() == *id,
        }
    }
}

/// Invoice header without its payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceProjection {
    pub id: InvoiceId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub initial_amount: Money,
    pub due_amount: Money,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl From<&Invoice> for InvoiceProjection {
    fn from(value: &Invoice) -> Self {
        Self {
            id: value.id().clone(),
            school_id: value.school_id(),
            student_id: value.student_id(),
            initial_amount: value.initial_amount(),
            due_amount: value.due_amount(),
            due_date: value.due_date(),
            status: value.status(),
            created_at: value.created_at(),
            updated_at: value.updated_at(),
            paid_at: value.paid_at(),
            cancelled_at: value.cancelled_at(),
            version: value.version(),
        }
    }
}

/// Outstanding balance of a school or a student.
///
/// `due_amount` only counts PENDING invoices; `invoices` lists all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatement {
    pub due_amount: Money,
    pub invoices: Vec<InvoiceProjection>,
}

impl AccountStatement {
    /// Fails with a validation error when the outstanding total is not
    /// representable.
    pub fn of(invoices: &[Invoice]) -> Result<Self, Error> {
        let due_amount = Money::checked_sum(
            invoices
                .iter()
                .filter(|invoice| invoice.is_pending())
                .map(Invoice::due_amount),
        )
        .ok_or_else(|| DomainError::validation("account statement total overflows"))?;

        Ok(Self {
            due_amount,
            invoices: invoices.iter().map(InvoiceProjection::from).collect(),
        })
    }
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn exists(&self, query: &InvoiceQuery) -> Result<bool, Error>;

    async fn find(&self, query: &InvoiceQuery) -> Result<Option<Invoice>, Error>;

    async fn get(&self, query: &InvoiceQuery) -> Result<Invoice, Error> {
        self.find(query)
            .await?
            .ok_or_else(|| Error::from(ApplicationError::not_found("Invoice", query.attributes())))
    }

    async fn list(&self, query: &InvoicesQuery) -> Result<Vec<Invoice>, Error>;

    async fn account_statement(&self, query: &InvoicesQuery) -> Result<AccountStatement, Error> {
        let invoices = self.list(query).await?;
        AccountStatement::of(&invoices)
    }

    /// Persist `events` in order, each on top of the invoice version
    /// preceding it. Either every event lands or none does.
    ///
    /// A duplicate creation yields `AlreadyExists`, any other version
    /// mismatch yields `Conflict` and a missing invoice `NotFound`.
    async fn update_all(&self, events: &[InvoiceEvent]) -> Result<(), Error>;

    async fn update(&self, event: &InvoiceEvent) -> Result<(), Error> {
        self.update_all(std::slice::from_ref(event)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use schoolbill_core::PaymentId;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn invoice(amount: u64) -> Invoice {
        let due_date = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        let (_, invoice) = Invoice::of(
            StudentId::new(),
            SchoolId::new(),
            Money::from_cents(amount),
            due_date,
            test_time(),
        );
        invoice
    }

    #[test]
    fn statement_sums_only_pending_invoices() {
        let pending = invoice(10000);
        let (_, partially_paid) = invoice(5000)
            .add_payment(PaymentId::new(), Money::from_cents(2000), test_time())
            .unwrap();
        let (_, cancelled) = invoice(7000).cancel(test_time()).unwrap();

        let statement = AccountStatement::of(&[pending, partially_paid, cancelled]).unwrap();

        assert_eq!(statement.due_amount, Money::from_cents(15000));
        assert_eq!(statement.invoices.len(), 3);
    }

    #[test]
    fn statement_of_largest_invoices_adds_up() {
        let at_limit = |_| {
            let due_date = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
            Invoice::of(
                StudentId::new(),
                SchoolId::new(),
                Money::max(),
                due_date,
                test_time(),
            )
            .1
        };
        let invoices: Vec<Invoice> = (0..3).map(at_limit).collect();

        let statement = AccountStatement::of(&invoices).unwrap();

        assert_eq!(statement.due_amount.to_string(), "29999999999.97");
    }

    #[test]
    fn empty_statement_is_zero() {
        let statement = AccountStatement::of(&[]).unwrap();
        assert!(statement.due_amount.is_zero());
        assert!(statement.invoices.is_empty());
    }
}
