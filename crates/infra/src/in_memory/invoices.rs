use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use schoolbill_core::{ApplicationError, Error, ExpectedVersion, attributes};
use schoolbill_invoicing::{Invoice, InvoiceEvent, InvoiceStatus, PaymentStatus};

use super::poisoned;
use crate::records::{InvoiceRecord, PaymentRecord};
use crate::repository::{InvoiceQuery, InvoiceRepository, InvoicesQuery};

const ERROR_CODE: &str = "InvoiceRepositoryError";

#[derive(Debug, Clone)]
struct StoredInvoice {
    invoice: InvoiceRecord,
    payments: Vec<PaymentRecord>,
}

impl StoredInvoice {
    fn into_domain(self) -> Result<Invoice, Error> {
        self.invoice.into_domain(self.payments)
    }

    fn payment_mut(&mut self, payment_id: &uuid::Uuid) -> Result<&mut PaymentRecord, Error> {
        let invoice_id = self.invoice.id.clone();
        self.payments
            .iter_mut()
            .find(|p| p.id == *payment_id)
            .ok_or_else(|| {
                Error::from(ApplicationError::not_found(
                    "Payment",
                    attributes([("invoice_id", invoice_id), ("payment_id", payment_id.to_string())]),
                ))
            })
    }

    /// Mirror of the column updates the Postgres adapter issues.
    fn apply(&mut self, event: &InvoiceEvent) -> Result<(), Error> {
        match event {
            InvoiceEvent::InvoiceCreated(_) => {}
            InvoiceEvent::InvoicePaid(e) => {
                self.invoice.status = InvoiceStatus::Paid.as_str().to_string();
                self.invoice.paid_at = Some(e.occurred_at);
                self.invoice.updated_at = e.occurred_at;
            }
            InvoiceEvent::InvoiceCancelled(e) => {
                self.invoice.status = InvoiceStatus::Canceled.as_str().to_string();
                self.invoice.cancelled_at = Some(e.occurred_at);
                self.invoice.updated_at = e.occurred_at;
            }
            InvoiceEvent::PaymentAdded(e) => {
                self.payments.push(PaymentRecord::from_added(e));
                self.invoice.updated_at = e.occurred_at;
            }
            InvoiceEvent::PaymentSucceed(e) => {
                let payment = self.payment_mut(e.payment_id.as_uuid())?;
                payment.status = PaymentStatus::Succeed.as_str().to_string();
                payment.succeed_at = Some(e.occurred_at);
                payment.updated_at = e.occurred_at;
                self.invoice.due_amount = e.due_amount.as_decimal();
                self.invoice.updated_at = e.occurred_at;
            }
            InvoiceEvent::PaymentFailed(e) => {
                let payment = self.payment_mut(e.payment_id.as_uuid())?;
                payment.status = PaymentStatus::Failed.as_str().to_string();
                payment.failed_at = Some(e.occurred_at);
                payment.updated_at = e.occurred_at;
                self.invoice.updated_at = e.occurred_at;
            }
        }
        self.invoice.version = event.version() as i64;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<String, StoredInvoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(current: Option<StoredInvoice>, event: &InvoiceEvent) -> Result<StoredInvoice, Error> {
        let id = event.invoice_id();

        if let InvoiceEvent::InvoiceCreated(created) = event {
            if current.is_some() {
                return Err(ApplicationError::already_exists(
                    "Invoice",
                    attributes([("id", id.to_string())]),
                )
                .into());
            }
            return Ok(StoredInvoice {
                invoice: InvoiceRecord::from_created(created),
                payments: Vec::new(),
            });
        }

        let mut stored = current.ok_or_else(|| {
            Error::from(ApplicationError::not_found(
                "Invoice",
                attributes([("id", id.to_string())]),
            ))
        })?;

        ExpectedVersion::preceding(event.version())
            .check(Some(stored.invoice.version as u64))
            .map_err(|mismatch| {
                Error::from(ApplicationError::conflict(
                    "Invoice",
                    attributes([
                        ("id", id.to_string()),
                        ("expected_version", format!("{:?}", mismatch.expected)),
                        ("actual_version", stored.invoice.version.to_string()),
                    ]),
                ))
            })?;

        stored.apply(event)?;
        Ok(stored)
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn exists(&self, query: &InvoiceQuery) -> Result<bool, Error> {
        let InvoiceQuery::ById(id) = query;
        let guard = self.invoices.read().map_err(|_| poisoned(ERROR_CODE))?;
        Ok(guard.contains_key(id.as_str()))
    }

    async fn find(&self, query: &InvoiceQuery) -> Result<Option<Invoice>, Error> {
        let InvoiceQuery::ById(id) = query;
        let stored = {
            let guard = self.invoices.read().map_err(|_| poisoned(ERROR_CODE))?;
            guard.get(id.as_str()).cloned()
        };
        stored.map(StoredInvoice::into_domain).transpose()
    }

    async fn list(&self, query: &InvoicesQuery) -> Result<Vec<Invoice>, Error> {
        let mut stored: Vec<StoredInvoice> = {
            let guard = self.invoices.read().map_err(|_| poisoned(ERROR_CODE))?;
            guard
                .values()
                .filter(|s| match query {
                    InvoicesQuery::BySchoolId(id) => s.invoice.school_id == *id.as_uuid(),
                    InvoicesQuery::ByStudentId(id) => s.invoice.student_id == *id.as_uuid(),
                })
                .cloned()
                .collect()
        };
        stored.sort_by(|a, b| {
            (a.invoice.due_date, &a.invoice.id).cmp(&(b.invoice.due_date, &b.invoice.id))
        });

        stored.into_iter().map(StoredInvoice::into_domain).collect()
    }

    async fn update_all(&self, events: &[InvoiceEvent]) -> Result<(), Error> {
        let mut guard = self.invoices.write().map_err(|_| poisoned(ERROR_CODE))?;

        // Changes are staged and only written back once the whole batch applied.
        let mut staged: HashMap<String, StoredInvoice> = HashMap::new();
        for event in events {
            let id = event.invoice_id().to_string();
            let current = match staged.get(&id) {
                Some(stored) => Some(stored.clone()),
                None => guard.get(&id).cloned(),
            };
            staged.insert(id, Self::next(current, event)?);
        }

        guard.extend(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use schoolbill_core::{AggregateRoot, ErrorKind, Money, PaymentId, SchoolId, StudentId};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn new_invoice() -> (InvoiceEvent, Invoice) {
        Invoice::of(
            StudentId::new(),
            SchoolId::new(),
            Money::from_cents(10000),
            NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            test_time(),
        )
    }

    #[tokio::test]
    async fn applies_events_and_reloads_the_same_snapshot() {
        let repo = InMemoryInvoiceRepository::new();
        let (created, invoice) = new_invoice();
        repo.update(&created).await.unwrap();

        let payment_id = PaymentId::new();
        let (added, invoice) = invoice
            .add_payment(payment_id, Money::from_cents(10000), test_time())
            .unwrap();
        repo.update(&added).await.unwrap();

        let (events, invoice) = invoice.succeed_payment(payment_id, test_time()).unwrap();
        repo.update_all(&events).await.unwrap();

        let loaded = repo.get(&InvoiceQuery::ById(invoice.id().clone())).await.unwrap();
        assert_eq!(loaded, invoice);
        assert_eq!(loaded.status(), InvoiceStatus::Paid);
        assert_eq!(loaded.version(), 4);
    }

    #[tokio::test]
    async fn duplicate_creation_is_already_exists() {
        let repo = InMemoryInvoiceRepository::new();
        let (created, _) = new_invoice();
        repo.update(&created).await.unwrap();

        let err = repo.update(&created).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn stale_event_is_a_conflict() {
        let repo = InMemoryInvoiceRepository::new();
        let (created, invoice) = new_invoice();
        repo.update(&created).await.unwrap();

        // Two writers act on the same version 1 snapshot.
        let (cancelled, _) = invoice.cancel(test_time()).unwrap();
        let (added, _) = invoice
            .add_payment(PaymentId::new(), Money::from_cents(100), test_time())
            .unwrap();

        repo.update(&cancelled).await.unwrap();
        let err = repo.update(&added).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let loaded = repo.get(&InvoiceQuery::ById(invoice.id().clone())).await.unwrap();
        assert_eq!(loaded.status(), InvoiceStatus::Canceled);
        assert!(loaded.payments().is_empty());
    }

    #[tokio::test]
    async fn missing_invoice_is_not_found() {
        let repo = InMemoryInvoiceRepository::new();
        let (_, invoice) = new_invoice();
        let (cancelled, _) = invoice.cancel(test_time()).unwrap();

        let err = repo.update(&cancelled).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repo.find(&InvoiceQuery::ById(invoice.id().clone())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_batch_leaves_nothing_behind() {
        let repo = InMemoryInvoiceRepository::new();
        let (created, invoice) = new_invoice();
        repo.update(&created).await.unwrap();

        let payment_id = PaymentId::new();
        let (added, invoice) = invoice
            .add_payment(payment_id, Money::from_cents(10000), test_time())
            .unwrap();
        let (succeeded, _) = invoice.succeed_payment(payment_id, test_time()).unwrap();

        // Without PaymentSucceed the InvoicePaid event is one version ahead.
        let paid = succeeded[1].clone();
        let err = repo.update_all(&[added, paid]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let loaded = repo.get(&InvoiceQuery::ById(invoice.id().clone())).await.unwrap();
        assert_eq!(loaded.version(), 1);
        assert!(loaded.payments().is_empty());
    }

    #[tokio::test]
    async fn creation_and_follow_up_events_apply_in_one_batch() {
        let repo = InMemoryInvoiceRepository::new();
        let (created, invoice) = new_invoice();
        let (cancelled, invoice) = invoice.cancel(test_time()).unwrap();

        repo.update_all(&[created, cancelled]).await.unwrap();

        let loaded = repo.get(&InvoiceQuery::ById(invoice.id().clone())).await.unwrap();
        assert_eq!(loaded, invoice);
    }
}
