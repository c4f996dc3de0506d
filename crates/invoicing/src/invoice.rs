use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use schoolbill_core::{AggregateRoot, DomainError, DomainResult, Money, PaymentId, SchoolId, StudentId};

use crate::error::InvoiceError;
use crate::events::{
    InvoiceCancelled, InvoiceCreated, InvoiceEvent, InvoicePaid, PaymentAdded, PaymentFailed,
    PaymentSucceed,
};
use crate::payment::Payment;

/// Invoice identifier.
///
/// Derived from school, student and billing period so that "one invoice per
/// student per school per month" is enforced by uniqueness of the id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(String);

impl InvoiceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for InvoiceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for InvoiceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Invoice status lifecycle. `Paid` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Canceled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Canceled => "CANCELED",
        }
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PAID" => Ok(InvoiceStatus::Paid),
            "CANCELED" => Ok(InvoiceStatus::Canceled),
            other => Err(DomainError::validation(format!(
                "unknown invoice status: {other}"
            ))),
        }
    }
}

/// Aggregate root: Invoice.
///
/// Immutable snapshot owning its payments. `version` starts at 1 and grows by
/// one per emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    id: InvoiceId,
    student_id: StudentId,
    school_id: SchoolId,
    initial_amount: Money,
    due_amount: Money,
    due_date: NaiveDate,
    status: InvoiceStatus,
    payments: Vec<Payment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    version: u64,
}

/// Raw invoice state, as loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceParts {
    pub id: InvoiceId,
    pub student_id: StudentId,
    pub school_id: SchoolId,
    pub initial_amount: Money,
    pub due_amount: Money,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Invoice {
    /// Deterministic id for `(school, student, due_date.year, due_date.month)`.
    pub fn build_id(school_id: SchoolId, student_id: StudentId, due_date: NaiveDate) -> InvoiceId {
        InvoiceId(format!(
            "school:{school_id}/student:{student_id}/period:{}-{}",
            due_date.year(),
            due_date.month()
        ))
    }

    /// Create a PENDING invoice. Does not check for an existing invoice with
    /// the same id; callers do that first.
    pub fn of(
        student_id: StudentId,
        school_id: SchoolId,
        amount: Money,
        due_date: NaiveDate,
        at: DateTime<Utc>,
    ) -> (InvoiceEvent, Invoice) {
        let invoice = Invoice {
            id: Self::build_id(school_id, student_id, due_date),
            student_id,
            school_id,
            initial_amount: amount,
            due_amount: amount,
            due_date,
            status: InvoiceStatus::Pending,
            payments: Vec::new(),
            created_at: at,
            updated_at: at,
            paid_at: None,
            cancelled_at: None,
            version: 1,
        };

        let event = InvoiceEvent::InvoiceCreated(InvoiceCreated {
            invoice_id: invoice.id.clone(),
            school_id,
            student_id,
            amount,
            due_date,
            version: invoice.version,
            occurred_at: at,
        });

        (event, invoice)
    }

    /// Rebuild an invoice from stored parts, rejecting states that break the
    /// aggregate invariants.
    pub fn rehydrate(parts: InvoiceParts) -> DomainResult<Self> {
        if parts.due_amount > parts.initial_amount {
            return Err(DomainError::validation(format!(
                "invoice {} has due_amount above initial_amount",
                parts.id
            )));
        }
        let consistent = match parts.status {
            InvoiceStatus::Pending => parts.paid_at.is_none() && parts.cancelled_at.is_none(),
            InvoiceStatus::Paid => parts.paid_at.is_some() && parts.cancelled_at.is_none(),
            InvoiceStatus::Canceled => parts.paid_at.is_none() && parts.cancelled_at.is_some(),
        };
        if !consistent {
            return Err(DomainError::validation(format!(
                "invoice {} has timestamps inconsistent with status {}",
                parts.id,
                parts.status.as_str()
            )));
        }
        if parts.payments.iter().any(|p| p.invoice_id() != &parts.id) {
            return Err(DomainError::validation(format!(
                "invoice {} owns a payment of another invoice",
                parts.id
            )));
        }

        Ok(Self {
            id: parts.id,
            student_id: parts.student_id,
            school_id: parts.school_id,
            initial_amount: parts.initial_amount,
            due_amount: parts.due_amount,
            due_date: parts.due_date,
            status: parts.status,
            payments: parts.payments,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            paid_at: parts.paid_at,
            cancelled_at: parts.cancelled_at,
            version: parts.version,
        })
    }

    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    pub fn school_id(&self) -> SchoolId {
        self.school_id
    }

    pub fn initial_amount(&self) -> Money {
        self.initial_amount
    }

    pub fn due_amount(&self) -> Money {
        self.due_amount
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn payment(&self, payment_id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id() == payment_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }

    pub fn pending_payments(&self) -> impl Iterator<Item = &Payment> {
        self.payments.iter().filter(|p| p.is_pending())
    }

    /// Balance reserved by payments that are still in flight.
    pub fn pending_payments_amount(&self) -> Money {
        self.pending_payments().map(Payment::amount).sum()
    }

    /// Register a new PENDING payment.
    ///
    /// The amount must fit in `due_amount` minus what pending payments already
    /// reserve, so two in-flight payments can never book the same balance.
    pub fn add_payment(
        &self,
        payment_id: PaymentId,
        amount_to_pay: Money,
        at: DateTime<Utc>,
    ) -> Result<(InvoiceEvent, Invoice), InvoiceError> {
        self.ensure_pending()?;

        let available = self.due_amount.saturating_sub(self.pending_payments_amount());
        if !amount_to_pay.is_positive() || amount_to_pay > available {
            return Err(InvoiceError::InvalidPaymentAmount {
                invoice_id: self.id.clone(),
                payment_id,
            });
        }

        let payment = Payment::of(payment_id, self.id.clone(), amount_to_pay, at);
        let mut payments = self.payments.clone();
        payments.push(payment);

        let invoice = Invoice {
            payments,
            updated_at: at,
            version: self.version + 1,
            ..self.clone()
        };

        let event = InvoiceEvent::PaymentAdded(PaymentAdded {
            invoice_id: self.id.clone(),
            payment_id,
            amount: amount_to_pay,
            version: invoice.version,
            occurred_at: at,
        });

        Ok((event, invoice))
    }

    /// Settle a pending payment.
    ///
    /// Emits `[PaymentSucceed]`, or `[PaymentSucceed, InvoicePaid]` when the
    /// payment covers the remaining balance (the due amount is clamped to 0).
    pub fn succeed_payment(
        &self,
        payment_id: PaymentId,
        at: DateTime<Utc>,
    ) -> Result<(Vec<InvoiceEvent>, Invoice), InvoiceError> {
        self.ensure_pending()?;

        let payment = self.find_payment(payment_id)?.succeed(at)?;
        let due_amount = self.due_amount.saturating_sub(payment.amount());
        let settled = due_amount.is_zero();

        let mut invoice = Invoice {
            payments: self.replace_payment(payment),
            due_amount,
            updated_at: at,
            version: self.version + 1,
            ..self.clone()
        };

        let mut events = vec![InvoiceEvent::PaymentSucceed(PaymentSucceed {
            invoice_id: self.id.clone(),
            payment_id,
            due_amount,
            version: invoice.version,
            occurred_at: at,
        })];

        if settled {
            invoice.status = InvoiceStatus::Paid;
            invoice.paid_at = Some(at);
            invoice.version += 1;

            events.push(InvoiceEvent::InvoicePaid(InvoicePaid {
                invoice_id: self.id.clone(),
                version: invoice.version,
                occurred_at: at,
            }));
        }

        Ok((events, invoice))
    }

    /// Mark a pending payment as failed, releasing the balance it reserved.
    ///
    /// Allowed whatever the invoice status: failing a payment never moves
    /// money, and late failure reports for cancelled invoices must still land.
    pub fn fail_payment(
        &self,
        payment_id: PaymentId,
        at: DateTime<Utc>,
    ) -> Result<(InvoiceEvent, Invoice), InvoiceError> {
        let payment = self.find_payment(payment_id)?.fail(at)?;

        let invoice = Invoice {
            payments: self.replace_payment(payment),
            updated_at: at,
            version: self.version + 1,
            ..self.clone()
        };

        let event = InvoiceEvent::PaymentFailed(PaymentFailed {
            invoice_id: self.id.clone(),
            payment_id,
            version: invoice.version,
            occurred_at: at,
        });

        Ok((event, invoice))
    }

    /// Cancel a PENDING invoice. Outstanding payments are left untouched.
    pub fn cancel(&self, at: DateTime<Utc>) -> Result<(InvoiceEvent, Invoice), InvoiceError> {
        self.ensure_pending()?;

        let invoice = Invoice {
            status: InvoiceStatus::Canceled,
            cancelled_at: Some(at),
            updated_at: at,
            version: self.version + 1,
            ..self.clone()
        };

        let event = InvoiceEvent::InvoiceCancelled(InvoiceCancelled {
            invoice_id: self.id.clone(),
            version: invoice.version,
            occurred_at: at,
        });

        Ok((event, invoice))
    }

    fn ensure_pending(&self) -> Result<(), InvoiceError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(InvoiceError::InvalidStatus {
                invoice_id: self.id.clone(),
            })
        }
    }

    fn find_payment(&self, payment_id: PaymentId) -> Result<&Payment, InvoiceError> {
        self.payment(payment_id)
            .ok_or_else(|| InvoiceError::PaymentNotFound {
                invoice_id: self.id.clone(),
                payment_id,
            })
    }

    fn replace_payment(&self, updated: Payment) -> Vec<Payment> {
        self.payments
            .iter()
            .map(|p| {
                if p.id() == updated.id() {
                    updated.clone()
                } else {
                    p.clone()
                }
            })
            .collect()
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl From<&Invoice> for InvoiceParts {
    fn from(value: &Invoice) -> Self {
        Self {
            id: value.id.clone(),
            student_id: value.student_id,
            school_id: value.school_id,
            initial_amount: value.initial_amount,
            due_amount: value.due_amount,
            due_date: value.due_date,
            status: value.status,
            payments: value.payments.clone(),
            created_at: value.created_at,
            updated_at: value.updated_at,
            paid_at: value.paid_at,
            cancelled_at: value.cancelled_at,
            version: value.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PaymentStatus;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn test_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn pending_invoice(amount: Money) -> Invoice {
        let (_, invoice) = Invoice::of(
            StudentId::new(),
            SchoolId::new(),
            amount,
            test_due_date(),
            test_time(),
        );
        invoice
    }

    fn with_payment(invoice: &Invoice, amount: Money) -> (PaymentId, Invoice) {
        let payment_id = PaymentId::new();
        let (_, invoice) = invoice
            .add_payment(payment_id, amount, test_time())
            .unwrap();
        (payment_id, invoice)
    }

    #[test]
    fn of_emits_created_event_and_starts_pending() {
        let student_id = StudentId::new();
        let school_id = SchoolId::new();
        let (event, invoice) = Invoice::of(
            student_id,
            school_id,
            Money::from_cents(10000),
            test_due_date(),
            test_time(),
        );

        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.due_amount(), invoice.initial_amount());
        assert_eq!(invoice.version(), 1);
        assert!(invoice.payments().is_empty());

        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                assert_eq!(&e.invoice_id, invoice.id());
                assert_eq!(e.school_id, school_id);
                assert_eq!(e.student_id, student_id);
                assert_eq!(e.amount, Money::from_cents(10000));
                assert_eq!(e.version, 1);
            }
            other => panic!("Expected InvoiceCreated event, got {other:?}"),
        }
    }

    #[test]
    fn id_is_derived_from_school_student_and_period() {
        let student_id = StudentId::new();
        let school_id = SchoolId::new();

        let (_, first) = Invoice::of(
            student_id,
            school_id,
            Money::from_cents(10000),
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            test_time(),
        );
        let (_, second) = Invoice::of(
            student_id,
            school_id,
            Money::from_cents(999),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            test_time() + Duration::days(3),
        );

        assert_eq!(first.id(), second.id());
        assert_eq!(
            first.id().as_str(),
            format!("school:{school_id}/student:{student_id}/period:2025-6")
        );
    }

    #[test]
    fn admission_control_reserves_pending_payments() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (_, invoice) = with_payment(&invoice, Money::from_cents(6000));

        let rejected_id = PaymentId::new();
        let err = invoice
            .add_payment(rejected_id, Money::from_cents(5000), test_time())
            .unwrap_err();
        match err {
            InvoiceError::InvalidPaymentAmount { payment_id, .. } if payment_id == rejected_id => {}
            other => panic!("Expected InvalidPaymentAmount, got {other:?}"),
        }

        let (event, updated) = invoice
            .add_payment(PaymentId::new(), Money::from_cents(4000), test_time())
            .unwrap();
        assert!(matches!(event, InvoiceEvent::PaymentAdded(_)));
        assert_eq!(updated.payments().len(), 2);
        assert_eq!(updated.pending_payments_amount(), Money::from_cents(10000));
        assert_eq!(updated.due_amount(), Money::from_cents(10000));
        assert_eq!(updated.status(), InvoiceStatus::Pending);
    }

    #[test]
    fn failed_payment_releases_reserved_balance() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (payment_id, invoice) = with_payment(&invoice, Money::from_cents(10000));

        let (event, invoice) = invoice.fail_payment(payment_id, test_time()).unwrap();
        match event {
            InvoiceEvent::PaymentFailed(e) => assert_eq!(e.payment_id, payment_id),
            other => panic!("Expected PaymentFailed event, got {other:?}"),
        }
        assert_eq!(invoice.pending_payments_amount(), Money::zero());
        assert_eq!(invoice.due_amount(), Money::from_cents(10000));

        assert!(
            invoice
                .add_payment(PaymentId::new(), Money::from_cents(10000), test_time())
                .is_ok()
        );
    }

    #[test]
    fn zero_amount_payment_is_rejected() {
        let invoice = pending_invoice(Money::from_cents(10000));
        match invoice.add_payment(PaymentId::new(), Money::zero(), test_time()) {
            Err(InvoiceError::InvalidPaymentAmount { .. }) => {}
            other => panic!("Expected InvalidPaymentAmount, got {other:?}"),
        }
    }

    #[test]
    fn full_settlement_pays_invoice_and_emits_two_events_in_order() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (payment_id, invoice) = with_payment(&invoice, Money::from_cents(10000));
        let at = test_time() + Duration::hours(1);

        let (events, paid) = invoice.succeed_payment(payment_id, at).unwrap();

        assert_eq!(paid.status(), InvoiceStatus::Paid);
        assert_eq!(paid.due_amount(), Money::zero());
        assert_eq!(paid.paid_at(), Some(at));
        assert_eq!(paid.version(), invoice.version() + 2);

        assert_eq!(events.len(), 2);
        match (&events[0], &events[1]) {
            (InvoiceEvent::PaymentSucceed(succeed), InvoiceEvent::InvoicePaid(invoice_paid)) => {
                assert_eq!(succeed.due_amount, Money::zero());
                assert_eq!(succeed.version, invoice.version() + 1);
                assert_eq!(invoice_paid.version, invoice.version() + 2);
            }
            other => panic!("Expected [PaymentSucceed, InvoicePaid], got {other:?}"),
        }
    }

    #[test]
    fn partial_settlement_reduces_due_amount() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (payment_id, invoice) = with_payment(&invoice, Money::from_cents(4000));

        let (events, updated) = invoice.succeed_payment(payment_id, test_time()).unwrap();

        assert_eq!(updated.status(), InvoiceStatus::Pending);
        assert_eq!(updated.due_amount(), Money::from_cents(6000));
        assert_eq!(updated.paid_at(), None);
        assert_eq!(events.len(), 1);
        match &events[0] {
            InvoiceEvent::PaymentSucceed(e) => assert_eq!(e.due_amount, Money::from_cents(6000)),
            other => panic!("Expected PaymentSucceed, got {other:?}"),
        }
    }

    #[test]
    fn succeeded_payment_is_replaced_in_place() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (first, invoice) = with_payment(&invoice, Money::from_cents(3000));
        let (second, invoice) = with_payment(&invoice, Money::from_cents(3000));

        let (_, updated) = invoice.succeed_payment(first, test_time()).unwrap();

        let ids: Vec<_> = updated.payments().iter().map(Payment::id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(updated.payments()[0].status(), PaymentStatus::Succeed);
        assert_eq!(updated.payments()[1].status(), PaymentStatus::Pending);
    }

    #[test]
    fn succeed_unknown_payment_fails_with_not_found() {
        let invoice = pending_invoice(Money::from_cents(10000));
        match invoice.succeed_payment(PaymentId::new(), test_time()) {
            Err(InvoiceError::PaymentNotFound { .. }) => {}
            other => panic!("Expected PaymentNotFound, got {other:?}"),
        }
        match invoice.fail_payment(PaymentId::new(), test_time()) {
            Err(InvoiceError::PaymentNotFound { .. }) => {}
            other => panic!("Expected PaymentNotFound, got {other:?}"),
        }
    }

    #[test]
    fn succeeding_twice_fails_with_payment_invalid_status() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (payment_id, invoice) = with_payment(&invoice, Money::from_cents(1000));
        let (_, invoice) = invoice.succeed_payment(payment_id, test_time()).unwrap();

        match invoice.succeed_payment(payment_id, test_time()) {
            Err(InvoiceError::PaymentInvalidStatus { .. }) => {}
            other => panic!("Expected PaymentInvalidStatus, got {other:?}"),
        }
    }

    #[test]
    fn terminal_invoices_reject_mutations() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (payment_id, pending) = with_payment(&invoice, Money::from_cents(10000));
        let (_, paid) = pending.succeed_payment(payment_id, test_time()).unwrap();
        let (_, cancelled) = invoice.cancel(test_time()).unwrap();

        for terminal in [paid, cancelled] {
            let snapshot = terminal.clone();
            let results = [
                terminal.cancel(test_time()).map(|_| ()),
                terminal
                    .add_payment(PaymentId::new(), Money::from_cents(100), test_time())
                    .map(|_| ()),
                terminal.succeed_payment(payment_id, test_time()).map(|_| ()),
            ];
            for result in results {
                match result {
                    Err(InvoiceError::InvalidStatus { .. }) => {}
                    other => panic!("Expected InvalidStatus, got {other:?}"),
                }
            }
            assert_eq!(terminal, snapshot);
        }
    }

    #[test]
    fn cancel_sets_cancelled_at_and_keeps_payments() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (payment_id, invoice) = with_payment(&invoice, Money::from_cents(2000));
        let at = test_time() + Duration::days(1);

        let (event, cancelled) = invoice.cancel(at).unwrap();

        assert!(matches!(event, InvoiceEvent::InvoiceCancelled(_)));
        assert_eq!(cancelled.status(), InvoiceStatus::Canceled);
        assert_eq!(cancelled.cancelled_at(), Some(at));
        assert!(cancelled.payment(payment_id).is_some_and(Payment::is_pending));
    }

    #[test]
    fn payment_of_cancelled_invoice_can_still_fail() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (payment_id, invoice) = with_payment(&invoice, Money::from_cents(2000));
        let (_, cancelled) = invoice.cancel(test_time()).unwrap();

        let (_, updated) = cancelled.fail_payment(payment_id, test_time()).unwrap();
        assert_eq!(updated.status(), InvoiceStatus::Canceled);
        assert_eq!(
            updated.payment(payment_id).map(Payment::status),
            Some(PaymentStatus::Failed)
        );
    }

    #[test]
    fn rehydrate_round_trips_and_rejects_broken_state() {
        let invoice = pending_invoice(Money::from_cents(10000));
        let (_, invoice) = with_payment(&invoice, Money::from_cents(2000));

        let parts = InvoiceParts::from(&invoice);
        assert_eq!(Invoice::rehydrate(parts.clone()).unwrap(), invoice);

        let mut broken = parts;
        broken.status = InvoiceStatus::Paid;
        assert!(Invoice::rehydrate(broken).is_err());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u64),
        Succeed(usize),
        Fail(usize),
        Cancel,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (1u64..6_000).prop_map(Op::Add),
            3 => (0usize..8).prop_map(Op::Succeed),
            2 => (0usize..8).prop_map(Op::Fail),
            1 => Just(Op::Cancel),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn invariants_hold_for_any_operation_sequence(
            initial in 1u64..20_000,
            ops in proptest::collection::vec(op_strategy(), 0..24),
        ) {
            let mut invoice = pending_invoice(Money::from_cents(initial));
            let mut version = invoice.version();

            for op in ops {
                let payment_at = |index: usize, invoice: &Invoice| {
                    let payments = invoice.payments();
                    if payments.is_empty() { None } else { Some(payments[index % payments.len()].id()) }
                };

                let next = match op {
                    Op::Add(cents) => invoice
                        .add_payment(PaymentId::new(), Money::from_cents(cents), test_time())
                        .map(|(_, i)| i)
                        .ok(),
                    Op::Succeed(index) => payment_at(index, &invoice)
                        .and_then(|id| invoice.succeed_payment(id, test_time()).ok())
                        .map(|(_, i)| i),
                    Op::Fail(index) => payment_at(index, &invoice)
                        .and_then(|id| invoice.fail_payment(id, test_time()).ok())
                        .map(|(_, i)| i),
                    Op::Cancel => invoice.cancel(test_time()).map(|(_, i)| i).ok(),
                };

                if let Some(next) = next {
                    prop_assert!(next.version() > version);
                    if !invoice.is_pending() {
                        prop_assert_eq!(next.status(), invoice.status());
                    }
                    version = next.version();
                    invoice = next;
                }

                prop_assert!(invoice.due_amount() <= invoice.initial_amount());
                prop_assert!(invoice.pending_payments_amount() <= invoice.due_amount()
                    || !invoice.is_pending());
                prop_assert_eq!(invoice.paid_at().is_some(), invoice.status() == InvoiceStatus::Paid);
                prop_assert_eq!(
                    invoice.cancelled_at().is_some(),
                    invoice.status() == InvoiceStatus::Canceled
                );

                for payment in invoice.payments() {
                    let stamps = (payment.succeed_at().is_some(), payment.failed_at().is_some());
                    let expected = match payment.status() {
                        PaymentStatus::Pending => (false, false),
                        PaymentStatus::Succeed => (true, false),
                        PaymentStatus::Failed => (false, true),
                    };
                    prop_assert_eq!(stamps, expected);
                }
            }
        }
    }
}
