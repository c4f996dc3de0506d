use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolbill_core::{DomainError, DomainResult, Entity, Money, PaymentId};

use crate::error::InvoiceError;
use crate::invoice::InvoiceId;

/// Payment status lifecycle. `Succeed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Succeed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Succeed => "SUCCEED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl core::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCEED" => Ok(PaymentStatus::Succeed),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// One payment attempt against an invoice.
///
/// Immutable: state changes return a new value which the owning invoice
/// substitutes in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    id: PaymentId,
    invoice_id: InvoiceId,
    amount: Money,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    failed_at: Option<DateTime<Utc>>,
    succeed_at: Option<DateTime<Utc>>,
}

/// Raw payment state, as loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentParts {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub failed_at: Option<DateTime<Utc>>,
    pub succeed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// A new PENDING payment. The amount is validated by the invoice.
    pub fn of(id: PaymentId, invoice_id: InvoiceId, amount: Money, at: DateTime<Utc>) -> Self {
        Self {
            id,
            invoice_id,
            amount,
            status: PaymentStatus::Pending,
            created_at: at,
            updated_at: at,
            failed_at: None,
            succeed_at: None,
        }
    }

    /// Rebuild a payment from stored parts, rejecting inconsistent timestamps.
    pub fn rehydrate(parts: PaymentParts) -> DomainResult<Self> {
        let consistent = match parts.status {
            PaymentStatus::Pending => parts.failed_at.is_none() && parts.succeed_at.is_none(),
            PaymentStatus::Succeed => parts.failed_at.is_none() && parts.succeed_at.is_some(),
            PaymentStatus::Failed => parts.failed_at.is_some() && parts.succeed_at.is_none(),
        };
        if !consistent {
            return Err(DomainError::validation(format!(
                "payment {} has timestamps inconsistent with status {}",
                parts.id,
                parts.status.as_str()
            )));
        }

        Ok(Self {
            id: parts.id,
            invoice_id: parts.invoice_id,
            amount: parts.amount,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            failed_at: parts.failed_at,
            succeed_at: parts.succeed_at,
        })
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn invoice_id(&self) -> &InvoiceId {
        &self.invoice_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    pub fn succeed_at(&self) -> Option<DateTime<Utc>> {
        self.succeed_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn succeed(&self, at: DateTime<Utc>) -> Result<Payment, InvoiceError> {
        self.ensure_pending()?;
        Ok(Payment {
            status: PaymentStatus::Succeed,
            succeed_at: Some(at),
            updated_at: at,
            ..self.clone()
        })
    }

    pub fn fail(&self, at: DateTime<Utc>) -> Result<Payment, InvoiceError> {
        self.ensure_pending()?;
        Ok(Payment {
            status: PaymentStatus::Failed,
            failed_at: Some(at),
            updated_at: at,
            ..self.clone()
        })
    }

    fn ensure_pending(&self) -> Result<(), InvoiceError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(InvoiceError::PaymentInvalidStatus {
                invoice_id: self.invoice_id.clone(),
                payment_id: self.id,
            })
        }
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl From<&Payment> for PaymentParts {
    fn from(value: &Payment) -> Self {
        Self {
            id: value.id,
            invoice_id: value.invoice_id.clone(),
            amount: value.amount,
            status: value.status,
            created_at: value.created_at,
            updated_at: value.updated_at,
            failed_at: value.failed_at,
            succeed_at: value.succeed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn pending_payment() -> Payment {
        Payment::of(
            PaymentId::new(),
            InvoiceId::from("school:a/student:b/period:2025-6"),
            Money::from_cents(4000),
            test_time(),
        )
    }

    #[test]
    fn new_payment_is_pending_without_terminal_timestamps() {
        let payment = pending_payment();
        assert!(payment.is_pending());
        assert_eq!(payment.failed_at(), None);
        assert_eq!(payment.succeed_at(), None);
    }

    #[test]
    fn succeed_sets_succeed_at_and_updated_at() {
        let at = test_time() + Duration::minutes(5);
        let payment = pending_payment().succeed(at).unwrap();
        assert_eq!(payment.status(), PaymentStatus::Succeed);
        assert_eq!(payment.succeed_at(), Some(at));
        assert_eq!(payment.updated_at(), at);
        assert_eq!(payment.failed_at(), None);
    }

    #[test]
    fn fail_sets_failed_at() {
        let at = test_time() + Duration::minutes(5);
        let payment = pending_payment().fail(at).unwrap();
        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert_eq!(payment.failed_at(), Some(at));
        assert_eq!(payment.succeed_at(), None);
    }

    #[test]
    fn terminal_payments_reject_further_transitions() {
        let succeeded = pending_payment().succeed(test_time()).unwrap();
        let failed = pending_payment().fail(test_time()).unwrap();

        for terminal in [succeeded, failed] {
            for result in [terminal.succeed(test_time()), terminal.fail(test_time())] {
                match result {
                    Err(InvoiceError::PaymentInvalidStatus { payment_id, .. })
                        if payment_id == terminal.id() => {}
                    other => panic!("expected PaymentInvalidStatus, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn rehydrate_rejects_inconsistent_timestamps() {
        let mut parts = PaymentParts::from(&pending_payment());
        parts.status = PaymentStatus::Succeed;
        assert!(Payment::rehydrate(parts.clone()).is_err());

        parts.succeed_at = Some(test_time());
        assert!(Payment::rehydrate(parts).is_ok());
    }
}
