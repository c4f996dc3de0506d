//! Invoice domain events.
//!
//! Each event carries the invoice id, the aggregate version it produces and
//! the business time it happened at. Persistence adapters apply an event only
//! on top of `version - 1`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use schoolbill_core::{Money, PaymentId, SchoolId, StudentId};
use schoolbill_events::Event;

use crate::invoice::InvoiceId;

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub invoice_id: InvoiceId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub invoice_id: InvoiceId,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub invoice_id: InvoiceId,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAdded {
    pub invoice_id: InvoiceId,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentSucceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSucceed {
    pub invoice_id: InvoiceId,
    pub payment_id: PaymentId,
    /// Invoice balance after this payment.
    pub due_amount: Money,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub invoice_id: InvoiceId,
    pub payment_id: PaymentId,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoicePaid(InvoicePaid),
    InvoiceCancelled(InvoiceCancelled),
    PaymentAdded(PaymentAdded),
    PaymentSucceed(PaymentSucceed),
    PaymentFailed(PaymentFailed),
}

impl InvoiceEvent {
    pub fn invoice_id(&self) -> &InvoiceId {
        match self {
            InvoiceEvent::InvoiceCreated(e) => &e.invoice_id,
            InvoiceEvent::InvoicePaid(e) => &e.invoice_id,
            InvoiceEvent::InvoiceCancelled(e) => &e.invoice_id,
            InvoiceEvent::PaymentAdded(e) => &e.invoice_id,
            InvoiceEvent::PaymentSucceed(e) => &e.invoice_id,
            InvoiceEvent::PaymentFailed(e) => &e.invoice_id,
        }
    }

    /// Aggregate version produced by this event.
    pub fn version(&self) -> u64 {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.version,
            InvoiceEvent::InvoicePaid(e) => e.version,
            InvoiceEvent::InvoiceCancelled(e) => e.version,
            InvoiceEvent::PaymentAdded(e) => e.version,
            InvoiceEvent::PaymentSucceed(e) => e.version,
            InvoiceEvent::PaymentFailed(e) => e.version,
        }
    }
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoice.created",
            InvoiceEvent::InvoicePaid(_) => "invoice.paid",
            InvoiceEvent::InvoiceCancelled(_) => "invoice.cancelled",
            InvoiceEvent::PaymentAdded(_) => "invoice.payment_added",
            InvoiceEvent::PaymentSucceed(_) => "invoice.payment_succeed",
            InvoiceEvent::PaymentFailed(_) => "invoice.payment_failed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoicePaid(e) => e.occurred_at,
            InvoiceEvent::InvoiceCancelled(e) => e.occurred_at,
            InvoiceEvent::PaymentAdded(e) => e.occurred_at,
            InvoiceEvent::PaymentSucceed(e) => e.occurred_at,
            InvoiceEvent::PaymentFailed(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn exposes_invoice_id_version_and_type() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let event = InvoiceEvent::PaymentFailed(PaymentFailed {
            invoice_id: InvoiceId::from("school:a/student:b/period:2025-6"),
            payment_id: PaymentId::new(),
            version: 4,
            occurred_at: at,
        });

        assert_eq!(event.invoice_id().as_str(), "school:a/student:b/period:2025-6");
        assert_eq!(event.version(), 4);
        assert_eq!(event.event_type(), "invoice.payment_failed");
        assert_eq!(event.occurred_at(), at);
    }

    #[test]
    fn serializes_with_variant_tag() {
        let event = InvoiceEvent::InvoicePaid(InvoicePaid {
            invoice_id: InvoiceId::from("inv"),
            version: 3,
            occurred_at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["InvoicePaid"]["version"], 3);
        let back: InvoiceEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
