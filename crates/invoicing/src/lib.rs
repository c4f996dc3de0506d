//! Invoicing domain module.
//!
//! Business rules for invoices and the payments recorded against them,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Every mutation returns the events it produced together with the
//! next immutable snapshot; persistence adapters apply those events one by one.

pub mod error;
pub mod events;
pub mod invoice;
pub mod payment;

pub use error::InvoiceError;
pub use events::{
    InvoiceCancelled, InvoiceCreated, InvoiceEvent, InvoicePaid, PaymentAdded, PaymentFailed,
    PaymentSucceed,
};
pub use invoice::{Invoice, InvoiceId, InvoiceParts, InvoiceStatus};
pub use payment::{Payment, PaymentParts, PaymentStatus};
