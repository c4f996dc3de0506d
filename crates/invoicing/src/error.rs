//! Invoice business errors.

use schoolbill_core::{Attributes, BusinessError, PaymentId, SchoolId, StudentId, attributes};
use thiserror::Error;

use crate::invoice::InvoiceId;

/// Domain rule violations raised by invoice and payment operations.
///
/// Each variant maps to a stable code (see [`InvoiceError::code`]) and the ids
/// involved are exposed as structured attributes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    #[error("Invalid status for invoice")]
    InvalidStatus { invoice_id: InvoiceId },

    #[error("Invalid status for payment")]
    PaymentInvalidStatus {
        invoice_id: InvoiceId,
        payment_id: PaymentId,
    },

    #[error("Payment not found in invoice")]
    PaymentNotFound {
        invoice_id: InvoiceId,
        payment_id: PaymentId,
    },

    #[error("Payment amount surpasses invoice amount")]
    InvalidPaymentAmount {
        invoice_id: InvoiceId,
        payment_id: PaymentId,
    },

    #[error("Some of the parties for the invoice are not active")]
    InvalidParties {
        school_id: SchoolId,
        student_id: StudentId,
    },
}

impl InvoiceError {
    pub fn code(&self) -> &'static str {
        match self {
            InvoiceError::InvalidStatus { .. } => "InvoiceInvalidStatusError",
            InvoiceError::PaymentInvalidStatus { .. } => "PaymentInvalidStatusError",
            InvoiceError::PaymentNotFound { .. } => "PaymentNotFoundError",
            InvoiceError::InvalidPaymentAmount { .. } => "InvalidPaymentAmountError",
            InvoiceError::InvalidParties { .. } => "InvalidInvoicePartiesError",
        }
    }

    pub fn attributes(&self) -> Attributes {
        match self {
            InvoiceError::InvalidStatus { invoice_id } => {
                attributes([("invoice_id", invoice_id.to_string())])
            }
            InvoiceError::PaymentInvalidStatus {
                invoice_id,
                payment_id,
            }
            | InvoiceError::PaymentNotFound {
                invoice_id,
                payment_id,
            }
            | InvoiceError::InvalidPaymentAmount {
                invoice_id,
                payment_id,
            } => attributes([
                ("invoice_id", invoice_id.to_string()),
                ("payment_id", payment_id.to_string()),
            ]),
            InvoiceError::InvalidParties {
                school_id,
                student_id,
            } => attributes([
                ("school_id", school_id.to_string()),
                ("student_id", student_id.to_string()),
            ]),
        }
    }
}

impl From<InvoiceError> for BusinessError {
    fn from(value: InvoiceError) -> Self {
        BusinessError::new(value.code(), value.to_string(), value.attributes())
    }
}

impl From<InvoiceError> for schoolbill_core::Error {
    fn from(value: InvoiceError) -> Self {
        schoolbill_core::Error::Business(value.into())
    }
}
