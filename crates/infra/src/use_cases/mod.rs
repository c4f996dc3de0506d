//! Application use cases.
//!
//! Each use case loads what it needs through the repository ports, calls the
//! pure domain operation and persists the outcome. Business rejections are
//! logged before being returned.

pub mod enrollments;
pub mod invoices;
pub mod schools;
pub mod students;

use serde::Deserialize;

use schoolbill_core::{Contact, ContactId, DomainResult, Error};

pub use enrollments::{
    AdjustEnrollmentFee, AdjustEnrollmentFeeRequest, DropEnrollment, DropEnrollmentRequest,
    EnrollStudentToSchool, EnrollStudentToSchoolRequest, EnrollmentQueryHandler,
};
pub use invoices::{
    AddInvoicePayment, AddInvoicePaymentRequest, CancelInvoice, CreateInvoice,
    CreateInvoiceRequest, FailInvoicePayment, InvoicePaymentRequest, InvoiceQueryHandler,
    SucceedInvoicePayment,
};
pub use schools::{
    DropSchool, RegisterSchool, RegisterSchoolRequest, SchoolQueryHandler, UpdateSchool,
    UpdateSchoolRequest,
};
pub use students::{
    DROP_STUDENT_TOPIC, DropStudent, RegisterStudent, RegisterStudentRequest, StudentDropped,
    StudentQueryHandler, UpdateStudent, UpdateStudentRequest,
};

/// Raw contact fields as received from callers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl ContactDetails {
    pub fn into_contact(self, id: ContactId) -> DomainResult<Contact> {
        Contact::new(id, self.email, self.phone, self.address)
    }
}

pub(crate) fn rejected(error: impl Into<Error>) -> Error {
    let error = error.into();
    tracing::error!(
        code = error.code(),
        attributes = ?error.attributes(),
        "{}",
        error.message()
    );
    error
}
