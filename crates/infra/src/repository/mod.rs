//! Repository ports.
//!
//! Use cases depend on these traits only; `in_memory` and `postgres` provide
//! the adapters.

mod enrollments;
mod invoices;
mod jobs;
mod schools;
mod students;

pub use enrollments::{DEFAULT_PAGE_SIZE, EnrollmentPage, EnrollmentRepository, EnrollmentsQuery, active_enrollments};
pub use invoices::{AccountStatement, InvoiceProjection, InvoiceQuery, InvoiceRepository, InvoicesQuery};
pub use jobs::JobRepository;
pub use schools::{SchoolQuery, SchoolRepository, SchoolsQuery};
pub use students::{StudentQuery, StudentRepository};

use schoolbill_core::{Attributes, Error, TechnicalError};

/// Wrap an adapter failure into a logged [`TechnicalError`].
pub(crate) fn technical(
    code: &'static str,
    message: impl Into<String>,
    attributes: Attributes,
    cause: impl Into<anyhow::Error>,
) -> Error {
    let error = TechnicalError::new(code, message, attributes, cause);
    tracing::error!(
        code = error.code,
        attributes = ?error.attributes,
        cause = %error.cause,
        "{}",
        error.message
    );
    Error::Technical(error)
}
