//! In-memory adapters for tests and local runs.
//!
//! They keep the same records the Postgres adapters persist and enforce the
//! same uniqueness and version rules.

mod enrollments;
mod invoices;
mod jobs;
mod schools;
mod students;

pub use enrollments::InMemoryEnrollmentRepository;
pub use invoices::InMemoryInvoiceRepository;
pub use jobs::InMemoryJobRepository;
pub use schools::InMemorySchoolRepository;
pub use students::InMemoryStudentRepository;

use schoolbill_core::{Attributes, Error};

use crate::repository::technical;

pub(crate) fn poisoned(code: &'static str) -> Error {
    technical(
        code,
        "In-memory store lock poisoned",
        Attributes::new(),
        anyhow::anyhow!("lock poisoned"),
    )
}
