//! Schools domain module.
//!
//! Schools, their lifecycle, and the enrollments that entitle a school to
//! bill a student a monthly fee. Pure domain logic.

pub mod enrollment;
pub mod error;
pub mod school;

pub use enrollment::{ActiveEnrollmentProjection, Enrollment, EnrollmentId};
pub use error::SchoolError;
pub use school::{School, SchoolChanges, SchoolStatus};
