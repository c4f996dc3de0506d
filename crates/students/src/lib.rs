//! Students domain module.
//!
//! Registration data of the students billed by schools, and their
//! active/inactive lifecycle. Pure domain logic.

pub mod student;

pub use student::{Identity, IdentityKind, Student, StudentChanges, StudentError, StudentStatus};
