//! `schoolbill-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, contact details, the aggregate/version contract and the
//! error taxonomy shared by every other crate.

pub mod aggregate;
pub mod contact;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion, VersionMismatch};
pub use contact::Contact;
pub use entity::Entity;
pub use error::{
    ApplicationError, Attributes, BusinessError, DomainError, DomainResult, Error, ErrorKind,
    TechnicalError, attributes,
};
pub use id::{ContactId, JobId, PaymentId, SchoolId, StudentId};
pub use money::Money;
pub use value_object::ValueObject;
