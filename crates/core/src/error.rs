//! Error model.
//!
//! Three tiers, mirrored at the HTTP boundary:
//!
//! - [`BusinessError`]: a domain rule rejected the operation (caller can fix it).
//! - [`ApplicationError`]: a resource is missing, duplicated or was modified
//!   concurrently.
//! - [`TechnicalError`]: infrastructure failed; carries the underlying cause.
//!
//! [`DomainError`] covers value-level validation (malformed ids, negative
//! amounts) and is folded into the business tier.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Result type used by value constructors.
pub type DomainResult<T> = Result<T, DomainError>;

/// Structured diagnostic attributes (ids involved, etc.).
pub type Attributes = BTreeMap<String, String>;

/// Build an [`Attributes`] map from key/value pairs.
pub fn attributes<K, V, I>(pairs: I) -> Attributes
where
    K: Into<String>,
    V: ToString,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect()
}

/// Value-level validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// A domain rule violation with a stable code.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{code}: {message}")]
pub struct BusinessError {
    pub code: &'static str,
    pub message: String,
    pub attributes: Attributes,
}

impl BusinessError {
    pub fn new(code: &'static str, message: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            code,
            message: message.into(),
            attributes,
        }
    }
}

impl From<DomainError> for BusinessError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => {
                BusinessError::new("ValidationError", msg, Attributes::new())
            }
            DomainError::InvalidId(msg) => {
                BusinessError::new("InvalidIdentifierError", msg, Attributes::new())
            }
        }
    }
}

/// Resource-level failures raised by use cases and repositories.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("The resource {resource} was not found")]
    NotFound {
        resource: &'static str,
        attributes: Attributes,
    },

    #[error("The resource {resource} already exists")]
    AlreadyExists {
        resource: &'static str,
        attributes: Attributes,
    },

    /// Optimistic concurrency check failed: the stored version moved on.
    #[error("The resource {resource} was modified concurrently")]
    Conflict {
        resource: &'static str,
        attributes: Attributes,
    },
}

impl ApplicationError {
    pub fn not_found(resource: &'static str, attributes: Attributes) -> Self {
        Self::NotFound {
            resource,
            attributes,
        }
    }

    pub fn already_exists(resource: &'static str, attributes: Attributes) -> Self {
        Self::AlreadyExists {
            resource,
            attributes,
        }
    }

    pub fn conflict(resource: &'static str, attributes: Attributes) -> Self {
        Self::Conflict {
            resource,
            attributes,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "ResourceNotFoundError",
            Self::AlreadyExists { .. } => "ResourceAlreadyExistsError",
            Self::Conflict { .. } => "ConcurrencyConflictError",
        }
    }

    /// Attributes enriched with the `resource` name.
    pub fn attributes(&self) -> Attributes {
        let (resource, attributes) = match self {
            Self::NotFound {
                resource,
                attributes,
            }
            | Self::AlreadyExists {
                resource,
                attributes,
            }
            | Self::Conflict {
                resource,
                attributes,
            } => (resource, attributes),
        };
        let mut out = attributes.clone();
        out.insert("resource".to_string(), (*resource).to_string());
        out
    }
}

/// Infrastructure failure, preserving the original cause.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct TechnicalError {
    pub code: &'static str,
    pub message: String,
    pub attributes: Attributes,
    #[source]
    pub cause: anyhow::Error,
}

impl TechnicalError {
    pub fn new(
        code: &'static str,
        message: impl Into<String>,
        attributes: Attributes,
        cause: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            attributes,
            cause: cause.into(),
        }
    }
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Business,
    NotFound,
    AlreadyExists,
    Conflict,
    Technical,
}

/// Umbrella error returned by repositories, use cases and jobs.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Technical(#[from] TechnicalError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Business(_) => ErrorKind::Business,
            Error::Application(ApplicationError::NotFound { .. }) => ErrorKind::NotFound,
            Error::Application(ApplicationError::AlreadyExists { .. }) => ErrorKind::AlreadyExists,
            Error::Application(ApplicationError::Conflict { .. }) => ErrorKind::Conflict,
            Error::Technical(_) => ErrorKind::Technical,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Business(e) => e.code,
            Error::Application(e) => e.code(),
            Error::Technical(e) => e.code,
        }
    }

    /// Human readable message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Business(e) => e.message.clone(),
            Error::Application(e) => e.to_string(),
            Error::Technical(e) => e.message.clone(),
        }
    }

    pub fn attributes(&self) -> Attributes {
        match self {
            Error::Business(e) => e.attributes.clone(),
            Error::Application(e) => e.attributes(),
            Error::Technical(e) => e.attributes.clone(),
        }
    }
}

impl From<DomainError> for Error {
    fn from(value: DomainError) -> Self {
        Error::Business(value.into())
    }
}
