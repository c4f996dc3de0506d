use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use schoolbill_core::{
    BusinessError, Contact, DomainError, DomainResult, StudentId, ValueObject, attributes,
};

/// Kind of official identity document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityKind {
    Curp,
    Passport,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::Curp => "CURP",
            IdentityKind::Passport => "PASSPORT",
        }
    }
}

impl core::str::FromStr for IdentityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CURP" => Ok(IdentityKind::Curp),
            "PASSPORT" => Ok(IdentityKind::Passport),
            other => Err(DomainError::validation(format!(
                "unknown identity kind: {other}"
            ))),
        }
    }
}

/// Identity document; unique per student.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub kind: IdentityKind,
    pub code: String,
}

impl Identity {
    pub fn new(kind: IdentityKind, code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into().trim().to_uppercase();
        if code.is_empty() {
            return Err(DomainError::validation("identity code must not be empty"));
        }
        Ok(Self { kind, code })
    }
}

impl ValueObject for Identity {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "ACTIVE",
            StudentStatus::Inactive => "INACTIVE",
        }
    }
}

impl core::str::FromStr for StudentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(StudentStatus::Active),
            "INACTIVE" => Ok(StudentStatus::Inactive),
            other => Err(DomainError::validation(format!(
                "unknown student status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StudentError {
    #[error("Invalid status for student {student_id}")]
    InvalidStatus { student_id: StudentId },
}

impl StudentError {
    pub fn code(&self) -> &'static str {
        match self {
            StudentError::InvalidStatus { .. } => "StudentInvalidStatusError",
        }
    }
}

impl From<StudentError> for BusinessError {
    fn from(value: StudentError) -> Self {
        let attrs = match &value {
            StudentError::InvalidStatus { student_id } => {
                attributes([("student_id", student_id.to_string())])
            }
        };
        BusinessError::new(value.code(), value.to_string(), attrs)
    }
}

impl From<StudentError> for schoolbill_core::Error {
    fn from(value: StudentError) -> Self {
        schoolbill_core::Error::Business(value.into())
    }
}

/// A student that schools can enroll and bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub contact: Contact,
    pub identity: Identity,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u8>,
    pub contact: Option<Contact>,
}

impl Student {
    /// Register an ACTIVE student.
    pub fn of(
        id: StudentId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        age: u8,
        contact: Contact,
        identity: Identity,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            first_name: non_empty("first_name", first_name.into())?,
            last_name: non_empty("last_name", last_name.into())?,
            age,
            contact,
            identity,
            status: StudentStatus::Active,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }

    pub fn update(self, changes: StudentChanges, at: DateTime<Utc>) -> DomainResult<Self> {
        let first_name = match changes.first_name {
            Some(name) => non_empty("first_name", name)?,
            None => self.first_name,
        };
        let last_name = match changes.last_name {
            Some(name) => non_empty("last_name", name)?,
            None => self.last_name,
        };

        Ok(Self {
            first_name,
            last_name,
            age: changes.age.unwrap_or(self.age),
            contact: changes.contact.unwrap_or(self.contact),
            updated_at: at,
            ..self
        })
    }

    pub fn deactivate(self, at: DateTime<Utc>) -> Result<Self, StudentError> {
        if !self.is_active() {
            return Err(StudentError::InvalidStatus {
                student_id: self.id,
            });
        }

        Ok(Self {
            status: StudentStatus::Inactive,
            updated_at: at,
            ..self
        })
    }
}

fn non_empty(field: &str, value: String) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolbill_core::ContactId;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_contact() -> Contact {
        Contact::new(
            ContactId::new(),
            "ana@mail.mx",
            "+525511112222",
            "Calle Luna 12",
        )
        .unwrap()
    }

    fn test_student() -> Student {
        Student::of(
            StudentId::new(),
            "Ana",
            "López",
            12,
            test_contact(),
            Identity::new(IdentityKind::Curp, "lopa130101mdfxxx01").unwrap(),
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn registers_active_student_with_normalised_identity() {
        let student = test_student();
        assert!(student.is_active());
        assert_eq!(student.identity.code, "LOPA130101MDFXXX01");
    }

    #[test]
    fn rejects_blank_names() {
        let result = Student::of(
            StudentId::new(),
            "  ",
            "López",
            12,
            test_contact(),
            Identity::new(IdentityKind::Passport, "G123").unwrap(),
            test_time(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn update_keeps_unchanged_fields() {
        let student = test_student();
        let updated = student
            .clone()
            .update(
                StudentChanges {
                    age: Some(13),
                    ..StudentChanges::default()
                },
                test_time(),
            )
            .unwrap();
        assert_eq!(updated.age, 13);
        assert_eq!(updated.first_name, student.first_name);
        assert_eq!(updated.contact, student.contact);
    }

    #[test]
    fn deactivate_twice_fails_with_invalid_status() {
        let student = test_student();
        let id = student.id;
        let inactive = student.deactivate(test_time()).unwrap();
        assert!(!inactive.is_active());

        match inactive.deactivate(test_time()) {
            Err(StudentError::InvalidStatus { student_id }) if student_id == id => {}
            other => panic!("expected InvalidStatus, got {other:?}"),
        }
    }

    #[test]
    fn converts_into_business_error_with_code() {
        let id = StudentId::new();
        let err: BusinessError = StudentError::InvalidStatus { student_id: id }.into();
        assert_eq!(err.code, "StudentInvalidStatusError");
        assert_eq!(err.attributes.get("student_id"), Some(&id.to_string()));
    }
}
