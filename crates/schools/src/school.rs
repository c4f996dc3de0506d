use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolbill_core::{Contact, DomainError, DomainResult, SchoolId};

use crate::error::SchoolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchoolStatus {
    Active,
    Inactive,
}

impl SchoolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchoolStatus::Active => "ACTIVE",
            SchoolStatus::Inactive => "INACTIVE",
        }
    }
}

impl core::str::FromStr for SchoolStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SchoolStatus::Active),
            "INACTIVE" => Ok(SchoolStatus::Inactive),
            other => Err(DomainError::validation(format!(
                "unknown school status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub contact: Contact,
    pub status: SchoolStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchoolChanges {
    pub name: Option<String>,
    pub contact: Option<Contact>,
}

impl School {
    /// Register an ACTIVE school.
    pub fn of(
        id: SchoolId,
        name: impl Into<String>,
        contact: Contact,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: validate_name(name.into())?,
            contact,
            status: SchoolStatus::Active,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == SchoolStatus::Active
    }

    pub fn update(self, changes: SchoolChanges, at: DateTime<Utc>) -> DomainResult<Self> {
        let name = match changes.name {
            Some(name) => validate_name(name)?,
            None => self.name,
        };

        Ok(Self {
            name,
            contact: changes.contact.unwrap_or(self.contact),
            updated_at: at,
            ..self
        })
    }

    pub fn deactivate(self, at: DateTime<Utc>) -> Result<Self, SchoolError> {
        if !self.is_active() {
            return Err(SchoolError::InvalidStatus { school_id: self.id });
        }

        Ok(Self {
            status: SchoolStatus::Inactive,
            updated_at: at,
            ..self
        })
    }
}

fn validate_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(DomainError::validation("school name must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolbill_core::ContactId;

    fn test_school() -> School {
        let contact = Contact::new(
            ContactId::new(),
            "admin@school.mx",
            "+525512345678",
            "Av. Reforma 222",
        )
        .unwrap();
        School::of(SchoolId::new(), "Colegio Azteca", contact, Utc::now()).unwrap()
    }

    #[test]
    fn renames_without_touching_contact() {
        let school = test_school();
        let renamed = school
            .clone()
            .update(
                SchoolChanges {
                    name: Some("Colegio Maya".to_string()),
                    contact: None,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(renamed.name, "Colegio Maya");
        assert_eq!(renamed.contact, school.contact);
    }

    #[test]
    fn deactivating_inactive_school_fails() {
        let school = test_school().deactivate(Utc::now()).unwrap();
        assert_eq!(school.status, SchoolStatus::Inactive);

        let err = school.clone().deactivate(Utc::now()).unwrap_err();
        assert_eq!(err, SchoolError::InvalidStatus { school_id: school.id });
        assert_eq!(err.code(), "SchoolInvalidStatusError");
    }
}
