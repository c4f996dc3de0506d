use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolbill_core::{Entity, Money, SchoolId, StudentId};

use crate::error::SchoolError;

/// Enrollment identifier, derived from school and student.
///
/// Also the stable sort key used to paginate enrollment listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(String);

impl EnrollmentId {
    pub fn of(school_id: SchoolId, student_id: StudentId) -> Self {
        Self(format!("school:{school_id}/student:{student_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EnrollmentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A student's enrollment in a school, billed `monthly_fee` each period.
///
/// Deleting is a soft delete (`deleted_at`); deleted enrollments are
/// immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub monthly_fee: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn of(
        school_id: SchoolId,
        student_id: StudentId,
        monthly_fee: Money,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EnrollmentId::of(school_id, student_id),
            school_id,
            student_id,
            monthly_fee,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn adjust_fee(&self, new_fee: Money, at: DateTime<Utc>) -> Result<Self, SchoolError> {
        self.ensure_active()?;
        Ok(Self {
            monthly_fee: new_fee,
            updated_at: at,
            ..self.clone()
        })
    }

    pub fn delete(&self, at: DateTime<Utc>) -> Result<Self, SchoolError> {
        self.ensure_active()?;
        Ok(Self {
            updated_at: at,
            deleted_at: Some(at),
            ..self.clone()
        })
    }

    fn ensure_active(&self) -> Result<(), SchoolError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SchoolError::InvalidEnrollment {
                school_id: self.school_id,
                student_id: self.student_id,
            })
        }
    }
}

impl Entity for Enrollment {
    type Id = EnrollmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Billing view of an active enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEnrollmentProjection {
    pub id: EnrollmentId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub monthly_fee: Money,
}

impl From<&Enrollment> for ActiveEnrollmentProjection {
    fn from(value: &Enrollment) -> Self {
        Self {
            id: value.id.clone(),
            school_id: value.school_id,
            student_id: value.student_id,
            monthly_fee: value.monthly_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_enrollment() -> Enrollment {
        Enrollment::of(
            SchoolId::new(),
            StudentId::new(),
            Money::from_cents(150000),
            Utc::now(),
        )
    }

    #[test]
    fn id_is_derived_from_parties() {
        let enrollment = test_enrollment();
        assert_eq!(
            enrollment.id.as_str(),
            format!(
                "school:{}/student:{}",
                enrollment.school_id, enrollment.student_id
            )
        );
    }

    #[test]
    fn adjust_fee_keeps_enrollment_active() {
        let enrollment = test_enrollment()
            .adjust_fee(Money::from_cents(120000), Utc::now())
            .unwrap();
        assert!(enrollment.is_active());
        assert_eq!(enrollment.monthly_fee, Money::from_cents(120000));
    }

    #[test]
    fn deleted_enrollment_rejects_changes() {
        let deleted = test_enrollment().delete(Utc::now()).unwrap();
        assert!(!deleted.is_active());

        for result in [
            deleted.delete(Utc::now()),
            deleted.adjust_fee(Money::from_cents(1), Utc::now()),
        ] {
            match result {
                Err(SchoolError::InvalidEnrollment { student_id, .. })
                    if student_id == deleted.student_id => {}
                other => panic!("expected InvalidEnrollment, got {other:?}"),
            }
        }
    }
}
