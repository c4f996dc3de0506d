use schoolbill_core::{Attributes, BusinessError, SchoolId, StudentId, attributes};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchoolError {
    #[error("Invalid status for school {school_id}")]
    InvalidStatus { school_id: SchoolId },

    /// The enrollment is deleted, or one of its parties is not active.
    #[error("Invalid enrollment of student {student_id} in school {school_id}")]
    InvalidEnrollment {
        school_id: SchoolId,
        student_id: StudentId,
    },
}

impl SchoolError {
    pub fn code(&self) -> &'static str {
        match self {
            SchoolError::InvalidStatus { .. } => "SchoolInvalidStatusError",
            SchoolError::InvalidEnrollment { .. } => "InvalidEnrollmentError",
        }
    }

    pub fn attributes(&self) -> Attributes {
        match self {
            SchoolError::InvalidStatus { school_id } => {
                attributes([("school_id", school_id.to_string())])
            }
            SchoolError::InvalidEnrollment {
                school_id,
                student_id,
            } => attributes([
                ("school_id", school_id.to_string()),
                ("student_id", student_id.to_string()),
            ]),
        }
    }
}

impl From<SchoolError> for BusinessError {
    fn from(value: SchoolError) -> Self {
        BusinessError::new(value.code(), value.to_string(), value.attributes())
    }
}

impl From<SchoolError> for schoolbill_core::Error {
    fn from(value: SchoolError) -> Self {
        schoolbill_core::Error::Business(value.into())
    }
}
