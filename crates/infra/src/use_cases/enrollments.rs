use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use schoolbill_core::{ApplicationError, Error, Money, SchoolId, StudentId, attributes};
use schoolbill_schools::{Enrollment, EnrollmentId, SchoolError};

use super::rejected;
use crate::repository::{
    EnrollmentPage, EnrollmentRepository, EnrollmentsQuery, SchoolQuery, SchoolRepository,
    StudentQuery, StudentRepository,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollStudentToSchoolRequest {
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub monthly_fee: Money,
}

/// Enroll an active student in an active school. A pair enrolls once.
pub struct EnrollStudentToSchool {
    schools: Arc<dyn SchoolRepository>,
    students: Arc<dyn StudentRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollStudentToSchool {
    pub fn new(
        schools: Arc<dyn SchoolRepository>,
        students: Arc<dyn StudentRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            schools,
            students,
            enrollments,
        }
    }

    pub async fn execute(&self, request: EnrollStudentToSchoolRequest) -> Result<Enrollment, Error> {
        info!(
            school_id = %request.school_id,
            student_id = %request.student_id,
            "About to enroll student to school"
        );

        if self
            .enrollments
            .exists(request.school_id, request.student_id)
            .await?
        {
            return Err(rejected(ApplicationError::already_exists(
                "Enrollment",
                attributes([
                    ("school_id", request.school_id.to_string()),
                    ("student_id", request.student_id.to_string()),
                ]),
            )));
        }

        let school = self.schools.get(&SchoolQuery::ById(request.school_id)).await?;
        let student = self.students.get(&StudentQuery::ById(request.student_id)).await?;

        if !school.is_active() || !student.is_active() {
            return Err(rejected(SchoolError::InvalidEnrollment {
                school_id: school.id,
                student_id: student.id,
            }));
        }

        let enrollment = Enrollment::of(school.id, student.id, request.monthly_fee, Utc::now());
        self.enrollments.save(&enrollment).await?;

        Ok(enrollment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustEnrollmentFeeRequest {
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub monthly_fee: Money,
}

pub struct AdjustEnrollmentFee {
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl AdjustEnrollmentFee {
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>) -> Self {
        Self { enrollments }
    }

    pub async fn execute(&self, request: AdjustEnrollmentFeeRequest) -> Result<Enrollment, Error> {
        info!(
            school_id = %request.school_id,
            student_id = %request.student_id,
            monthly_fee = %request.monthly_fee,
            "About to adjust an enrollment fee"
        );

        let enrollment = self
            .enrollments
            .get(request.school_id, request.student_id)
            .await?;
        let enrollment = enrollment
            .adjust_fee(request.monthly_fee, Utc::now())
            .map_err(rejected)?;

        self.enrollments.save(&enrollment).await?;
        Ok(enrollment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropEnrollmentRequest {
    pub school_id: SchoolId,
    pub student_id: StudentId,
}

/// Soft delete an enrollment; it stops being billed.
pub struct DropEnrollment {
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl DropEnrollment {
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>) -> Self {
        Self { enrollments }
    }

    pub async fn execute(&self, request: DropEnrollmentRequest) -> Result<Enrollment, Error> {
        info!(
            school_id = %request.school_id,
            student_id = %request.student_id,
            "About to drop an enrollment"
        );

        let enrollment = self
            .enrollments
            .get(request.school_id, request.student_id)
            .await?;
        let enrollment = enrollment.delete(Utc::now()).map_err(rejected)?;

        self.enrollments.save(&enrollment).await?;
        Ok(enrollment)
    }
}

pub struct EnrollmentQueryHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentQueryHandler {
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>) -> Self {
        Self { enrollments }
    }

    pub async fn get(&self, school_id: SchoolId, student_id: StudentId) -> Result<Enrollment, Error> {
        self.enrollments.get(school_id, student_id).await
    }

    pub async fn find(
        &self,
        school_id: SchoolId,
        student_id: StudentId,
    ) -> Result<Option<Enrollment>, Error> {
        self.enrollments.find(school_id, student_id).await
    }

    pub async fn list(
        &self,
        query: &EnrollmentsQuery,
        cursor: Option<&EnrollmentId>,
    ) -> Result<EnrollmentPage, Error> {
        self.enrollments.list_active(query, cursor).await
    }
}
