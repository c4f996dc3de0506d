//! Persistence records.
//!
//! Flat, storage-shaped rows shared by the Postgres and in-memory adapters.
//! Mapping to and from the domain is explicit; a stored row that no longer
//! satisfies the domain invariants surfaces as a technical error.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use schoolbill_core::{
    Contact, ContactId, DomainError, Error, JobId, Money, PaymentId, SchoolId, StudentId,
    attributes,
};
use schoolbill_invoicing::{
    Invoice, InvoiceCreated, InvoiceId, InvoiceParts, InvoiceStatus, Payment, PaymentAdded,
    PaymentParts, PaymentStatus,
};
use schoolbill_schools::{Enrollment, School, SchoolStatus};
use schoolbill_students::{Identity, IdentityKind, Student, StudentStatus};

use crate::jobs::JobExecutionResult;
use crate::repository::technical;

fn corrupted(code: &'static str, id: &str, err: DomainError) -> Error {
    technical(code, format!("Stored record {id} is invalid"), attributes([("id", id)]), err)
}

fn version_of(version: i64) -> Result<u64, DomainError> {
    u64::try_from(version).map_err(|_| DomainError::validation(format!("negative version {version}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub invoice_id: String,
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub failed_at: Option<DateTime<Utc>>,
    pub succeed_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn from_added(event: &PaymentAdded) -> Self {
        Self {
            id: *event.payment_id.as_uuid(),
            invoice_id: event.invoice_id.to_string(),
            amount: event.amount.as_decimal(),
            status: PaymentStatus::Pending.as_str().to_string(),
            created_at: event.occurred_at,
            updated_at: event.occurred_at,
            failed_at: None,
            succeed_at: None,
        }
    }

    fn into_parts(self) -> Result<PaymentParts, DomainError> {
        Ok(PaymentParts {
            id: PaymentId::from_uuid(self.id),
            invoice_id: InvoiceId::from(self.invoice_id),
            amount: Money::new(self.amount)?,
            status: PaymentStatus::from_str(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            failed_at: self.failed_at,
            succeed_at: self.succeed_at,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for PaymentRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            invoice_id: row.try_get("invoice_id")?,
            amount: row.try_get("amount")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            failed_at: row.try_get("failed_at")?,
            succeed_at: row.try_get("succeed_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRecord {
    pub id: String,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub initial_amount: Decimal,
    pub due_amount: Decimal,
    pub due_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl InvoiceRecord {
    pub fn from_created(event: &InvoiceCreated) -> Self {
        Self {
            id: event.invoice_id.to_string(),
            school_id: *event.school_id.as_uuid(),
            student_id: *event.student_id.as_uuid(),
            initial_amount: event.amount.as_decimal(),
            due_amount: event.amount.as_decimal(),
            due_date: event.due_date,
            status: InvoiceStatus::Pending.as_str().to_string(),
            created_at: event.occurred_at,
            updated_at: event.occurred_at,
            paid_at: None,
            cancelled_at: None,
            version: event.version as i64,
        }
    }

    /// Rebuild the aggregate; `payments` must be in creation order.
    pub fn into_domain(self, payments: Vec<PaymentRecord>) -> Result<Invoice, Error> {
        let id = self.id.clone();
        self.try_into_domain(payments)
            .map_err(|err| corrupted("InvoiceRepositoryError", &id, err))
    }

    fn try_into_domain(self, payments: Vec<PaymentRecord>) -> Result<Invoice, DomainError> {
        let payments = payments
            .into_iter()
            .map(|record| record.into_parts().and_then(Payment::rehydrate))
            .collect::<Result<Vec<_>, _>>()?;

        Invoice::rehydrate(InvoiceParts {
            id: InvoiceId::from(self.id),
            student_id: StudentId::from_uuid(self.student_id),
            school_id: SchoolId::from_uuid(self.school_id),
            initial_amount: Money::new(self.initial_amount)?,
            due_amount: Money::new(self.due_amount)?,
            due_date: self.due_date,
            status: InvoiceStatus::from_str(&self.status)?,
            payments,
            created_at: self.created_at,
            updated_at: self.updated_at,
            paid_at: self.paid_at,
            cancelled_at: self.cancelled_at,
            version: version_of(self.version)?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for InvoiceRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            school_id: row.try_get("school_id")?,
            student_id: row.try_get("student_id")?,
            initial_amount: row.try_get("initial_amount")?,
            due_amount: row.try_get("due_amount")?,
            due_date: row.try_get("due_date")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            paid_at: row.try_get("paid_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            version: row.try_get("version")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolRecord {
    pub id: Uuid,
    pub name: String,
    pub contact_id: Uuid,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchoolRecord {
    pub fn from_domain(school: &School) -> Self {
        Self {
            id: *school.id.as_uuid(),
            name: school.name.clone(),
            contact_id: *school.contact.id.as_uuid(),
            email: school.contact.email.clone(),
            phone: school.contact.phone.clone(),
            address: school.contact.address.clone(),
            status: school.status.as_str().to_string(),
            created_at: school.created_at,
            updated_at: school.updated_at,
        }
    }

    pub fn into_domain(self) -> Result<School, Error> {
        let id = self.id.to_string();
        self.try_into_domain()
            .map_err(|err| corrupted("SchoolRepositoryError", &id, err))
    }

    fn try_into_domain(self) -> Result<School, DomainError> {
        Ok(School {
            id: SchoolId::from_uuid(self.id),
            name: self.name,
            contact: Contact::new(
                ContactId::from_uuid(self.contact_id),
                self.email,
                self.phone,
                self.address,
            )?,
            status: SchoolStatus::from_str(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for SchoolRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            contact_id: row.try_get("contact_id")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: i16,
    pub contact_id: Uuid,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub identity_kind: String,
    pub identity_code: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentRecord {
    pub fn from_domain(student: &Student) -> Self {
        Self {
            id: *student.id.as_uuid(),
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            age: i16::from(student.age),
            contact_id: *student.contact.id.as_uuid(),
            email: student.contact.email.clone(),
            phone: student.contact.phone.clone(),
            address: student.contact.address.clone(),
            identity_kind: student.identity.kind.as_str().to_string(),
            identity_code: student.identity.code.clone(),
            status: student.status.as_str().to_string(),
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }

    pub fn into_domain(self) -> Result<Student, Error> {
        let id = self.id.to_string();
        self.try_into_domain()
            .map_err(|err| corrupted("StudentRepositoryError", &id, err))
    }

    fn try_into_domain(self) -> Result<Student, DomainError> {
        let age = u8::try_from(self.age)
            .map_err(|_| DomainError::validation(format!("age {} out of range", self.age)))?;

        Ok(Student {
            id: StudentId::from_uuid(self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            age,
            contact: Contact::new(
                ContactId::from_uuid(self.contact_id),
                self.email,
                self.phone,
                self.address,
            )?,
            identity: Identity::new(IdentityKind::from_str(&self.identity_kind)?, self.identity_code)?,
            status: StudentStatus::from_str(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for StudentRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            age: row.try_get("age")?,
            contact_id: row.try_get("contact_id")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            identity_kind: row.try_get("identity_kind")?,
            identity_code: row.try_get("identity_code")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRecord {
    pub id: String,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub monthly_fee: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EnrollmentRecord {
    pub fn from_domain(enrollment: &Enrollment) -> Self {
        Self {
            id: enrollment.id.to_string(),
            school_id: *enrollment.school_id.as_uuid(),
            student_id: *enrollment.student_id.as_uuid(),
            monthly_fee: enrollment.monthly_fee.as_decimal(),
            created_at: enrollment.created_at,
            updated_at: enrollment.updated_at,
            deleted_at: enrollment.deleted_at,
        }
    }

    pub fn into_domain(self) -> Result<Enrollment, Error> {
        let monthly_fee = Money::new(self.monthly_fee)
            .map_err(|err| corrupted("EnrollmentRepositoryError", &self.id, err))?;

        Ok(Enrollment {
            id: self.id.into(),
            school_id: SchoolId::from_uuid(self.school_id),
            student_id: StudentId::from_uuid(self.student_id),
            monthly_fee,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for EnrollmentRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            school_id: row.try_get("school_id")?,
            student_id: row.try_get("student_id")?,
            monthly_fee: row.try_get("monthly_fee")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

/// Audit row of one job execution. Item details are kept as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JobExecutionRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub items: Option<serde_json::Value>,
    pub error: Option<String>,
    pub succeed_items: Option<i64>,
    pub failed_items: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobExecutionRecord {
    pub fn from_domain(result: &JobExecutionResult) -> Result<Self, Error> {
        let id: JobId = result.id();
        let mut record = Self {
            id: *id.as_uuid(),
            name: result.job_name().to_string(),
            kind: result.kind().to_string(),
            items: None,
            error: None,
            succeed_items: None,
            failed_items: None,
            started_at: result.started_at(),
            finished_at: result.finished_at(),
        };

        match result {
            JobExecutionResult::Success(execution) => {
                let items = serde_json::to_value(&execution.items).map_err(|err| {
                    technical(
                        "JobRepositoryError",
                        "Fail encoding job items",
                        attributes([("id", id.to_string())]),
                        err,
                    )
                })?;
                record.items = Some(items);
                record.succeed_items = Some(execution.succeed_items as i64);
                record.failed_items = Some(execution.failed_items as i64);
            }
            JobExecutionResult::Failure(execution) => {
                record.error = Some(execution.error.clone());
            }
        }

        Ok(record)
    }
}
