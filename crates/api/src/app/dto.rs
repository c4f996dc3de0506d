use std::str::FromStr;

use axum::response::Response;
use chrono::NaiveDate;
use serde::Deserialize;

use schoolbill_core::{DomainError, Money, SchoolId, StudentId};
use schoolbill_infra::repository::{InvoicesQuery, SchoolsQuery};
use schoolbill_schools::SchoolStatus;
use schoolbill_infra::use_cases::ContactDetails;
use schoolbill_students::{Identity, IdentityKind};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterSchoolRequest {
    pub name: String,
    pub contact: ContactDetails,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSchoolRequest {
    pub name: Option<String>,
    pub contact: Option<ContactDetails>,
}

#[derive(Debug, Deserialize)]
pub struct SchoolsFilter {
    pub status: Option<SchoolStatus>,
}

impl SchoolsFilter {
    pub fn into_query(self) -> SchoolsQuery {
        self.status.map_or(SchoolsQuery::All, SchoolsQuery::ByStatus)
    }
}

#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    pub kind: IdentityKind,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterStudentRequest {
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub contact: ContactDetails,
    pub identity: IdentityRequest,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u8>,
    pub contact: Option<ContactDetails>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollStudentRequest {
    pub student_id: String,
    pub monthly_fee: Money,
}

#[derive(Debug, Deserialize)]
pub struct AdjustFeeRequest {
    pub monthly_fee: Money,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentsPageQuery {
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateInvoicesRequest {
    /// Due date of the generated invoices.
    pub period: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub school_id: String,
    pub student_id: String,
    pub amount: Money,
    pub due_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AddPaymentRequest {
    pub amount: Money,
}

/// `?school_id=` or `?student_id=`, exactly one of them.
#[derive(Debug, Deserialize)]
pub struct InvoicesFilter {
    pub school_id: Option<String>,
    pub student_id: Option<String>,
}

impl InvoicesFilter {
    pub fn into_query(self) -> Result<InvoicesQuery, Response> {
        match (self.school_id, self.student_id) {
            (Some(school_id), None) => Ok(InvoicesQuery::BySchoolId(parse_id::<SchoolId>(&school_id)?)),
            (None, Some(student_id)) => {
                Ok(InvoicesQuery::ByStudentId(parse_id::<StudentId>(&student_id)?))
            }
            _ => Err(validation(
                "exactly one of school_id or student_id must be given",
            )),
        }
    }
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.trim()
        .parse()
        .map_err(|e: DomainError| errors::error_response(e.into()))
}

pub fn identity(request: IdentityRequest) -> Result<Identity, Response> {
    Identity::new(request.kind, request.code).map_err(|e| errors::error_response(e.into()))
}

pub fn positive(amount: Money, field: &str) -> Result<Money, Response> {
    if amount.is_positive() {
        Ok(amount)
    } else {
        Err(validation(format!("{field} must be greater than zero")))
    }
}

fn validation(message: impl Into<String>) -> Response {
    errors::error_response(DomainError::validation(message).into())
}
