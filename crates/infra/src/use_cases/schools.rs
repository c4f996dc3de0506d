use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use schoolbill_core::{ApplicationError, ContactId, Error, SchoolId, attributes};
use schoolbill_schools::{School, SchoolChanges};

use super::{ContactDetails, rejected};
use crate::id_generator::IdGenerator;
use crate::repository::{SchoolQuery, SchoolRepository, SchoolsQuery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSchoolRequest {
    pub name: String,
    pub contact: ContactDetails,
}

/// Register a school. Contact emails are unique across schools.
pub struct RegisterSchool {
    schools: Arc<dyn SchoolRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl RegisterSchool {
    pub fn new(schools: Arc<dyn SchoolRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { schools, ids }
    }

    pub async fn execute(&self, request: RegisterSchoolRequest) -> Result<School, Error> {
        info!(name = %request.name, email = %request.contact.email, "About to register a school");

        ensure_email_is_free(self.schools.as_ref(), &request.contact.email, None).await?;

        let contact = request
            .contact
            .into_contact(ContactId::from_uuid(self.ids.generate().await))
            .map_err(rejected)?;
        let school = School::of(
            SchoolId::from_uuid(self.ids.generate().await),
            request.name,
            contact,
            Utc::now(),
        )
        .map_err(rejected)?;

        self.schools.save(&school).await?;
        Ok(school)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSchoolRequest {
    pub school_id: SchoolId,
    pub name: Option<String>,
    pub contact: Option<ContactDetails>,
}

/// Rename a school and/or replace its contact details.
pub struct UpdateSchool {
    schools: Arc<dyn SchoolRepository>,
}

impl UpdateSchool {
    pub fn new(schools: Arc<dyn SchoolRepository>) -> Self {
        Self { schools }
    }

    pub async fn execute(&self, request: UpdateSchoolRequest) -> Result<School, Error> {
        info!(school_id = %request.school_id, "About to update a school");

        let school = self.schools.get(&SchoolQuery::ById(request.school_id)).await?;

        let contact = match request.contact {
            Some(details) => {
                ensure_email_is_free(self.schools.as_ref(), &details.email, Some(school.id)).await?;
                Some(details.into_contact(school.contact.id).map_err(rejected)?)
            }
            None => None,
        };

        let school = school
            .update(
                SchoolChanges {
                    name: request.name,
                    contact,
                },
                Utc::now(),
            )
            .map_err(rejected)?;

        self.schools.save(&school).await?;
        Ok(school)
    }
}

/// Deactivate a school. Inactive schools cannot enroll nor bill.
pub struct DropSchool {
    schools: Arc<dyn SchoolRepository>,
}

impl DropSchool {
    pub fn new(schools: Arc<dyn SchoolRepository>) -> Self {
        Self { schools }
    }

    pub async fn execute(&self, school_id: SchoolId) -> Result<School, Error> {
        info!(school_id = %school_id, "About to drop a school");

        let school = self.schools.get(&SchoolQuery::ById(school_id)).await?;
        let school = school.deactivate(Utc::now()).map_err(rejected)?;

        self.schools.save(&school).await?;
        Ok(school)
    }
}

pub struct SchoolQueryHandler {
    schools: Arc<dyn SchoolRepository>,
}

impl SchoolQueryHandler {
    pub fn new(schools: Arc<dyn SchoolRepository>) -> Self {
        Self { schools }
    }

    pub async fn get(&self, query: &SchoolQuery) -> Result<School, Error> {
        self.schools.get(query).await
    }

    pub async fn find(&self, query: &SchoolQuery) -> Result<Option<School>, Error> {
        self.schools.find(query).await
    }

    pub async fn list(&self, query: &SchoolsQuery) -> Result<Vec<School>, Error> {
        self.schools.list(query).await
    }
}

async fn ensure_email_is_free(
    schools: &dyn SchoolRepository,
    email: &str,
    owner: Option<SchoolId>,
) -> Result<(), Error> {
    let query = SchoolQuery::ByEmail(email.trim().to_string());
    match schools.find(&query).await? {
        Some(existing) if Some(existing.id) != owner => Err(rejected(
            ApplicationError::already_exists("School", attributes([("email", email.to_string())])),
        )),
        _ => Ok(()),
    }
}
