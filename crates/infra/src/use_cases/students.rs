use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use schoolbill_core::{ApplicationError, ContactId, Error, StudentId, attributes};
use schoolbill_events::{Message, Publisher};
use schoolbill_students::{Identity, Student, StudentChanges};

use super::{ContactDetails, rejected};
use crate::id_generator::IdGenerator;
use crate::repository::{StudentQuery, StudentRepository, technical};

/// Topic announcing that a student was dropped.
pub const DROP_STUDENT_TOPIC: &str = "student.dropped";

/// Payload published on [`DROP_STUDENT_TOPIC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDropped {
    pub student: StudentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterStudentRequest {
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub contact: ContactDetails,
    pub identity: Identity,
}

/// Register a student. Identity documents are unique across students.
pub struct RegisterStudent {
    students: Arc<dyn StudentRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl RegisterStudent {
    pub fn new(students: Arc<dyn StudentRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { students, ids }
    }

    pub async fn execute(&self, request: RegisterStudentRequest) -> Result<Student, Error> {
        info!(
            identity_kind = request.identity.kind.as_str(),
            identity_code = %request.identity.code,
            "About to register a student"
        );

        let query = StudentQuery::ByIdentity(request.identity.clone());
        if self.students.exists(&query).await? {
            return Err(rejected(ApplicationError::already_exists(
                "Student",
                query.attributes(),
            )));
        }

        let contact = request
            .contact
            .into_contact(ContactId::from_uuid(self.ids.generate().await))
            .map_err(rejected)?;
        let student = Student::of(
            StudentId::from_uuid(self.ids.generate().await),
            request.first_name,
            request.last_name,
            request.age,
            contact,
            request.identity,
            Utc::now(),
        )
        .map_err(rejected)?;

        self.students.save(&student).await?;
        Ok(student)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStudentRequest {
    pub student_id: StudentId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u8>,
    pub contact: Option<ContactDetails>,
}

pub struct UpdateStudent {
    students: Arc<dyn StudentRepository>,
}

impl UpdateStudent {
    pub fn new(students: Arc<dyn StudentRepository>) -> Self {
        Self { students }
    }

    pub async fn execute(&self, request: UpdateStudentRequest) -> Result<Student, Error> {
        info!(student_id = %request.student_id, "About to update a student");

        let student = self
            .students
            .get(&StudentQuery::ById(request.student_id))
            .await?;
        let contact = request
            .contact
            .map(|details| details.into_contact(student.contact.id))
            .transpose()
            .map_err(rejected)?;

        let student = student
            .update(
                StudentChanges {
                    first_name: request.first_name,
                    last_name: request.last_name,
                    age: request.age,
                    contact,
                },
                Utc::now(),
            )
            .map_err(rejected)?;

        self.students.save(&student).await?;
        Ok(student)
    }
}

/// Deactivate a student and announce it on [`DROP_STUDENT_TOPIC`].
///
/// The message is published after the student is saved; a publish failure is
/// reported but the deactivation stands.
pub struct DropStudent {
    students: Arc<dyn StudentRepository>,
    publisher: Arc<dyn Publisher>,
}

impl DropStudent {
    pub fn new(students: Arc<dyn StudentRepository>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            students,
            publisher,
        }
    }

    pub async fn execute(&self, student_id: StudentId) -> Result<Student, Error> {
        info!(student_id = %student_id, "About to drop a student");

        let student = self.students.get(&StudentQuery::ById(student_id)).await?;
        let student = student.deactivate(Utc::now()).map_err(rejected)?;

        self.students.save(&student).await?;

        let attrs = attributes([("student_id", student_id.to_string())]);
        let message = Message::new(
            DROP_STUDENT_TOPIC,
            &StudentDropped {
                student: student_id,
            },
            Utc::now(),
        )
        .map_err(|e| technical("PublisherError", "Fail encoding student dropped message", attrs.clone(), e))?;

        self.publisher
            .publish(message)
            .await
            .map_err(|e| technical("PublisherError", "Fail publishing student dropped message", attrs, e))?;

        Ok(student)
    }
}

pub struct StudentQueryHandler {
    students: Arc<dyn StudentRepository>,
}

impl StudentQueryHandler {
    pub fn new(students: Arc<dyn StudentRepository>) -> Self {
        Self { students }
    }

    pub async fn get(&self, query: &StudentQuery) -> Result<Student, Error> {
        self.students.get(query).await
    }

    pub async fn find(&self, query: &StudentQuery) -> Result<Option<Student>, Error> {
        self.students.find(query).await
    }

    pub async fn list(&self) -> Result<Vec<Student>, Error> {
        self.students.list().await
    }
}
