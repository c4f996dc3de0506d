use async_trait::async_trait;

use schoolbill_core::{ApplicationError, Attributes, Error, StudentId, attributes};
use schoolbill_students::{Identity, Student};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentQuery {
    ById(StudentId),
    ByIdentity(Identity),
}

impl StudentQuery {
    pub fn attributes(&self) -> Attributes {
        match self {
            StudentQuery::ById(id) => attributes([("id", id.to_string())]),
            StudentQuery::ByIdentity(identity) => attributes([
                ("identity_kind", identity.kind.as_str().to_string()),
                ("identity_code", identity.code.clone()),
            ]),
        }
    }

    pub fn matches(&self, student: &Student) -> bool {
        match self {
            StudentQuery::ById(id) => student.id == *id,
            StudentQuery::ByIdentity(identity) => student.identity == *identity,
        }
    }
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn exists(&self, query: &StudentQuery) -> Result<bool, Error>;

    async fn find(&self, query: &StudentQuery) -> Result<Option<Student>, Error>;

    async fn get(&self, query: &StudentQuery) -> Result<Student, Error> {
        self.find(query)
            .await?
            .ok_or_else(|| Error::from(ApplicationError::not_found("Student", query.attributes())))
    }

    async fn list(&self) -> Result<Vec<Student>, Error>;

    /// Insert or replace the student.
    async fn save(&self, student: &Student) -> Result<(), Error>;
}
