use async_trait::async_trait;

use schoolbill_core::{ApplicationError, Attributes, Error, SchoolId, attributes};
use schoolbill_schools::{School, SchoolStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchoolQuery {
    ById(SchoolId),
    ByEmail(String),
}

impl SchoolQuery {
    pub fn attributes(&self) -> Attributes {
        match self {
            SchoolQuery::ById(id) => attributes([("id", id.to_string())]),
            SchoolQuery::ByEmail(email) => attributes([("email", email.clone())]),
        }
    }

    pub fn matches(&self, school: &School) -> bool {
        match self {
            SchoolQuery::ById(id) => school.id == *id,
            SchoolQuery::ByEmail(email) => school.contact.email == *email,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchoolsQuery {
    #[default]
    All,
    ByStatus(SchoolStatus),
}

impl SchoolsQuery {
    pub fn matches(&self, school: &School) -> bool {
        match self {
            SchoolsQuery::All => true,
            SchoolsQuery::ByStatus(status) => school.status == *status,
        }
    }
}

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn exists(&self, query: &SchoolQuery) -> Result<bool, Error>;

    async fn find(&self, query: &SchoolQuery) -> Result<Option<School>, Error>;

    async fn get(&self, query: &SchoolQuery) -> Result<School, Error> {
        self.find(query)
            .await?
            .ok_or_else(|| Error::from(ApplicationError::not_found("School", query.attributes())))
    }

    async fn list(&self, query: &SchoolsQuery) -> Result<Vec<School>, Error>;

    /// Insert or replace the school.
    async fn save(&self, school: &School) -> Result<(), Error>;
}
