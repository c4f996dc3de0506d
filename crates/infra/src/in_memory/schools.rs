use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use schoolbill_core::Error;
use schoolbill_schools::School;

use super::poisoned;
use crate::records::SchoolRecord;
use crate::repository::{SchoolQuery, SchoolRepository, SchoolsQuery};

const ERROR_CODE: &str = "SchoolRepositoryError";

#[derive(Debug, Default)]
pub struct InMemorySchoolRepository {
    schools: RwLock<HashMap<Uuid, SchoolRecord>>,
}

impl InMemorySchoolRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, query: &SchoolQuery) -> Result<Option<SchoolRecord>, Error> {
        let guard = self.schools.read().map_err(|_| poisoned(ERROR_CODE))?;
        Ok(match query {
            SchoolQuery::ById(id) => guard.get(id.as_uuid()).cloned(),
            SchoolQuery::ByEmail(email) => guard.values().find(|s| s.email == *email).cloned(),
        })
    }
}

#[async_trait]
impl SchoolRepository for InMemorySchoolRepository {
    async fn exists(&self, query: &SchoolQuery) -> Result<bool, Error> {
        Ok(self.matching(query)?.is_some())
    }

    async fn find(&self, query: &SchoolQuery) -> Result<Option<School>, Error> {
        self.matching(query)?.map(SchoolRecord::into_domain).transpose()
    }

    async fn list(&self, query: &SchoolsQuery) -> Result<Vec<School>, Error> {
        let mut records: Vec<SchoolRecord> = {
            let guard = self.schools.read().map_err(|_| poisoned(ERROR_CODE))?;
            guard
                .values()
                .filter(|s| match query {
                    SchoolsQuery::All => true,
                    SchoolsQuery::ByStatus(status) => s.status == status.as_str(),
                })
                .cloned()
                .collect()
        };
        records.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        records.into_iter().map(SchoolRecord::into_domain).collect()
    }

    async fn save(&self, school: &School) -> Result<(), Error> {
        let record = SchoolRecord::from_domain(school);
        let mut guard = self.schools.write().map_err(|_| poisoned(ERROR_CODE))?;
        guard.insert(record.id, record);
        Ok(())
    }
}
