use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use schoolbill_core::Error;
use schoolbill_students::Student;

use super::poisoned;
use crate::records::StudentRecord;
use crate::repository::{StudentQuery, StudentRepository};

const ERROR_CODE: &str = "StudentRepositoryError";

#[derive(Debug, Default)]
pub struct InMemoryStudentRepository {
    students: RwLock<HashMap<Uuid, StudentRecord>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, query: &StudentQuery) -> Result<Option<StudentRecord>, Error> {
        let guard = self.students.read().map_err(|_| poisoned(ERROR_CODE))?;
        Ok(match query {
            StudentQuery::ById(id) => guard.get(id.as_uuid()).cloned(),
            StudentQuery::ByIdentity(identity) => guard
                .values()
                .find(|s| {
                    s.identity_kind == identity.kind.as_str() && s.identity_code == identity.code
                })
                .cloned(),
        })
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn exists(&self, query: &StudentQuery) -> Result<bool, Error> {
        Ok(self.matching(query)?.is_some())
    }

    async fn find(&self, query: &StudentQuery) -> Result<Option<Student>, Error> {
        self.matching(query)?.map(StudentRecord::into_domain).transpose()
    }

    async fn list(&self) -> Result<Vec<Student>, Error> {
        let mut records: Vec<StudentRecord> = {
            let guard = self.students.read().map_err(|_| poisoned(ERROR_CODE))?;
            guard.values().cloned().collect()
        };
        records.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        records.into_iter().map(StudentRecord::into_domain).collect()
    }

    async fn save(&self, student: &Student) -> Result<(), Error> {
        let record = StudentRecord::from_domain(student);
        let mut guard = self.students.write().map_err(|_| poisoned(ERROR_CODE))?;
        guard.insert(record.id, record);
        Ok(())
    }
}
