use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use schoolbill_core::{Error, SchoolId, StudentId};
use schoolbill_schools::{ActiveEnrollmentProjection, Enrollment, EnrollmentId};

use super::poisoned;
use crate::records::EnrollmentRecord;
use crate::repository::{DEFAULT_PAGE_SIZE, EnrollmentPage, EnrollmentRepository, EnrollmentsQuery};

const ERROR_CODE: &str = "EnrollmentRepositoryError";

/// Enrollments keyed (and therefore ordered) by enrollment id.
#[derive(Debug)]
pub struct InMemoryEnrollmentRepository {
    enrollments: RwLock<BTreeMap<String, EnrollmentRecord>>,
    page_size: usize,
}

impl Default for InMemoryEnrollmentRepository {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            enrollments: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn exists(&self, school_id: SchoolId, student_id: StudentId) -> Result<bool, Error> {
        let guard = self.enrollments.read().map_err(|_| poisoned(ERROR_CODE))?;
        Ok(guard.contains_key(EnrollmentId::of(school_id, student_id).as_str()))
    }

    async fn find(
        &self,
        school_id: SchoolId,
        student_id: StudentId,
    ) -> Result<Option<Enrollment>, Error> {
        let record = {
            let guard = self.enrollments.read().map_err(|_| poisoned(ERROR_CODE))?;
            guard
                .get(EnrollmentId::of(school_id, student_id).as_str())
                .cloned()
        };
        record.map(EnrollmentRecord::into_domain).transpose()
    }

    async fn list_active(
        &self,
        query: &EnrollmentsQuery,
        cursor: Option<&EnrollmentId>,
    ) -> Result<EnrollmentPage, Error> {
        let records: Vec<EnrollmentRecord> = {
            let guard = self.enrollments.read().map_err(|_| poisoned(ERROR_CODE))?;
            guard
                .values()
                .filter(|r| cursor.is_none_or(|c| r.id.as_str() > c.as_str()))
                .filter(|r| r.deleted_at.is_none())
                .filter(|r| match query {
                    EnrollmentsQuery::BySchoolId(id) => r.school_id == *id.as_uuid(),
                    EnrollmentsQuery::ByStudentId(id) => r.student_id == *id.as_uuid(),
                })
                .take(self.page_size)
                .cloned()
                .collect()
        };

        let items = records
            .into_iter()
            .map(|r| r.into_domain().map(|e| ActiveEnrollmentProjection::from(&e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EnrollmentPage::of(items, self.page_size))
    }

    async fn save(&self, enrollment: &Enrollment) -> Result<(), Error> {
        let record = EnrollmentRecord::from_domain(enrollment);
        let mut guard = self.enrollments.write().map_err(|_| poisoned(ERROR_CODE))?;
        guard.insert(record.id.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::active_enrollments;
    use chrono::Utc;
    use futures::TryStreamExt;
    use schoolbill_core::Money;
    use std::sync::Arc;

    async fn seed(repo: &InMemoryEnrollmentRepository, school_id: SchoolId, n: usize) {
        for _ in 0..n {
            let enrollment = Enrollment::of(school_id, StudentId::new(), Money::from_cents(100), Utc::now());
            repo.save(&enrollment).await.unwrap();
        }
    }

    #[tokio::test]
    async fn pages_follow_the_cursor_in_id_order() {
        let repo = InMemoryEnrollmentRepository::with_page_size(2);
        let school_id = SchoolId::new();
        seed(&repo, school_id, 3).await;
        seed(&repo, SchoolId::new(), 2).await;

        let query = EnrollmentsQuery::BySchoolId(school_id);
        let first = repo.list_active(&query, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let cursor = first.next_cursor.clone().unwrap();
        assert_eq!(cursor, first.items[1].id);

        let second = repo.list_active(&query, Some(&cursor)).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.next_cursor, None);
        assert!(second.items[0].id > cursor);
    }

    #[tokio::test]
    async fn deleted_enrollments_are_skipped_but_still_exist() {
        let repo = InMemoryEnrollmentRepository::new();
        let enrollment = Enrollment::of(SchoolId::new(), StudentId::new(), Money::from_cents(100), Utc::now());
        repo.save(&enrollment.delete(Utc::now()).unwrap()).await.unwrap();

        let page = repo
            .list_active(&EnrollmentsQuery::ByStudentId(enrollment.student_id), None)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(repo.exists(enrollment.school_id, enrollment.student_id).await.unwrap());
    }

    #[tokio::test]
    async fn stream_reads_every_page_including_an_empty_tail() {
        let repo = Arc::new(InMemoryEnrollmentRepository::with_page_size(2));
        let school_id = SchoolId::new();
        seed(&repo, school_id, 4).await;

        let pages: Vec<Vec<ActiveEnrollmentProjection>> =
            active_enrollments(repo, EnrollmentsQuery::BySchoolId(school_id))
                .try_collect()
                .await
                .unwrap();

        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 0]);
    }
}
