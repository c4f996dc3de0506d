use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::Serialize;

use schoolbill_core::{ApplicationError, Attributes, Error, SchoolId, StudentId, attributes};
use schoolbill_schools::{ActiveEnrollmentProjection, Enrollment, EnrollmentId};

/// Enrollments fetched per page when the adapter is not told otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentsQuery {
    BySchoolId(SchoolId),
    ByStudentId(StudentId),
}

impl EnrollmentsQuery {
    pub fn attributes(&self) -> Attributes {
        match self {
            EnrollmentsQuery::BySchoolId(id) => attributes([("school_id", id.to_string())]),
            EnrollmentsQuery::ByStudentId(id) => attributes([("student_id", id.to_string())]),
        }
    }

    pub fn matches(&self, enrollment: &Enrollment) -> bool {
        match self {
            EnrollmentsQuery::BySchoolId(id) => enrollment.school_id == *id,
            EnrollmentsQuery::ByStudentId(id) => enrollment.student_id == *id,
        }
    }
}

/// One page of active enrollments, ordered by enrollment id.
///
/// `next_cursor` is the id of the last item and is only set when the page is
/// full; an empty follow-up page is possible when the total is a multiple of
/// the page size.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EnrollmentPage {
    pub next_cursor: Option<EnrollmentId>,
    pub items: Vec<ActiveEnrollmentProjection>,
}

impl EnrollmentPage {
    pub fn of(items: Vec<ActiveEnrollmentProjection>, page_size: usize) -> Self {
        let next_cursor = if items.len() == page_size {
            items.last().map(|item| item.id.clone())
        } else {
            None
        };
        Self { next_cursor, items }
    }
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Whether the pair was ever enrolled, deleted enrollments included.
    async fn exists(&self, school_id: SchoolId, student_id: StudentId) -> Result<bool, Error>;

    async fn find(
        &self,
        school_id: SchoolId,
        student_id: StudentId,
    ) -> Result<Option<Enrollment>, Error>;

    async fn get(&self, school_id: SchoolId, student_id: StudentId) -> Result<Enrollment, Error> {
        self.find(school_id, student_id).await?.ok_or_else(|| {
            Error::from(ApplicationError::not_found(
                "Enrollment",
                attributes([
                    ("school_id", school_id.to_string()),
                    ("student_id", student_id.to_string()),
                ]),
            ))
        })
    }

    /// Active enrollments strictly after `cursor`.
    async fn list_active(
        &self,
        query: &EnrollmentsQuery,
        cursor: Option<&EnrollmentId>,
    ) -> Result<EnrollmentPage, Error>;

    /// Insert or replace the enrollment.
    async fn save(&self, enrollment: &Enrollment) -> Result<(), Error>;
}

enum Cursor {
    Start,
    After(EnrollmentId),
    Done,
}

/// Pages of active enrollments, following the cursor until it runs out.
pub fn active_enrollments(
    enrollments: Arc<dyn EnrollmentRepository>,
    query: EnrollmentsQuery,
) -> impl Stream<Item = Result<Vec<ActiveEnrollmentProjection>, Error>> + Send {
    stream::try_unfold(Cursor::Start, move |cursor| {
        let enrollments = enrollments.clone();
        async move {
            let after = match cursor {
                Cursor::Start => None,
                Cursor::After(id) => Some(id),
                Cursor::Done => return Ok(None),
            };

            let page = enrollments.list_active(&query, after.as_ref()).await?;
            let next = page.next_cursor.map_or(Cursor::Done, Cursor::After);

            Ok(Some((page.items, next)))
        }
    })
}
