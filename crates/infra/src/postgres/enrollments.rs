use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{Span, instrument};

use schoolbill_core::{Error, SchoolId, StudentId, attributes};
use schoolbill_schools::{ActiveEnrollmentProjection, Enrollment, EnrollmentId};

use super::map_sqlx_error;
use crate::records::EnrollmentRecord;
use crate::repository::{DEFAULT_PAGE_SIZE, EnrollmentPage, EnrollmentRepository, EnrollmentsQuery};

const ERROR_CODE: &str = "EnrollmentRepositoryError";

const COLUMNS: &str =
    "id, school_id, student_id, monthly_fee, created_at, updated_at, deleted_at";

/// Enrollments, paginated with a keyset cursor on `id`.
#[derive(Debug, Clone)]
pub struct PostgresEnrollmentRepository {
    pool: Arc<PgPool>,
    page_size: usize,
}

impl PostgresEnrollmentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self::with_page_size(pool, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(pool: Arc<PgPool>, page_size: usize) -> Self {
        Self {
            pool,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl EnrollmentRepository for PostgresEnrollmentRepository {
    #[instrument(skip(self), err)]
    async fn exists(&self, school_id: SchoolId, student_id: StudentId) -> Result<bool, Error> {
        let id = EnrollmentId::of(school_id, student_id);
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM enrollments WHERE id = $1)")
            .bind(id.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "exists", attributes([("id", id.as_str())]), e))
    }

    #[instrument(skip(self), err)]
    async fn find(
        &self,
        school_id: SchoolId,
        student_id: StudentId,
    ) -> Result<Option<Enrollment>, Error> {
        let id = EnrollmentId::of(school_id, student_id);
        let attrs = attributes([("id", id.as_str())]);
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "find", attrs.clone(), e))?;

        row.map(|row| {
            EnrollmentRecord::from_row(&row)
                .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_enrollment", attrs.clone(), e))
                .and_then(EnrollmentRecord::into_domain)
        })
        .transpose()
    }

    #[instrument(skip(self), fields(count = tracing::field::Empty), err)]
    async fn list_active(
        &self,
        query: &EnrollmentsQuery,
        cursor: Option<&EnrollmentId>,
    ) -> Result<EnrollmentPage, Error> {
        let (column, owner) = match query {
            EnrollmentsQuery::BySchoolId(id) => ("school_id", *id.as_uuid()),
            EnrollmentsQuery::ByStudentId(id) => ("student_id", *id.as_uuid()),
        };
        let sql = format!(
            r#"
            SELECT {COLUMNS}
            FROM enrollments
            WHERE {column} = $1
              AND deleted_at IS NULL
              AND ($2::TEXT IS NULL OR id > $2)
            ORDER BY id
            LIMIT $3
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(owner)
            .bind(cursor.map(EnrollmentId::as_str))
            .bind(self.page_size as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "list_active", query.attributes(), e))?;

        let items = rows
            .iter()
            .map(|row| {
                EnrollmentRecord::from_row(row)
                    .map_err(|e| {
                        map_sqlx_error(ERROR_CODE, "decode_enrollment", query.attributes(), e)
                    })
                    .and_then(EnrollmentRecord::into_domain)
                    .map(|enrollment| ActiveEnrollmentProjection::from(&enrollment))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("count", items.len());
        Ok(EnrollmentPage::of(items, self.page_size))
    }

    #[instrument(skip(self, enrollment), fields(enrollment_id = %enrollment.id), err)]
    async fn save(&self, enrollment: &Enrollment) -> Result<(), Error> {
        let record = EnrollmentRecord::from_domain(enrollment);
        sqlx::query(&format!(
            r#"
            INSERT INTO enrollments ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                monthly_fee = EXCLUDED.monthly_fee,
                updated_at = EXCLUDED.updated_at,
                deleted_at = EXCLUDED.deleted_at
            "#
        ))
        .bind(&record.id)
        .bind(record.school_id)
        .bind(record.student_id)
        .bind(record.monthly_fee)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.deleted_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(ERROR_CODE, "save", attributes([("id", record.id.as_str())]), e))?;
        Ok(())
    }
}
