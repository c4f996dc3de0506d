use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use schoolbill_core::{Attributes, Error, attributes};
use schoolbill_students::Student;

use super::map_sqlx_error;
use crate::records::StudentRecord;
use crate::repository::{StudentQuery, StudentRepository};

const ERROR_CODE: &str = "StudentRepositoryError";

const COLUMNS: &str = "id, first_name, last_name, age, contact_id, email, phone, address, \
     identity_kind, identity_code, status, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStudentRepository {
    pool: Arc<PgPool>,
}

impl PostgresStudentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn fetch(&self, query: &StudentQuery) -> Result<Option<StudentRecord>, Error> {
        let sql = match query {
            StudentQuery::ById(_) => format!("SELECT {COLUMNS} FROM students WHERE id = $1"),
            StudentQuery::ByIdentity(_) => format!(
                "SELECT {COLUMNS} FROM students WHERE identity_kind = $1 AND identity_code = $2"
            ),
        };
        let statement = sqlx::query(&sql);
        let statement = match query {
            StudentQuery::ById(id) => statement.bind(*id.as_uuid()),
            StudentQuery::ByIdentity(identity) => statement
                .bind(identity.kind.as_str())
                .bind(identity.code.as_str()),
        };

        let row = statement
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "find", query.attributes(), e))?;

        row.map(|row| StudentRecord::from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_student", query.attributes(), e))
    }
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
    #[instrument(skip(self), err)]
    async fn exists(&self, query: &StudentQuery) -> Result<bool, Error> {
        Ok(self.fetch(query).await?.is_some())
    }

    #[instrument(skip(self), err)]
    async fn find(&self, query: &StudentQuery) -> Result<Option<Student>, Error> {
        self.fetch(query).await?.map(StudentRecord::into_domain).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Student>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM students ORDER BY created_at, id"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(ERROR_CODE, "list", Attributes::new(), e))?;

        rows.iter()
            .map(|row| {
                StudentRecord::from_row(row)
                    .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_student", Attributes::new(), e))
                    .and_then(StudentRecord::into_domain)
            })
            .collect()
    }

    #[instrument(skip(self, student), fields(student_id = %student.id), err)]
    async fn save(&self, student: &Student) -> Result<(), Error> {
        let record = StudentRecord::from_domain(student);
        sqlx::query(&format!(
            r#"
            INSERT INTO students ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                age = EXCLUDED.age,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#
        ))
        .bind(record.id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(record.age)
        .bind(record.contact_id)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.address)
        .bind(&record.identity_kind)
        .bind(&record.identity_code)
        .bind(&record.status)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            map_sqlx_error(ERROR_CODE, "save", attributes([("id", record.id.to_string())]), e)
        })?;
        Ok(())
    }
}
