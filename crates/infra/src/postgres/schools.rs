use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use schoolbill_core::{Attributes, Error, attributes};
use schoolbill_schools::School;

use super::map_sqlx_error;
use crate::records::SchoolRecord;
use crate::repository::{SchoolQuery, SchoolRepository, SchoolsQuery};

const ERROR_CODE: &str = "SchoolRepositoryError";

const COLUMNS: &str =
    "id, name, contact_id, email, phone, address, status, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresSchoolRepository {
    pool: Arc<PgPool>,
}

impl PostgresSchoolRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn fetch(&self, query: &SchoolQuery) -> Result<Option<SchoolRecord>, Error> {
        let column = match query {
            SchoolQuery::ById(_) => "id",
            SchoolQuery::ByEmail(_) => "email",
        };
        let sql = format!("SELECT {COLUMNS} FROM schools WHERE {column} = $1");
        let statement = sqlx::query(&sql);
        let statement = match query {
            SchoolQuery::ById(id) => statement.bind(*id.as_uuid()),
            SchoolQuery::ByEmail(email) => statement.bind(email.as_str()),
        };

        let row = statement
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "find", query.attributes(), e))?;

        row.map(|row| SchoolRecord::from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_school", query.attributes(), e))
    }
}

#[async_trait]
impl SchoolRepository for PostgresSchoolRepository {
    #[instrument(skip(self), err)]
    async fn exists(&self, query: &SchoolQuery) -> Result<bool, Error> {
        Ok(self.fetch(query).await?.is_some())
    }

    #[instrument(skip(self), err)]
    async fn find(&self, query: &SchoolQuery) -> Result<Option<School>, Error> {
        self.fetch(query).await?.map(SchoolRecord::into_domain).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self, query: &SchoolsQuery) -> Result<Vec<School>, Error> {
        let sql = match query {
            SchoolsQuery::All => format!("SELECT {COLUMNS} FROM schools ORDER BY created_at, id"),
            SchoolsQuery::ByStatus(_) => format!(
                "SELECT {COLUMNS} FROM schools WHERE status = $1 ORDER BY created_at, id"
            ),
        };
        let mut statement = sqlx::query(&sql);
        if let SchoolsQuery::ByStatus(status) = query {
            statement = statement.bind(status.as_str());
        }

        let rows = statement
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "list", Attributes::new(), e))?;

        rows.iter()
            .map(|row| {
                SchoolRecord::from_row(row)
                    .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_school", Attributes::new(), e))
                    .and_then(SchoolRecord::into_domain)
            })
            .collect()
    }

    #[instrument(skip(self, school), fields(school_id = %school.id), err)]
    async fn save(&self, school: &School) -> Result<(), Error> {
        let record = SchoolRecord::from_domain(school);
        sqlx::query(&format!(
            r#"
            INSERT INTO schools ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#
        ))
        .bind(record.id)
        .bind(&record.name)
        .bind(record.contact_id)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.address)
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
