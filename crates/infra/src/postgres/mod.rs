//! Postgres adapters.
//!
//! Queries are built at runtime with `sqlx::query`; rows are mapped through
//! the records in [`crate::records`]. Every repository shares one pool.
//!
//! ## Error Mapping
//!
//! | SQLx error | Result |
//! |------------|--------|
//! | unique violation (`23505`) on insert | `AlreadyExists` |
//! | no row for `version = n - 1` on an existing invoice | `Conflict` |
//! | anything else | `TechnicalError` with the repository code |

mod enrollments;
mod invoices;
mod jobs;
mod schools;
mod students;

pub use enrollments::PostgresEnrollmentRepository;
pub use invoices::PostgresInvoiceRepository;
pub use jobs::PostgresJobRepository;
pub use schools::PostgresSchoolRepository;
pub use students::PostgresStudentRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use schoolbill_core::{Attributes, Error, attributes};

use crate::config::DatabaseConfig;
use crate::repository::technical;

/// Open a connection pool.
#[instrument(skip(url, config), fields(max_connections = config.max_connections))]
pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<PgPool, Error> {
    info!("Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(url)
        .await
        .map_err(|e| map_sqlx_error("DatabaseError", "connect", Attributes::new(), e))?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Apply the embedded migrations.
#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), Error> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        technical(
            "DatabaseError",
            "Migration failed",
            attributes([("operation", "run_migrations")]),
            e,
        )
    })?;
    info!("Database migrations completed");
    Ok(())
}

pub(crate) fn map_sqlx_error(
    code: &'static str,
    operation: &str,
    mut attrs: Attributes,
    err: sqlx::Error,
) -> Error {
    attrs.insert("operation".to_string(), operation.to_string());
    let message = match &err {
        sqlx::Error::Database(db_err) => format!("database error in {operation}: {}", db_err.message()),
        sqlx::Error::PoolClosed => format!("connection pool closed in {operation}"),
        _ => format!("sqlx error in {operation}"),
    };
    technical(code, message, attrs, err)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
