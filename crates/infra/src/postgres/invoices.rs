use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{Span, instrument};

use schoolbill_core::{ApplicationError, Attributes, Error, attributes};
use schoolbill_invoicing::{Invoice, InvoiceEvent, InvoiceStatus, PaymentStatus};

use super::{is_unique_violation, map_sqlx_error};
use crate::records::{InvoiceRecord, PaymentRecord};
use crate::repository::{InvoiceQuery, InvoiceRepository, InvoicesQuery};

const ERROR_CODE: &str = "InvoiceRepositoryError";

const INVOICE_COLUMNS: &str = "id, school_id, student_id, initial_amount, due_amount, due_date, \
     status, created_at, updated_at, paid_at, cancelled_at, version";

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount, status, created_at, updated_at, failed_at, succeed_at";

/// Invoices and their payments.
///
/// A batch of events is written in one transaction, each event guarded by
/// `WHERE version = event.version - 1`; creations rely on the primary key.
#[derive(Debug, Clone)]
pub struct PostgresInvoiceRepository {
    pool: Arc<PgPool>,
}

impl PostgresInvoiceRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn load(&self, records: Vec<InvoiceRecord>) -> Result<Vec<Invoice>, Error> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(ERROR_CODE, "load_payments", Attributes::new(), e))?;

        let mut payments: HashMap<String, Vec<PaymentRecord>> = HashMap::new();
        for row in rows {
            let payment = PaymentRecord::from_row(&row)
                .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_payment", Attributes::new(), e))?;
            payments.entry(payment.invoice_id.clone()).or_default().push(payment);
        }

        records
            .into_iter()
            .map(|record| {
                let owned = payments.remove(&record.id).unwrap_or_default();
                record.into_domain(owned)
            })
            .collect()
    }

    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        record: InvoiceRecord,
    ) -> Result<(), Error> {
        let attrs = attributes([("id", record.id.clone())]);
        sqlx::query(&format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(&record.id)
        .bind(record.school_id)
        .bind(record.student_id)
        .bind(record.initial_amount)
        .bind(record.due_amount)
        .bind(record.due_date)
        .bind(&record.status)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.paid_at)
        .bind(record.cancelled_at)
        .bind(record.version)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::from(ApplicationError::already_exists("Invoice", attrs.clone()))
            } else {
                map_sqlx_error(ERROR_CODE, "insert_invoice", attrs.clone(), e)
            }
        })?;
        Ok(())
    }

    /// Bump the version; zero affected rows means a stale or unknown invoice.
    async fn advance(
        tx: &mut Transaction<'_, Postgres>,
        event: &InvoiceEvent,
    ) -> Result<bool, Error> {
        let version = event.version() as i64;
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET version = $2, updated_at = $3
            WHERE id = $1 AND version = $2 - 1
            "#,
        )
        .bind(event.invoice_id().as_str())
        .bind(version)
        .bind(schoolbill_events::Event::occurred_at(event))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(ERROR_CODE, "advance_version", Attributes::new(), e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, event: &InvoiceEvent) -> Result<(), Error> {
        let operation = schoolbill_events::Event::event_type(event);
        let statement = match event {
            InvoiceEvent::InvoiceCreated(_) => return Ok(()),
            InvoiceEvent::InvoicePaid(e) => sqlx::query(
                "UPDATE invoices SET status = $2, paid_at = $3 WHERE id = $1",
            )
            .bind(e.invoice_id.as_str())
            .bind(InvoiceStatus::Paid.as_str())
            .bind(e.occurred_at),
            InvoiceEvent::InvoiceCancelled(e) => sqlx::query(
                "UPDATE invoices SET status = $2, cancelled_at = $3 WHERE id = $1",
            )
            .bind(e.invoice_id.as_str())
            .bind(InvoiceStatus::Canceled.as_str())
            .bind(e.occurred_at),
            InvoiceEvent::PaymentAdded(e) => {
                let record = PaymentRecord::from_added(e);
                sqlx::query(&format!(
                    "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
                ))
                .bind(record.id)
                .bind(record.invoice_id)
                .bind(record.amount)
                .bind(record.status)
                .bind(record.created_at)
                .bind(record.updated_at)
                .bind(record.failed_at)
                .bind(record.succeed_at)
                .execute(&mut **tx)
                .await
                .map_err(|err| map_sqlx_error(ERROR_CODE, operation, Attributes::new(), err))?;
                return Ok(());
            }
            InvoiceEvent::PaymentSucceed(e) => {
                sqlx::query("UPDATE invoices SET due_amount = $2 WHERE id = $1")
                    .bind(e.invoice_id.as_str())
                    .bind(e.due_amount.as_decimal())
                    .execute(&mut **tx)
                    .await
                    .map_err(|err| map_sqlx_error(ERROR_CODE, operation, Attributes::new(), err))?;

                sqlx::query(
                    "UPDATE payments SET status = $3, succeed_at = $4, updated_at = $4 \
                     WHERE invoice_id = $1 AND id = $2",
                )
                .bind(e.invoice_id.as_str())
                .bind(e.payment_id.as_uuid())
                .bind(PaymentStatus::Succeed.as_str())
                .bind(e.occurred_at)
            }
            InvoiceEvent::PaymentFailed(e) => sqlx::query(
                "UPDATE payments SET status = $3, failed_at = $4, updated_at = $4 \
                 WHERE invoice_id = $1 AND id = $2",
            )
            .bind(e.invoice_id.as_str())
            .bind(e.payment_id.as_uuid())
            .bind(PaymentStatus::Failed.as_str())
            .bind(e.occurred_at),
        };

        statement
            .execute(&mut **tx)
            .await
            .map_err(|err| map_sqlx_error(ERROR_CODE, operation, Attributes::new(), err))?;
        Ok(())
    }

    /// Error for an event whose preceding version is not the stored one.
    async fn rejection(&self, event: &InvoiceEvent) -> Result<Error, Error> {
        let attrs = attributes([("id", event.invoice_id().to_string())]);
        let stored = sqlx::query_scalar::<_, i64>("SELECT version FROM invoices WHERE id = $1")
            .bind(event.invoice_id().as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "stored_version", attrs.clone(), e))?;

        Ok(match stored {
            None => ApplicationError::not_found("Invoice", attrs).into(),
            Some(actual) => {
                let mut attrs = attrs;
                attrs.insert("expected_version".to_string(), (event.version() - 1).to_string());
                attrs.insert("actual_version".to_string(), actual.to_string());
                ApplicationError::conflict("Invoice", attrs).into()
            }
        })
    }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    #[instrument(skip(self), err)]
    async fn exists(&self, query: &InvoiceQuery) -> Result<bool, Error> {
        let InvoiceQuery::ById(id) = query;
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM invoices WHERE id = $1)")
            .bind(id.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "exists", query.attributes(), e))
    }

    #[instrument(skip(self), err)]
    async fn find(&self, query: &InvoiceQuery) -> Result<Option<Invoice>, Error> {
        let InvoiceQuery::ById(id) = query;
        let row = sqlx::query(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "find", query.attributes(), e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record = InvoiceRecord::from_row(&row)
            .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_invoice", query.attributes(), e))?;

        Ok(self.load(vec![record]).await?.pop())
    }

    #[instrument(skip(self), fields(count = tracing::field::Empty), err)]
    async fn list(&self, query: &InvoicesQuery) -> Result<Vec<Invoice>, Error> {
        let (column, id) = match query {
            InvoicesQuery::BySchoolId(id) => ("school_id", *id.as_uuid()),
            InvoicesQuery::ByStudentId(id) => ("student_id", *id.as_uuid()),
        };
        let rows = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE {column} = $1 ORDER BY due_date, id"
        ))
        .bind(id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(ERROR_CODE, "list", query.attributes(), e))?;

        let records = rows
            .iter()
            .map(InvoiceRecord::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error(ERROR_CODE, "decode_invoice", query.attributes(), e))?;

        Span::current().record("count", records.len());
        self.load(records).await
    }

    #[instrument(
        skip(self, events),
        fields(
            invoice_id = events.first().map(|e| e.invoice_id().as_str()),
            events = events.len(),
            version = events.last().map(InvoiceEvent::version)
        ),
        err
    )]
    async fn update_all(&self, events: &[InvoiceEvent]) -> Result<(), Error> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        let attrs = attributes([("id", first.invoice_id().to_string())]);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "begin_transaction", attrs.clone(), e))?;

        for event in events {
            if let InvoiceEvent::InvoiceCreated(created) = event {
                // Dropping the transaction rolls the batch back.
                Self::insert(&mut tx, InvoiceRecord::from_created(created)).await?;
                continue;
            }

            if !Self::advance(&mut tx, event).await? {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error(ERROR_CODE, "rollback", attrs.clone(), e))?;
                return Err(self.rejection(event).await?);
            }

            Self::apply(&mut tx, event).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(ERROR_CODE, "commit", attrs, e))?;
        Ok(())
    }
}
