use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use schoolbill_core::{PaymentId, SchoolId, StudentId};
use schoolbill_infra::repository::InvoiceQuery;
use schoolbill_infra::use_cases::{
    AddInvoicePaymentRequest, CreateInvoiceRequest, InvoicePaymentRequest,
};
use schoolbill_invoicing::InvoiceId;

use crate::app::dto;
use crate::app::errors::respond;
use crate::app::services::AppServices;

/// Invoice ids contain `/`; clients percent-encode them in the path.
pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/statement", get(account_statement))
        .route("/:id", get(get_invoice))
        .route("/:id/payments", post(add_payment))
        .route("/:id/payments/:payment_id/succeed", post(succeed_payment))
        .route("/:id/payments/:payment_id/fail", post(fail_payment))
        .route("/:id/cancel", post(cancel_invoice))
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateInvoiceRequest>,
) -> Response {
    let request = match create_request(body) {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        services.create_invoice.execute(request).await,
    )
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<dto::InvoicesFilter>,
) -> Response {
    let query = match filter.into_query() {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(StatusCode::OK, services.invoices.list(&query).await)
}

pub async fn account_statement(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<dto::InvoicesFilter>,
) -> Response {
    let query = match filter.into_query() {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        services.invoices.account_statement(&query).await,
    )
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    respond(
        StatusCode::OK,
        services
            .invoices
            .get(&InvoiceQuery::ById(InvoiceId::from(id)))
            .await,
    )
}

pub async fn add_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddPaymentRequest>,
) -> Response {
    let amount = match dto::positive(body.amount, "amount") {
        Ok(amount) => amount,
        Err(response) => return response,
    };
    let request = AddInvoicePaymentRequest {
        invoice_id: InvoiceId::from(id),
        amount,
    };
    respond(
        StatusCode::CREATED,
        services.add_invoice_payment.execute(request).await,
    )
}

pub async fn succeed_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, payment_id)): Path<(String, String)>,
) -> Response {
    let request = match payment_request(id, &payment_id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        services.succeed_invoice_payment.execute(request).await,
    )
}

pub async fn fail_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, payment_id)): Path<(String, String)>,
) -> Response {
    let request = match payment_request(id, &payment_id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        services.fail_invoice_payment.execute(request).await,
    )
}

pub async fn cancel_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    respond(
        StatusCode::OK,
        services.cancel_invoice.execute(InvoiceId::from(id)).await,
    )
}

fn create_request(body: dto::CreateInvoiceRequest) -> Result<CreateInvoiceRequest, Response> {
    Ok(CreateInvoiceRequest {
        school_id: dto::parse_id::<SchoolId>(&body.school_id)?,
        student_id: dto::parse_id::<StudentId>(&body.student_id)?,
        amount: dto::positive(body.amount, "amount")?,
        due_date: body.due_date,
    })
}

fn payment_request(invoice_id: String, payment_id: &str) -> Result<InvoicePaymentRequest, Response> {
    Ok(InvoicePaymentRequest {
        invoice_id: InvoiceId::from(invoice_id),
        payment_id: dto::parse_id::<PaymentId>(payment_id)?,
    })
}
