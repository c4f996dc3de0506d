use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
};

use schoolbill_core::{SchoolId, StudentId};
use schoolbill_infra::jobs;
use schoolbill_infra::repository::{EnrollmentsQuery, SchoolQuery};
use schoolbill_infra::use_cases::{
    AdjustEnrollmentFeeRequest, DropEnrollmentRequest, EnrollStudentToSchoolRequest,
    RegisterSchoolRequest, UpdateSchoolRequest,
};
use schoolbill_schools::EnrollmentId;

use crate::app::dto;
use crate::app::errors::respond;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_school).get(list_schools))
        .route(
            "/:id",
            get(get_school).patch(update_school).delete(drop_school),
        )
        .route("/:id/enrollments", post(enroll_student).get(list_enrollments))
        .route(
            "/:id/enrollments/:student_id",
            patch(adjust_enrollment_fee).delete(drop_enrollment),
        )
        .route("/:id/invoices/generate", post(generate_invoices))
}

pub async fn register_school(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterSchoolRequest>,
) -> Response {
    let request = RegisterSchoolRequest {
        name: body.name,
        contact: body.contact,
    };
    respond(
        StatusCode::CREATED,
        services.register_school.execute(request).await,
    )
}

pub async fn list_schools(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<dto::SchoolsFilter>,
) -> Response {
    respond(
        StatusCode::OK,
        services.schools.list(&filter.into_query()).await,
    )
}

pub async fn get_school(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let school_id = match dto::parse_id::<SchoolId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        services.schools.get(&SchoolQuery::ById(school_id)).await,
    )
}

pub async fn update_school(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateSchoolRequest>,
) -> Response {
    let school_id = match dto::parse_id::<SchoolId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let request = UpdateSchoolRequest {
        school_id,
        name: body.name,
        contact: body.contact,
    };
    respond(StatusCode::OK, services.update_school.execute(request).await)
}

pub async fn drop_school(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let school_id = match dto::parse_id::<SchoolId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(StatusCode::OK, services.drop_school.execute(school_id).await)
}

pub async fn enroll_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::EnrollStudentRequest>,
) -> Response {
    let parsed = dto::parse_id::<SchoolId>(&id).and_then(|school_id| {
        let student_id = dto::parse_id::<StudentId>(&body.student_id)?;
        let monthly_fee = dto::positive(body.monthly_fee, "monthly_fee")?;
        Ok(EnrollStudentToSchoolRequest {
            school_id,
            student_id,
            monthly_fee,
        })
    });
    let request = match parsed {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        services.enroll_student.execute(request).await,
    )
}

pub async fn list_enrollments(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(page): Query<dto::EnrollmentsPageQuery>,
) -> Response {
    let school_id = match dto::parse_id::<SchoolId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let cursor = page.cursor.map(EnrollmentId::from);
    respond(
        StatusCode::OK,
        services
            .enrollments
            .list(&EnrollmentsQuery::BySchoolId(school_id), cursor.as_ref())
            .await,
    )
}

pub async fn adjust_enrollment_fee(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, student_id)): Path<(String, String)>,
    Json(body): Json<dto::AdjustFeeRequest>,
) -> Response {
    let parsed = dto::parse_id::<SchoolId>(&id).and_then(|school_id| {
        Ok(AdjustEnrollmentFeeRequest {
            school_id,
            student_id: dto::parse_id::<StudentId>(&student_id)?,
            monthly_fee: dto::positive(body.monthly_fee, "monthly_fee")?,
        })
    });
    let request = match parsed {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        services.adjust_enrollment_fee.execute(request).await,
    )
}

pub async fn drop_enrollment(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, student_id)): Path<(String, String)>,
) -> Response {
    let parsed = dto::parse_id::<SchoolId>(&id).and_then(|school_id| {
        Ok(DropEnrollmentRequest {
            school_id,
            student_id: dto::parse_id::<StudentId>(&student_id)?,
        })
    });
    let request = match parsed {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        services.drop_enrollment.execute(request).await,
    )
}

pub async fn generate_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::GenerateInvoicesRequest>,
) -> Response {
    let school_id = match dto::parse_id::<SchoolId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let request = jobs::GenerateInvoicesRequest {
        school_id,
        period: body.period,
    };
    respond(
        StatusCode::OK,
        services.generate_invoices.execute(request).await,
    )
}
