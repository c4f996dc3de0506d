use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use schoolbill_core::StudentId;
use schoolbill_infra::repository::StudentQuery;
use schoolbill_infra::use_cases::{RegisterStudentRequest, UpdateStudentRequest};

use crate::app::dto;
use crate::app::errors::respond;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_student).get(list_students))
        .route(
            "/:id",
            get(get_student).patch(update_student).delete(drop_student),
        )
}

pub async fn register_student(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterStudentRequest>,
) -> Response {
    let identity = match dto::identity(body.identity) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let request = RegisterStudentRequest {
        first_name: body.first_name,
        last_name: body.last_name,
        age: body.age,
        contact: body.contact,
        identity,
    };
    respond(
        StatusCode::CREATED,
        services.register_student.execute(request).await,
    )
}

pub async fn list_students(Extension(services): Extension<Arc<AppServices>>) -> Response {
    respond(StatusCode::OK, services.students.list().await)
}

pub async fn get_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let student_id = match dto::parse_id::<StudentId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        services.students.get(&StudentQuery::ById(student_id)).await,
    )
}

pub async fn update_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStudentRequest>,
) -> Response {
    let student_id = match dto::parse_id::<StudentId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let request = UpdateStudentRequest {
        student_id,
        first_name: body.first_name,
        last_name: body.last_name,
        age: body.age,
        contact: body.contact,
    };
    respond(StatusCode::OK, services.update_student.execute(request).await)
}

/// Deactivates the student; enrollments are dropped asynchronously by the
/// `student.dropped` subscriber.
pub async fn drop_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let student_id = match dto::parse_id::<StudentId>(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    respond(StatusCode::OK, services.drop_student.execute(student_id).await)
}
