use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use schoolbill_api::app::{AppServices, Repositories, build_app};
use schoolbill_events::InMemoryEventBus;
use schoolbill_infra::SequenceIdGenerator;

struct TestApp {
    router: Router,
    _subscribers: Vec<tokio::task::JoinHandle<()>>,
}

impl TestApp {
    fn spawn() -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let services = Arc::new(AppServices::new(
            Repositories::in_memory(2),
            bus.clone(),
            Arc::new(SequenceIdGenerator::new()),
        ));
        let subscribers = services.spawn_subscribers(bus.as_ref());

        Self {
            router: build_app(services),
            _subscribers: subscribers,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn school(&self, name: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/schools",
                Some(json!({
                    "name": name,
                    "contact": {
                        "email": format!("office@{}.edu", name.to_lowercase()),
                        "phone": "+52 55 0000 0000",
                        "address": "Calle 1",
                    },
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn student(&self, code: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/students",
                Some(json!({
                    "first_name": "Luis",
                    "last_name": "Perez",
                    "age": 10,
                    "contact": {
                        "email": format!("{}@mail.com", code.to_lowercase()),
                        "phone": "+52 55 1111 1111",
                        "address": "Calle 2",
                    },
                    "identity": { "kind": "CURP", "code": code },
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

/// Invoice ids contain `:` and `/`.
fn encode(id: &str) -> String {
    id.replace(':', "%3A").replace('/', "%2F")
}

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::spawn();
    let (status, _) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn billing_round_trip_over_http() {
    let app = TestApp::spawn();
    let school_id = app.school("Hidalgo").await;
    let student_id = app.student("PEPL000000HDFRRR01").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/schools/{school_id}/enrollments"),
            Some(json!({ "student_id": student_id, "monthly_fee": "1200.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/schools/{school_id}/invoices/generate"),
            Some(json!({ "period": "2025-09-05" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["kind"], "SUCCESS");
    assert_eq!(body["succeed_items"], 1);

    let (status, statement) = app
        .send(
            Method::GET,
            &format!("/invoices/statement?student_id={student_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(statement["due_amount"], "1200.00");
    let invoice_id = statement["invoices"][0]["id"].as_str().unwrap().to_string();
    let invoice_path = format!("/invoices/{}", encode(&invoice_id));

    let (status, invoice) = app
        .send(
            Method::POST,
            &format!("{invoice_path}/payments"),
            Some(json!({ "amount": "1200.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    let payment_id = invoice["payments"][0]["id"].as_str().unwrap().to_string();

    let (status, invoice) = app
        .send(
            Method::POST,
            &format!("{invoice_path}/payments/{payment_id}/succeed"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{invoice}");
    assert_eq!(invoice["status"], "PAID");
    assert_eq!(invoice["due_amount"], "0.00");

    let (status, body) = app.send(Method::POST, &format!("{invoice_path}/cancel"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvoiceInvalidStatusError");
    assert_eq!(body["attributes"]["invoice_id"], invoice_id.as_str());
}

#[tokio::test]
async fn errors_follow_the_status_mapping() {
    let app = TestApp::spawn();
    let school_id = app.school("Juarez").await;

    let (status, body) = app.send(Method::GET, "/schools/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidIdentifierError");

    let (status, body) = app
        .send(Method::GET, &format!("/invoices/{}", encode("school:x/student:y/period:2025-1")), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ResourceNotFoundError");

    let (status, body) = app
        .send(
            Method::POST,
            "/schools",
            Some(json!({
                "name": "Juarez Twin",
                "contact": { "email": "office@juarez.edu", "phone": "1", "address": "x" },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ResourceAlreadyExistsError");

    let (status, body) = app.send(Method::GET, "/invoices", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");

    let (status, _) = app.send(Method::DELETE, &format!("/schools/{school_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/schools/{school_id}/invoices/generate"),
            Some(json!({ "period": "2025-09-05" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SchoolInvalidStatusError");
}

#[tokio::test]
async fn zero_amounts_are_rejected_before_reaching_invoices() {
    let app = TestApp::spawn();
    let school_id = app.school("Morelos").await;
    let student_id = app.student("MORL000000HDFMMM01").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/invoices",
            Some(json!({
                "school_id": school_id,
                "student_id": student_id,
                "amount": "0",
                "due_date": "2025-09-05",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");

    let (status, invoice) = app
        .send(
            Method::POST,
            "/invoices",
            Some(json!({
                "school_id": school_id,
                "student_id": student_id,
                "amount": "300.00",
                "due_date": "2025-09-05",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    let invoice_path = format!("/invoices/{}", encode(invoice["id"].as_str().unwrap()));

    let (status, body) = app
        .send(
            Method::POST,
            &format!("{invoice_path}/payments"),
            Some(json!({ "amount": "0.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");

    let (status, invoice) = app.send(Method::GET, &invoice_path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["version"], 1);
    assert!(invoice["payments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn dropping_a_student_empties_school_enrollments() {
    let app = TestApp::spawn();
    let school_id = app.school("Morelos").await;
    let student_id = app.student("MORE000000HDFMMM01").await;
    app.send(
        Method::POST,
        &format!("/schools/{school_id}/enrollments"),
        Some(json!({ "student_id": student_id, "monthly_fee": "800" })),
    )
    .await;

    let (status, student) = app
        .send(Method::DELETE, &format!("/students/{student_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(student["status"], "INACTIVE");

    // The subscriber drops enrollments asynchronously; poll briefly.
    for _ in 0..50 {
        let (_, page) = app
            .send(Method::GET, &format!("/schools/{school_id}/enrollments"), None)
            .await;
        if page["items"].as_array().is_some_and(|items| items.is_empty()) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("enrollments were not dropped within timeout");
}
