use axum::Router;

pub mod invoices;
pub mod schools;
pub mod students;
pub mod system;

/// Router for every resource endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/schools", schools::router())
        .nest("/students", students::router())
        .nest("/invoices", invoices::router())
}
