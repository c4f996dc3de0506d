use std::sync::Arc;

use schoolbill_events::InMemoryEventBus;
use schoolbill_infra::{AppConfig, UuidV7Generator, postgres};

use schoolbill_api::app::{self, AppServices, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;
    schoolbill_observability::init(&config.logging);

    let page_size = config.jobs.enrollment_page_size as usize;
    let repositories = match config.database.url.as_deref() {
        Some(url) => {
            let pool = postgres::connect(url, &config.database).await?;
            if config.database.run_migrations {
                postgres::run_migrations(&pool).await?;
            }
            Repositories::postgres(Arc::new(pool), page_size)
        }
        None => {
            tracing::warn!("SCHOOLBILL__DATABASE__URL not set; using in-memory repositories");
            Repositories::in_memory(page_size)
        }
    };

    let bus = Arc::new(InMemoryEventBus::new());
    let services = Arc::new(AppServices::new(
        repositories,
        bus.clone(),
        Arc::new(UuidV7Generator),
    ));
    let _subscribers = services.spawn_subscribers(bus.as_ref());

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()?).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app::build_app(services)).await?;
    Ok(())
}
