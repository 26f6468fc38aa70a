use std::sync::Arc;

use kosh_store::{InMemoryVoucherStore, PostgresVoucherStore, VoucherStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kosh_observability::init();

    let store: Arc<dyn VoucherStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::PgPool::connect(&url).await?;
            Arc::new(PostgresVoucherStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using volatile in-memory store");
            Arc::new(InMemoryVoucherStore::new())
        }
    };

    let app = kosh_api::app::build_app(store);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
