use roadgraph::{AppState, Config, GraphStore, router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("roadgraph=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = GraphStore::open(&config.db_path, config.pool)?;

    let app = router(
        AppState {
            store: store.clone(),
        },
        config.schema,
    );

    info!(schema = %config.schema, "Listening on http://{}", config.addr);
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
