use anyhow::Context;

use chronicle_api::app::{self, services::AppServices};
use chronicle_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chronicle_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = AppServices::connect(&config)
        .await
        .context("failed to initialise storage")?;

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        storage = ?config.storage,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
