use std::sync::Arc;

use anyhow::Context;

use orggate_api::app::{self, AppServices};
use orggate_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orggate_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind_addr = config.bind_addr.clone();
    let services = Arc::new(
        AppServices::from_config(config)
            .await
            .context("failed to initialise services")?,
    );
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await?;
    Ok(())
}
