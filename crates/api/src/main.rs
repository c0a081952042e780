use anyhow::Context;

use libristack_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    libristack_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind_addr = config.bind_addr;

    let app = libristack_api::app::build_app(config)
        .await
        .context("failed to start application")?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
