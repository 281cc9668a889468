use anyhow::Context;

use homefix_infra::{AiConfig, AiServices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables win.
    let _ = dotenvy::dotenv();
    homefix_observability::init();

    let config = AiConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let services = AiServices::from_config(config).await?;

    let app = homefix_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
