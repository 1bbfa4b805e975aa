//! Return Claims - workflow gateway over the return service

use anyhow::Result;
use return_claims::config::Config;
use return_claims::http::{router, AppState};
use return_claims::service::HttpReturnService;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let service = Arc::new(HttpReturnService::from_config(&config)?);
    let state = AppState { service: service.clone(), directory: service, page_size: config.page_size };
    let app = router(state);

    tracing::info!(upstream = %config.return_service_url, "🚀 Return Claims listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
