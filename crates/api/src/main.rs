use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;

use gatehouse_api::app::{build_app_with, services::AppServices};
use gatehouse_infra::GatehouseConfig;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatehouseConfig::from_env().context("loading configuration")?;
    gatehouse_observability::init(&config.log);

    if !config.cookies.secure {
        tracing::warn!("GATEHOUSE_SECURE_COOKIES not set; cookies will be sent over plain HTTP");
    }

    let services = Arc::new(AppServices::from_config(&config));
    spawn_session_purge(services.clone());
    let app = build_app_with(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn spawn_session_purge(services: Arc<AppServices>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = services.gatehouse().store().purge_expired_sessions(Utc::now()) {
                tracing::warn!(error = %e, "session purge failed");
            }
        }
    });
}
