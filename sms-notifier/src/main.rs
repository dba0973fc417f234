//! sms-notifier server

use sms_notifier::{AppState, Config, api, logger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const LOG_RETENTION_DAYS: i64 = 14;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!("Starting sms-notifier (env: {})", config.environment);

    if let Some(dir) = config.log_dir.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
            loop {
                interval.tick().await;
                if let Err(e) = logger::cleanup_old_logs(std::path::Path::new(&dir), LOG_RETENTION_DAYS) {
                    tracing::warn!("Log cleanup failed: {e}");
                }
            }
        });
    }

    let http_port = config.http_port;
    let state = AppState::new(config)?;
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("sms-notifier HTTP listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("sms-notifier stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
