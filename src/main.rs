/// Main application: summary relay + Anycross task sync.
///
/// Two flows share the process:
/// - `/api/endpoint` formats a frontend summary into a Feishu rich-text
///   post and delivers it to the selected chats.
/// - `/api/task-sync` triggers Anycross webhook flows for Bitable rows,
///   either synchronously for one record or as a polled batch job.
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use feishu_anycross_relay::config::Settings;
use feishu_anycross_relay::handlers::{
    get_task_sync_job, handle_summary, handle_task_sync, health_check,
};
use feishu_anycross_relay::services::JobStore;
use feishu_anycross_relay::utils::{logging::*, AppError};
use feishu_anycross_relay::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env when present; in deployment the variables come from the
    // process environment.
    if dotenvy::dotenv().is_err() {
        tracing::debug!(".env file not found - using system environment variables");
    }

    tracing_subscriber::fmt::init();

    let settings = Settings::new()
        .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {}", e)))?;

    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    let feishu_client = feishu::FeishuClient::new(
        settings.feishu.app_id.clone(),
        settings.feishu.app_secret.clone(),
    )
    .with_base_url(settings.feishu.base_url.clone());

    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        http: reqwest::Client::new(),
        feishu: feishu_client,
        jobs: JobStore::new(),
    });

    // CORS for the Vite dev frontend; the browser preflight is answered
    // by the layer itself.
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(86400));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/endpoint", post(handle_summary))
        .route("/api/task-sync", post(handle_task_sync))
        .route("/api/task-sync/status/:job_id", get(get_task_sync_job))
        .layer(cors)
        .with_state(app_state);

    // PORT from the environment wins over the configured port.
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(settings.server.port);
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port)).await?;

    log_server_startup(port);
    log_server_ready(port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
