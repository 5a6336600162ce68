use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use veo_studio::{handlers, middleware, AppState, Config};

const SESSION_IDLE_HOURS: i64 = 24;
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(
        "Configuration - project: {}, location: {}, model: {}, storage: {}",
        config.project_id,
        config.location,
        config.model_id,
        config.storage_uri()
    );

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        tracing::warn!("Failed to create output directory {}: {}", config.output_dir.display(), e);
    } else {
        tracing::info!("Output directory ready: {}", config.output_dir.display());
    }

    let bind_addr = config.bind_addr.clone();
    let shared_state = Arc::new(AppState::from_config(config).await?);
    tracing::info!(
        "🎬 Generation workflow ready (up to {} polls, max wait {:?})",
        shared_state.workflow.policy().max_attempts,
        shared_state.workflow.policy().max_wait()
    );

    let app = Router::new()
        .merge(handlers::router())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state.clone()));

    // Forget idle sessions so the store doesn't grow without bound
    let cleanup_state = shared_state.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let removed = cleanup_state
                .sessions
                .cleanup_idle(chrono::Duration::hours(SESSION_IDLE_HOURS));
            tracing::debug!("✅ Session cleanup cycle completed ({} removed)", removed);
        }
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;

    Ok(())
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,veo_studio=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,veo_studio=debug,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for production (easier for log aggregation)
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🎬 Veo Studio starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    let credentials_configured = std::env::var("GOOGLE_ACCESS_TOKEN").is_ok()
        || std::env::var("GOOGLE_APPLICATION_CREDENTIALS").is_ok();
    tracing::info!(
        "Configuration - Google credentials: {}",
        if credentials_configured { "✅" } else { "❌" }
    );

    Ok(())
}

// API Status endpoint
async fn api_status(Extension(state): Extension<Arc<AppState>>) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    let policy = state.workflow.policy();

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "generation": {
            "project_id": state.config.project_id,
            "location": state.config.location,
            "model_id": state.config.model_id,
            "storage_uri": state.config.storage_uri(),
            "poll_attempts": policy.max_attempts,
            "poll_delay_secs": policy.delay.as_secs(),
            "max_wait_secs": policy.max_wait().as_secs()
        },
        "library": {
            "cache_ttl_secs": state.config.list_ttl.as_secs()
        },
        "endpoints": {
            "studio": "/",
            "examples": "/api/examples",
            "session": "/api/sessions/:session_id",
            "generate": "/api/sessions/:session_id/generate",
            "session_video": "/api/sessions/:session_id/video",
            "videos": "/api/videos",
            "video_file": "/api/videos/file?uri=",
            "status": "/api/status"
        }
    }))
}
