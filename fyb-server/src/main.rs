use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

mod config;
mod handlers;

use config::Config;
use fyb_core::generator::Generator;
use handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load("config.toml")?;

    let _logging_guard = fyb_core::logging::init_with_file("logs", "fyb-server", &config.log_level);
    info!("Loaded configuration: {:?}", config);

    let generated_dir = PathBuf::from(&config.public_dir).join("generated");
    tokio::fs::create_dir_all(&generated_dir).await?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    info!("Serving generated artifacts from: {}", generated_dir.display());

    let cors = if config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let address = config.server_address();
    let state = Arc::new(AppState {
        generator: Generator::new(),
        config,
    });

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/api/csv/headers", post(handlers::csv_headers))
        .route("/api/generate", post(handlers::generate))
        .route("/api/templates", get(handlers::templates))
        .route("/api/formats", get(handlers::formats))
        .route("/api/mapping/default", get(handlers::default_mapping))
        .route("/api/mapping/validate", post(handlers::validate_mapping))
        .nest_service("/generated", ServeDir::new(&generated_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting FYB server on http://{}", address);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
