use std::panic;
use std::sync::Arc;

use intellicode_collab::config::Config;
use intellicode_collab::db::{memory::DEV_USER_ID, CollabStore, MemoryStore, PgStore};
use intellicode_collab::routes::build_router;
use intellicode_collab::services::assist_service::AssistService;
use intellicode_collab::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "intellicode_collab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.jwt_secret.is_none() {
        warn!("No JWT secret configured - every connection will be refused");
    }

    // Pick the store
    let store: Arc<dyn CollabStore> = match &config.db_url {
        Some(db_url) => match PgStore::connect(db_url, config.db_max_connections).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                std::process::exit(1);
            }
        },
        None if config.is_production() => {
            error!("DB_URL is required in production");
            std::process::exit(1);
        }
        None if config.is_development() => {
            warn!("No database URL configured - using the in-memory store, nothing survives a restart");
            info!(
                "Seeded development user '{}': sign a token with JWT_SECRET and userId '{}' to connect",
                DEV_USER_ID, DEV_USER_ID
            );
            Arc::new(MemoryStore::with_development_seed().await)
        }
        None => {
            warn!("No database URL configured - using an empty in-memory store, nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mut state = AppState::new(config.clone(), store);
    match AssistService::from_config(&config) {
        Ok(Some(assist)) => state = state.with_assist(assist),
        Ok(None) => warn!("No LLM API key configured - code assistance endpoints will answer 503"),
        Err(e) => error!("Failed to set up code assistance: {}", e),
    }

    let app_routes = build_router(state);

    // Start the HTTP/API server
    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = axum::serve(listener, app_routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
