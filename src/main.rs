use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookstore::infrastructure::AppState;
use bookstore::{config, db, seed, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookstore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env().map_err(|e| e.to_string())?;

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .map_err(|e| format!("Failed to initialize database: {}", e))?;

    // Check for seed flag
    if std::env::var("SEED_DEMO").is_ok() {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&db).await {
            tracing::error!("Failed to seed data: {}", e);
        } else if let Err(e) = seed::reconcile_order_totals(&db).await {
            tracing::error!("Failed to reconcile order totals: {}", e);
        } else {
            tracing::info!("Demo data seeded successfully.");
        }
    }

    let state = AppState::connect(db.clone(), &config).await?;
    let app = server::build_router(state, &config.cors_allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;
    tracing::info!("Bookstore API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await
    .map_err(|e| format!("HTTP server error: {}", e))?;

    db.close()
        .await
        .map_err(|e| format!("Failed to close database: {}", e))?;
    tracing::info!("Server stopped");
    Ok(())
}
