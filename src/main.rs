use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use venue_reserve::{
    config::Config, controllers, database::Database, services::reaper::HoldReaper, AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting venue-reserve");

    let db = Database::new(&config.database)
        .await
        .expect("Failed to connect to database");
    info!("Database connected");

    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    let cancel = tokio_util::sync::CancellationToken::new();

    let app_state = Arc::new(AppState {
        db: db.clone(),
        config: config.clone(),
        cancel: cancel.clone(),
    });

    let reaper = HoldReaper::new(db.pool.clone(), config.reservation.clone());
    let reaper_cancel = cancel.clone();
    task::spawn(async move {
        reaper.run(reaper_cancel).await;
    });

    let app = Router::new()
        .route("/", get(|| async { "venue-reserve" }))
        .merge(controllers::routes(app_state.clone()))
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .unwrap();
}

async fn shutdown_signal(cancel: tokio_util::sync::CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    info!("shutdown signal received");
    cancel.cancel();
}
