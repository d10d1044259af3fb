pub mod bookings;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod gateway;
pub mod models;
pub mod seats;
pub mod services;

#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
    pub cancel: tokio_util::sync::CancellationToken,
}
