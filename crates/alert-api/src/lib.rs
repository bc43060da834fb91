//! Alert service: subscription endpoint, alert job trigger, health and metrics

pub mod api;
pub mod config;
pub mod schedule;

pub use api::{create_router, serve, AppState};
pub use config::AlertApiConfig;
