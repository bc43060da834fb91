//! Core library for the GPU price tracker
//!
//! This crate provides the core functionality for:
//! - Offer scoring (continuity, value, predictable cost, friction)
//! - True monthly cost estimates
//! - The filter / sort / rank / paginate pipeline
//! - Alert subscriptions and the scheduled alert job
//! - Dataset feeds, subscription storage and email delivery
//! - Health checks and observability

pub mod alerts;
pub mod catalog;
pub mod debounce;
pub mod export;
pub mod feed;
pub mod freshness;
pub mod health;
pub mod history;
pub mod models;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod scoring;
pub mod share;
pub mod snapshot;
pub mod store;
pub mod tmc;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, TrackerMetrics};
pub use snapshot::Snapshot;
