//! Subcommand implementations

pub mod alerts;
pub mod offers;
pub mod search;
pub mod share;
pub mod tmc;
pub mod trend;
