//! civicdesk core — complaint escalation, zone aggregation, dashboard
//! statistics and table views over an in-memory complaint snapshot.

pub mod complaint;
pub mod config;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod event;
pub mod query;
pub mod rng;
pub mod sample;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod types;
pub mod zone;
