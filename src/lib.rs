//! depcheck - dependency health reporting over HTTP.
//!
//! Probes the bound MySQL, Redis and Elasticsearch instances on every
//! `GET /` and reports the outcome of each as JSON.

pub mod checker;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod probes;
pub mod routes;
pub mod state;

pub use checker::{HealthChecker, HealthReport, ProbeOutcome};
pub use config::{AppConfig, InstanceDescriptor, ServiceKind};
pub use error::ProbeError;
