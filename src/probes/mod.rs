//! Backing-service probes.
//!
//! Each probe opens its own connection from an [`InstanceDescriptor`], performs
//! one minimal read/write operation and releases the connection before
//! returning, on the error path too. Probes hold no state between calls.
//!
//! Key re-exports:
//! - [`MysqlProbe`] - `SELECT 1` round trip
//! - [`RedisProbe`] - SET/GET/DEL of a throwaway key
//! - [`ElasticsearchProbe`] - index a fixed document

mod elasticsearch;
mod mysql;
mod redis;

pub use self::elasticsearch::ElasticsearchProbe;
pub use self::mysql::MysqlProbe;
pub use self::redis::RedisProbe;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::InstanceDescriptor;
use crate::error::ProbeError;

/// Capability shared by every probe: connect with the given credentials and
/// prove the service is live.
///
/// On success the probe may return a value that is reported verbatim under
/// `"return"`.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, instance: &InstanceDescriptor) -> Result<Option<Value>, ProbeError>;
}
