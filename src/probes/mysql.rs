//! Relational-store probe.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};

use super::Probe;
use crate::config::{InstanceDescriptor, MYSQL_DEFAULT_PORT};
use crate::error::ProbeError;

const PROBE_QUERY: &str = "SELECT 1";

/// Opens a single connection, runs `SELECT 1` and fetches the row.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlProbe;

impl MysqlProbe {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(instance: &InstanceDescriptor) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&instance.host)
            .port(instance.port_or(MYSQL_DEFAULT_PORT))
            .charset("utf8mb4");

        if let Some(username) = &instance.username {
            options = options.username(username);
        }
        if let Some(password) = &instance.password {
            options = options.password(password);
        }
        if let Some(database) = &instance.path {
            options = options.database(database);
        }

        options
    }

    /// Map the scalar returned by the probe query onto the probe result
    fn verify_row(value: i64) -> Result<Option<Value>, ProbeError> {
        match value {
            1 => Ok(None),
            other => Err(ProbeError::UnexpectedResponse(format!(
                "{} returned {}",
                PROBE_QUERY, other
            ))),
        }
    }
}

#[async_trait]
impl Probe for MysqlProbe {
    async fn check(&self, instance: &InstanceDescriptor) -> Result<Option<Value>, ProbeError> {
        let mut conn: MySqlConnection = Self::connect_options(instance).connect().await?;

        let row = sqlx::query_scalar::<_, i64>(PROBE_QUERY)
            .fetch_one(&mut conn)
            .await;

        // Close before inspecting the query result so the error path releases too
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, host = %instance.host, "Failed to close MySQL connection cleanly");
        }

        Self::verify_row(row?)
    }
}
