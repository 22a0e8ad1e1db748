//! Result wrapper and the ordered set of dependency checks.
//!
//! [`run_probe`] is the only error boundary between probes and the HTTP layer:
//! whatever a probe does (fail, hang past the timeout, panic) comes back as a
//! [`ProbeOutcome`]. [`HealthChecker`] runs every configured check in order and
//! collects the outcomes into a [`HealthReport`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::Instrument;

use crate::config::{AppConfig, ConfigError, InstanceDescriptor, ServiceKind};
use crate::error::ProbeError;
use crate::probes::{ElasticsearchProbe, MysqlProbe, Probe, RedisProbe};

/// Normalized outcome of one probe.
///
/// Serializes as `{"status": "OK", "return": ...}` or
/// `{"status": "ERROR", "error": [...]}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum ProbeOutcome {
    Ok {
        #[serde(rename = "return")]
        value: Option<Value>,
    },
    Error {
        error: Vec<String>,
    },
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok { .. })
    }
}

impl From<Result<Option<Value>, ProbeError>> for ProbeOutcome {
    fn from(result: Result<Option<Value>, ProbeError>) -> Self {
        match result {
            Ok(value) => ProbeOutcome::Ok { value },
            Err(e) => ProbeOutcome::Error { error: e.trace() },
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run one probe against one instance and normalize the outcome.
pub async fn run_probe(
    probe: &dyn Probe,
    instance: &InstanceDescriptor,
    timeout: Duration,
) -> ProbeOutcome {
    let guarded = AssertUnwindSafe(probe.check(instance)).catch_unwind();

    let result = match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => Err(ProbeError::Panicked(panic_message(payload))),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    };

    result.into()
}

/// One entry of the dependency report.
#[derive(Clone)]
struct Check {
    kind: ServiceKind,
    probe: Arc<dyn Probe>,
    instance: InstanceDescriptor,
}

/// Ordered checks plus the per-probe timeout, shared by all requests.
#[derive(Clone)]
pub struct HealthChecker {
    checks: Vec<Check>,
    timeout: Duration,
}

impl HealthChecker {
    /// Empty checker; add checks with [`HealthChecker::with_check`].
    pub fn new(timeout: Duration) -> Self {
        Self {
            checks: Vec::new(),
            timeout,
        }
    }

    pub fn with_check(
        mut self,
        kind: ServiceKind,
        probe: Arc<dyn Probe>,
        instance: InstanceDescriptor,
    ) -> Self {
        self.checks.push(Check {
            kind,
            probe,
            instance,
        });
        self
    }

    /// Wire the production probes against the first bound instance of each kind.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut checker = Self::new(config.probes.timeout());

        for kind in ServiceKind::ALL {
            let instance = config.relationships.first(kind).cloned().ok_or_else(|| {
                ConfigError::Validation(format!("no instance bound for '{}'", kind))
            })?;

            let probe: Arc<dyn Probe> = match kind {
                ServiceKind::Mysql => Arc::new(MysqlProbe::new()),
                ServiceKind::Redis => Arc::new(RedisProbe::new()),
                ServiceKind::Elasticsearch => Arc::new(ElasticsearchProbe::new()?),
            };

            checker = checker.with_check(kind, probe, instance);
        }

        Ok(checker)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Kinds checked, in report order
    pub fn kinds(&self) -> impl Iterator<Item = ServiceKind> + '_ {
        self.checks.iter().map(|check| check.kind)
    }

    /// Run every check sequentially, in order.
    pub async fn run_all(&self) -> HealthReport {
        let mut entries = Vec::with_capacity(self.checks.len());

        for check in &self.checks {
            let span = tracing::debug_span!(
                "probe",
                service = %check.kind,
                host = %check.instance.host,
            );

            let outcome = async {
                let start = Instant::now();
                let outcome = run_probe(check.probe.as_ref(), &check.instance, self.timeout).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;

                match &outcome {
                    ProbeOutcome::Ok { .. } => {
                        tracing::debug!(elapsed_ms, "Probe succeeded");
                    }
                    ProbeOutcome::Error { error } => {
                        tracing::warn!(
                            elapsed_ms,
                            error = error.first().map(String::as_str).unwrap_or_default(),
                            "Probe failed"
                        );
                    }
                }

                outcome
            }
            .instrument(span)
            .await;

            entries.push((check.kind, outcome));
        }

        HealthReport { entries }
    }
}

/// Outcome per service kind, serialized as a JSON object in check order.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    entries: Vec<(ServiceKind, ProbeOutcome)>,
}

impl HealthReport {
    pub fn get(&self, kind: ServiceKind) -> Option<&ProbeOutcome> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| !outcome.is_ok())
            .count()
    }
}

impl Serialize for HealthReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (kind, outcome) in &self.entries {
            map.serialize_entry(kind.as_str(), outcome)?;
        }
        map.end()
    }
}
