//! Failures raised by backing-service probes.
//!
//! Probes return [`ProbeError`] and never panic on expected failures. The
//! result wrapper in [`crate::checker`] turns any of these into the `ERROR`
//! variant of the report, using [`ProbeError::trace`] as the diagnostic.

use std::error::Error as StdError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("MySQL error: {0}")]
    Mysql(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Elasticsearch request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Value mismatch: wrote {expected:?}, read {actual:?}")]
    Mismatch {
        expected: String,
        actual: Option<String>,
    },

    #[error("Probe timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Probe panicked: {0}")]
    Panicked(String),
}

impl ProbeError {
    /// Short name of the variant, used as the first token of the trace
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Mysql(_) => "MysqlError",
            ProbeError::Redis(_) => "RedisError",
            ProbeError::Http(_) => "HttpError",
            ProbeError::UnexpectedResponse(_) => "UnexpectedResponse",
            ProbeError::Mismatch { .. } => "Mismatch",
            ProbeError::Timeout(_) => "Timeout",
            ProbeError::Panicked(_) => "Panicked",
        }
    }

    /// Render the error and its source chain, outermost first.
    ///
    /// The first line is `"<kind>: <message>"`; each following line is one
    /// `caused by:` entry. Sources whose message repeats the previous line are
    /// skipped, since the `#[from]` wrappers already embed them.
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", self.kind(), self)];
        let mut previous = self.to_string();
        let mut source = self.source();

        while let Some(err) = source {
            let message = err.to_string();
            if !previous.contains(&message) {
                lines.push(format!("caused by: {}", message));
            }
            previous = message;
            source = err.source();
        }

        lines
    }
}
