//! Shared application state for request handlers.

use std::sync::Arc;

use crate::checker::HealthChecker;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// The checker is built once at startup from the loaded configuration and never
/// mutated afterwards; handlers do not reach back into the configuration.
#[derive(Clone)]
pub struct AppState {
    pub checker: Arc<HealthChecker>,
}

impl AppState {
    /// Creates a new application state around the given checker.
    pub fn new(checker: HealthChecker) -> Self {
        Self {
            checker: Arc::new(checker),
        }
    }
}
