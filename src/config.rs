//! Run configuration
//!
//! A [`SyncConfig`] is built once per invocation and handed to the
//! orchestrator by reference; nothing here is global.

use crate::error::{Result, SyncError};
use crate::staleness::StalenessPolicy;

/// Upper bound accepted for `max_files_in_flight`
pub const MAX_FILES_IN_FLIGHT_LIMIT: usize = 10_000;

/// Settings shared by every entry of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Staleness rule for top-level file pairs
    pub policy: StalenessPolicy,

    /// Leaf materializations allowed to run at once
    ///
    /// `1` processes entries strictly one after another.
    pub max_files_in_flight: usize,

    /// Show a progress spinner on stderr
    pub progress: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: StalenessPolicy::default(),
            max_files_in_flight: 1,
            progress: false,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn with_policy(mut self, policy: StalenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn with_max_files_in_flight(mut self, max_files_in_flight: usize) -> Self {
        self.max_files_in_flight = max_files_in_flight;
        self
    }

    /// Check bounds
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `max_files_in_flight` is outside
    /// `1..=10000`.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_FILES_IN_FLIGHT_LIMIT).contains(&self.max_files_in_flight) {
            return Err(SyncError::InvalidConfig(format!(
                "max files in flight must be between 1 and {}, got: {}",
                MAX_FILES_IN_FLIGHT_LIMIT, self.max_files_in_flight
            )));
        }
        Ok(())
    }
}
