//! Readiness poll contract
//!
//! Each resource kind declares how patient its host should be: wait
//! `initial_delay`, then check readiness at most `attempts` times with
//! `period` between checks. These are per-kind tuning constants, not a
//! universal default: a notification topic settles in seconds while a
//! provisioned database cluster can take fifteen minutes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll schedule consumed by the host's scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds to wait before the first readiness check.
    pub initial_delay_secs: u64,

    /// Seconds between readiness checks.
    pub period_secs: u64,

    /// Maximum number of readiness checks.
    pub attempts: u32,
}

impl PollConfig {
    pub const fn new(initial_delay_secs: u64, period_secs: u64, attempts: u32) -> Self {
        Self {
            initial_delay_secs,
            period_secs,
            attempts,
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Upper bound on the wall-clock time a host spends polling before
    /// giving up.
    pub fn total_wait(&self) -> Duration {
        self.initial_delay() + self.period() * self.attempts.saturating_sub(1)
    }
}

impl Default for PollConfig {
    /// A middle-of-the-road schedule; resource kinds are expected to
    /// declare their own.
    fn default() -> Self {
        Self::new(5, 10, 30)
    }
}
