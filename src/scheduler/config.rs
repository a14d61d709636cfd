//! Scheduler tuning knobs, resolved from [`crate::config::Config`].

use std::time::Duration;

use crate::config::SchedulerSettings;

/// Scheduler concurrency bounds and idle-poll cadence (§4.7).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Caps simultaneously RUNNING workers; `None` means unbounded, matching
    /// the source design (§4.7: "no explicit cap... imposes no explicit
    /// cap"), though a practical deployment should set one.
    pub max_concurrent: Option<usize>,
    /// Safety-poll interval for the idle wait (§4.7 step 5), ~100ms by default.
    pub idle_poll: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_concurrent: Some(8), idle_poll: Duration::from_millis(100) }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self { max_concurrent: settings.max_concurrent, idle_poll: Duration::from_millis(settings.idle_poll_ms) }
    }
}
