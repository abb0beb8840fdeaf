use std::time::Duration;

use derive_builder::Builder;

/// How long a break waits for the client's acknowledgement.
pub const OPLOCK_STD_TIMEOUT: Duration = Duration::from_secs(30);
/// Ack wait when the breaking request's user also owns the oplock.
pub const OPLOCK_MIN_TIMEOUT: Duration = Duration::from_secs(5);
pub const OPLOCK_BREAK_WORKERS: usize = 64;

/// Tunables for an [`SMBOplockManager`](crate::server::SMBOplockManager).
///
/// Every field has a default, so `SMBOplockConfig::builder().build()` never fails.
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", default)]
pub struct SMBOplockConfig {
    /// Turning this off makes every open get no oplock. Clients then issue
    /// far more (and far smaller) reads, so this is for testing only.
    enabled: bool,
    /// When off, at most a level II oplock is ever granted.
    exclusive_oplocks: bool,
    break_timeout: Duration,
    min_break_timeout: Duration,
    break_workers: usize,
}

impl Default for SMBOplockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclusive_oplocks: true,
            break_timeout: OPLOCK_STD_TIMEOUT,
            min_break_timeout: OPLOCK_MIN_TIMEOUT,
            break_workers: OPLOCK_BREAK_WORKERS,
        }
    }
}

impl SMBOplockConfig {
    pub fn builder() -> SMBOplockConfigBuilder {
        SMBOplockConfigBuilder::default()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn exclusive_oplocks(&self) -> bool {
        self.exclusive_oplocks
    }

    pub fn break_timeout(&self) -> Duration {
        self.break_timeout
    }

    pub fn min_break_timeout(&self) -> Duration {
        self.min_break_timeout
    }

    pub fn break_workers(&self) -> usize {
        self.break_workers.max(1)
    }
}
