//! Poll scheduling strategies

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Status poll cadence
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Decides how long to wait before the next status poll
pub trait BackoffStrategy: Send + Sync + Debug {
    fn next_delay(&self, consecutive_failures: u32) -> Duration;
}

/// Poll on a fixed cadence regardless of failures
#[derive(Debug, Clone)]
pub struct FixedInterval {
    pub interval: Duration,
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
        }
    }
}

impl BackoffStrategy for FixedInterval {
    fn next_delay(&self, _consecutive_failures: u32) -> Duration {
        self.interval
    }
}

/// Double the delay for every consecutive failure, up to a cap
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub cooldown: CooldownOptions,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            cooldown: CooldownOptions {
                base_delay: POLL_INTERVAL,
                ..Default::default()
            },
        }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, consecutive_failures: u32) -> Duration {
        calc_exp_backoff(&self.cooldown, consecutive_failures)
    }
}

/// Backoff strategy selection in settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

impl BackoffKind {
    pub fn build(&self) -> Arc<dyn BackoffStrategy> {
        match self {
            BackoffKind::Fixed => Arc::new(FixedInterval::default()),
            BackoffKind::Exponential => Arc::new(ExponentialBackoff::default()),
        }
    }
}
