//! Delay between extraction requests.

use std::time::Duration;

use rand::Rng;

use crate::config::PacingConfig;

/// Decides how long to wait after item `index` before the next one.
pub trait Pacer: Send + Sync {
    fn wait_between(&self, index: usize) -> Duration;
}

/// Uniformly random delay within `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct RandomWindow {
    min: Duration,
    max: Duration,
}

impl RandomWindow {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_config(config: &PacingConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_ms),
            Duration::from_millis(config.max_ms),
        )
    }
}

impl Pacer for RandomWindow {
    fn wait_between(&self, _index: usize) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let millis = rand::rng().random_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn wait_between(&self, _index: usize) -> Duration {
        Duration::ZERO
    }
}
