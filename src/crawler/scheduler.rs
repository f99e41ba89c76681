//! Request pacing
//!
//! This module handles:
//! - Random politeness delays between requests
//! - Longer pauses after each batch of articles and after failed search pages

use crate::config::PolitenessConfig;
use rand::Rng;
use std::time::Duration;

/// Politeness timing shared by the paginator and the coordinator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    /// Lower bound of the random delay (seconds)
    delay_min: f64,

    /// Upper bound of the random delay (seconds)
    delay_max: f64,

    /// Fixed pause after a batch or a failed page
    batch_pause: Duration,

    /// Articles per batch
    batch_size: usize,
}

impl Pacer {
    pub fn new(delay_min: f64, delay_max: f64, batch_pause: f64, batch_size: usize) -> Self {
        let delay_min = delay_min.max(0.0);
        Self {
            delay_min,
            delay_max: delay_max.max(delay_min),
            batch_pause: Duration::from_secs_f64(batch_pause.max(0.0)),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &PolitenessConfig) -> Self {
        Self::new(
            config.request_delay_min,
            config.request_delay_max,
            config.batch_pause,
            config.batch_size,
        )
    }

    /// A pacer that never sleeps
    pub fn immediate() -> Self {
        Self::new(0.0, 0.0, 0.0, 1)
    }

    /// Draws a delay uniformly from `[delay_min, delay_max]`
    pub fn politeness_delay(&self) -> Duration {
        if self.delay_max <= self.delay_min {
            return Duration::from_secs_f64(self.delay_min);
        }
        let secs = rand::rng().random_range(self.delay_min..=self.delay_max);
        Duration::from_secs_f64(secs)
    }

    pub fn batch_pause(&self) -> Duration {
        self.batch_pause
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sleeps for a random politeness delay
    pub async fn pause(&self) {
        // drawn before the await; the thread rng is not Send
        let delay = self.politeness_delay();
        sleep_unless_zero(delay).await;
    }

    /// Sleeps for the batch pause
    pub async fn pause_batch(&self) {
        sleep_unless_zero(self.batch_pause).await;
    }
}

async fn sleep_unless_zero(delay: Duration) {
    if !delay.is_zero() {
        tracing::trace!("Sleeping {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}
