//! Per-anchor distance samples with freshness tracking

use crate::core::constants::DEFAULT_MAX_SAMPLE_AGE_SECS;
use std::time::{Duration, Instant};

/// Latest and previous distance reported by one anchor for one tracked entity
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSample {
    current: Option<f64>,
    previous: Option<f64>,
    last_update: Instant,
}

impl DistanceSample {
    pub fn new(distance: Option<f64>) -> Self {
        Self::new_at(distance, Instant::now())
    }

    pub fn new_at(distance: Option<f64>, now: Instant) -> Self {
        Self {
            current: distance,
            previous: None,
            last_update: now,
        }
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// Shift the current reading into history and store the new one
    pub fn update(&mut self, distance: Option<f64>) {
        self.update_at(distance, Instant::now());
    }

    pub fn update_at(&mut self, distance: Option<f64>, now: Instant) {
        self.previous = self.current;
        self.current = distance;
        self.last_update = now;
    }

    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_update)
    }

    /// Fresh within the default 120 second window
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(
            Duration::from_secs(DEFAULT_MAX_SAMPLE_AGE_SECS),
            Instant::now(),
        )
    }

    pub fn is_fresh_at(&self, max_age: Duration, now: Instant) -> bool {
        self.age_at(now) <= max_age
    }
}
