//! Bounded sliding windows with a running mean
//!
//! A window keeps `(timestamp, value)` samples in insertion order together with
//! their running sum. Which samples are retained is decided by a [`Retention`]
//! policy: a sample cap, a maximum age, or the YAML-configurable
//! [`WindowRetention`] that selects one of the two.

use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Decides when the oldest sample of a window has to go
pub trait Retention {
    /// `len` is the number of retained samples including `oldest`
    fn should_evict(&self, oldest: Instant, len: usize, now: Instant) -> bool;
}

/// Keep at most `n` samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxSamples(pub usize);

impl Retention for MaxSamples {
    fn should_evict(&self, _oldest: Instant, len: usize, _now: Instant) -> bool {
        len > self.0
    }
}

/// Keep samples no older than the given age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAge(pub Duration);

impl Retention for MaxAge {
    fn should_evict(&self, oldest: Instant, _len: usize, now: Instant) -> bool {
        now.saturating_duration_since(oldest) > self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionKind {
    Samples,
    Seconds,
}

/// Retention as it appears in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRetention {
    pub kind: RetentionKind,
    pub limit: u64,
}

impl WindowRetention {
    pub fn samples(limit: u64) -> Self {
        Self {
            kind: RetentionKind::Samples,
            limit,
        }
    }

    pub fn seconds(limit: u64) -> Self {
        Self {
            kind: RetentionKind::Seconds,
            limit,
        }
    }
}

impl Retention for WindowRetention {
    fn should_evict(&self, oldest: Instant, len: usize, now: Instant) -> bool {
        match self.kind {
            RetentionKind::Samples => {
                MaxSamples(usize::try_from(self.limit).unwrap_or(usize::MAX))
                    .should_evict(oldest, len, now)
            }
            RetentionKind::Seconds => {
                MaxAge(Duration::from_secs(self.limit)).should_evict(oldest, len, now)
            }
        }
    }
}

/// Running mean over a bounded window of samples
#[derive(Debug, Clone)]
pub struct SlidingWindow<R = WindowRetention> {
    samples: VecDeque<(Instant, f64)>,
    sum: f64,
    retention: R,
}

impl<R: Retention> SlidingWindow<R> {
    pub fn new(retention: R) -> Self {
        Self {
            samples: VecDeque::new(),
            sum: 0.0,
            retention,
        }
    }

    /// Insert a sample and evict whatever the retention policy no longer covers.
    ///
    /// Timestamps are expected to be non-decreasing; eviction always starts at
    /// the front of the window.
    pub fn add(&mut self, at: Instant, value: f64) {
        self.samples.push_back((at, value));
        self.sum += value;
        self.prune(at);
    }

    /// Evict expired samples without adding a new one
    pub fn prune(&mut self, now: Instant) {
        while let Some(&(oldest, value)) = self.samples.front() {
            if !self.retention.should_evict(oldest, self.samples.len(), now) {
                break;
            }
            self.samples.pop_front();
            self.sum -= value;
        }
        if self.samples.is_empty() {
            // Drop accumulated rounding error once nothing is left
            self.sum = 0.0;
        }
    }

    /// Mean of the retained samples
    pub fn average(&self) -> Result<f64> {
        if self.samples.is_empty() {
            return Err(HeliosError::EmptyWindow);
        }
        Ok(self.sum / self.samples.len() as f64)
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
