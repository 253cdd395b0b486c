//! Per-identity sliding-window rate limiter

use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Sliding-window limiter tracking accepted requests over the last minute and hour.
///
/// Only accepted requests are recorded, so a rejected caller does not extend
/// its own lockout.
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: usize,
    per_hour: usize,
    usage: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            per_minute: config.per_minute,
            per_hour: config.per_hour,
            usage: Mutex::new(HashMap::new()),
        }
    }

    /// Check and record a request for `identity` at the current time
    pub fn allow(&self, identity: &str) -> bool {
        self.allow_at(identity, Instant::now())
    }

    /// Check and record a request for `identity` at `now`
    pub fn allow_at(&self, identity: &str, now: Instant) -> bool {
        // A poisoned lock only means another caller panicked mid-update;
        // the timestamp lists are still usable.
        let mut usage = self
            .usage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let timestamps = usage.entry(identity.to_string()).or_default();

        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) < HOUR {
                break;
            }
            timestamps.pop_front();
        }

        let last_minute = timestamps
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < MINUTE)
            .count();

        if last_minute >= self.per_minute {
            tracing::debug!(identity, last_minute, "per-minute limit reached");
            return false;
        }
        if timestamps.len() >= self.per_hour {
            tracing::debug!(identity, last_hour = timestamps.len(), "per-hour limit reached");
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Requests recorded for `identity` within the last hour of `now`
    pub fn recorded(&self, identity: &str, now: Instant) -> usize {
        let usage = self
            .usage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        usage
            .get(identity)
            .map(|ts| {
                ts.iter()
                    .filter(|t| now.saturating_duration_since(**t) < HOUR)
                    .count()
            })
            .unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}
