//! Cache entries and the freshness policy applied to them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::error::{CacheError, Result};
use super::DataPayload;

/// Entries are fresh for 5 minutes.
pub const CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

/// Entries are served stale (with a background refresh) for up to 10 minutes.
pub const STALE_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Timeout for a single load against the persistent store.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Delay before a background refresh starts, decoupling it from the caller.
pub const REFRESH_DELAY: Duration = Duration::from_millis(100);

/// Warm snapshots older than this are ignored.
pub const WARM_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound for every policy duration, so deadlines stay representable.
pub const MAX_POLICY_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Timing knobs for the data cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub cache_duration: Duration,
    pub stale_window: Duration,
    pub fetch_timeout: Duration,
    pub refresh_delay: Duration,
    pub warm_max_age: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            cache_duration: CACHE_DURATION,
            stale_window: STALE_WINDOW,
            fetch_timeout: FETCH_TIMEOUT,
            refresh_delay: REFRESH_DELAY,
            warm_max_age: WARM_MAX_AGE,
        }
    }
}

impl CachePolicy {
    /// Build a policy, rejecting a stale window that does not outlast the
    /// fresh period.
    pub fn new(cache_duration: Duration, stale_window: Duration) -> Result<Self> {
        let policy = Self {
            cache_duration,
            stale_window,
            ..Self::default()
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn with_warm_max_age(mut self, age: Duration) -> Self {
        self.warm_max_age = age;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("cache duration", self.cache_duration),
            ("stale window", self.stale_window),
            ("fetch timeout", self.fetch_timeout),
            ("refresh delay", self.refresh_delay),
            ("warm max age", self.warm_max_age),
        ];
        for (name, value) in durations {
            if value > MAX_POLICY_DURATION {
                return Err(CacheError::InvalidPolicy(format!(
                    "{} ({}s) exceeds the maximum of {}s",
                    name,
                    value.as_secs(),
                    MAX_POLICY_DURATION.as_secs()
                )));
            }
        }
        if self.stale_window <= self.cache_duration {
            return Err(CacheError::InvalidPolicy(format!(
                "stale window ({}s) must be longer than cache duration ({}s)",
                self.stale_window.as_secs(),
                self.cache_duration.as_secs()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Younger than the cache duration: serve as is.
    Fresh,
    /// Past the cache duration but inside the stale window: serve and refresh.
    Stale,
    /// Past the stale window: reload before serving.
    Expired,
}

/// Cached payload for one `DataKind`. Replaced wholesale on every successful
/// load, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Arc<DataPayload>,
    pub timestamp: Instant,
    pub expires_at: Instant,
    /// Wall-clock time of the fetch, for display
    pub cached_at: DateTime<Utc>,
    /// Load sequence number; newer loads carry larger versions
    pub version: u64,
}

impl CacheEntry {
    pub fn new(data: Arc<DataPayload>, version: u64, policy: &CachePolicy) -> Self {
        Self::at(data, version, Instant::now(), policy)
    }

    pub fn at(data: Arc<DataPayload>, version: u64, timestamp: Instant, policy: &CachePolicy) -> Self {
        Self {
            data,
            timestamp,
            expires_at: timestamp + policy.cache_duration,
            cached_at: Utc::now(),
            version,
        }
    }

    pub fn freshness_at(&self, now: Instant, policy: &CachePolicy) -> Freshness {
        if now < self.expires_at {
            Freshness::Fresh
        } else if now < self.timestamp + policy.stale_window {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    pub fn freshness(&self, policy: &CachePolicy) -> Freshness {
        self.freshness_at(Instant::now(), policy)
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        age_display(self.age_minutes())
    }
}

/// Format an age in minutes as "just now", "5m ago", "2h ago" or "3d ago".
pub fn age_display(minutes: i64) -> String {
    if minutes < 1 {
        // Negative ages come from clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}
