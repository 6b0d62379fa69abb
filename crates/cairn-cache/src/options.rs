//! TTL and per-call cache options.

use cairn_config::CacheConfig;
use std::time::Duration;

/// Unit an amount of [`Ttl`] is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Milliseconds in one unit.
    #[must_use]
    pub const fn millis_per_unit(self) -> i64 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }
}

/// Time-to-live attached to a write.
///
/// An amount of zero or less means the entry never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ttl {
    pub amount: i64,
    pub unit: TimeUnit,
}

impl Ttl {
    /// No expiration.
    pub const NONE: Self = Self::new(0, TimeUnit::Seconds);

    #[must_use]
    pub const fn new(amount: i64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    #[must_use]
    pub const fn millis(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Milliseconds)
    }

    #[must_use]
    pub const fn seconds(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Seconds)
    }

    #[must_use]
    pub const fn minutes(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Minutes)
    }

    #[must_use]
    pub const fn hours(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Hours)
    }

    #[must_use]
    pub const fn days(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Days)
    }

    /// Whether this TTL arms an expiration at all.
    #[must_use]
    pub const fn expires(&self) -> bool {
        self.amount > 0
    }

    /// Converts to a duration, or `None` when the entry should not expire.
    #[must_use]
    pub fn as_duration(&self) -> Option<Duration> {
        if !self.expires() {
            return None;
        }
        let millis = self.amount.saturating_mul(self.unit.millis_per_unit());
        u64::try_from(millis).ok().map(Duration::from_millis)
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Self::millis(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Options shared by every cache-aside operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL applied when a computed result is stored.
    pub ttl: Ttl,
    /// Store an empty sequence or mapping as a sentinel instead of skipping it.
    pub cache_empty: bool,
}

impl CacheOptions {
    #[must_use]
    pub const fn new(ttl: Ttl) -> Self {
        Self {
            ttl,
            cache_empty: false,
        }
    }

    /// Options with a TTL in seconds.
    #[must_use]
    pub const fn seconds(amount: i64) -> Self {
        Self::new(Ttl::seconds(amount))
    }

    /// Reinterprets the TTL amount in another unit.
    #[must_use]
    pub const fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.ttl.unit = unit;
        self
    }

    /// Sets the empty-result policy.
    #[must_use]
    pub const fn cache_empty(mut self, cache_empty: bool) -> Self {
        self.cache_empty = cache_empty;
        self
    }

    /// Builds options from configured defaults.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::seconds(config.default_ttl_secs).cache_empty(config.cache_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_ttl_never_expires() {
        assert_eq!(Ttl::seconds(0).as_duration(), None);
        assert_eq!(Ttl::seconds(-10).as_duration(), None);
        assert_eq!(Ttl::NONE.as_duration(), None);
        assert!(!Ttl::default().expires());
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(Ttl::seconds(600).as_duration(), Some(Duration::from_secs(600)));
        assert_eq!(Ttl::millis(250).as_duration(), Some(Duration::from_millis(250)));
        assert_eq!(Ttl::minutes(2).as_duration(), Some(Duration::from_secs(120)));
        assert_eq!(Ttl::hours(1).as_duration(), Some(Duration::from_secs(3_600)));
        assert_eq!(Ttl::days(1).as_duration(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let ttl = Ttl::days(i64::MAX);
        assert_eq!(ttl.as_duration(), Some(Duration::from_millis(i64::MAX as u64)));
    }

    #[test]
    fn test_options_defaults() {
        let options = CacheOptions::seconds(60);
        assert_eq!(options.ttl, Ttl::seconds(60));
        assert!(!options.cache_empty);

        let minutes = CacheOptions::seconds(5).with_unit(TimeUnit::Minutes).cache_empty(true);
        assert_eq!(minutes.ttl.as_duration(), Some(Duration::from_secs(300)));
        assert!(minutes.cache_empty);
    }

    #[test]
    fn test_options_from_config() {
        let config = CacheConfig {
            default_ttl_secs: 90,
            cache_empty: true,
        };
        let options = CacheOptions::from_config(&config);
        assert_eq!(options.ttl, Ttl::seconds(90));
        assert!(options.cache_empty);
    }
}
