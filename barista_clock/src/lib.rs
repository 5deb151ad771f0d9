//! Clocks for token validation
//!
//! Token expiry is checked against a [`Clock`] rather than reading the
//! system time directly, so that tests can pin "now" with a [`TestClock`].

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_must_use
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{fmt, sync::Arc, time::SystemTime};

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Seconds elapsed since 1970-01-01T00:00:00Z
///
/// This is the representation used by the `exp`, `nbf` and `iat` claims.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

impl UnixTime {
    /// The time `secs` seconds later, saturating at the maximum
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// The time `secs` seconds earlier, saturating at the epoch
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}

impl From<SystemTime> for UnixTime {
    #[inline]
    fn from(t: SystemTime) -> Self {
        // A clock set before the epoch is treated as the epoch itself.
        let time = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        UnixTime(time)
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl Serialize for UnixTime {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> Deserialize<'de> for UnixTime {
    /// Fractional seconds are truncated
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UnixTimeVisitor)
    }
}

#[cfg(feature = "serde")]
struct UnixTimeVisitor;

#[cfg(feature = "serde")]
impl<'de> de::Visitor<'de> for UnixTimeVisitor {
    type Value = UnixTime;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative number of seconds since the epoch")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(UnixTime(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(UnixTime)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 {
            Ok(UnixTime(v.trunc() as u64))
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }
}

/// Something that can tell the current time
pub trait Clock {
    /// The current time according to this clock
    fn now(&self) -> UnixTime;
}

impl<T> Clock for &'_ T
where
    T: Clock + ?Sized,
{
    #[inline]
    fn now(&self) -> UnixTime {
        T::now(self)
    }
}

impl<T> Clock for Arc<T>
where
    T: Clock + ?Sized,
{
    #[inline]
    fn now(&self) -> UnixTime {
        T::now(self)
    }
}

/// The wall clock, as reported by [`SystemTime::now()`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A clock frozen at a chosen instant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestClock(UnixTime);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        self.0
    }
}

impl TestClock {
    /// Creates a clock stopped at `time`
    #[inline]
    pub const fn new(time: UnixTime) -> Self {
        Self(time)
    }

    /// Moves the clock to `val`
    pub fn set(&mut self, val: UnixTime) {
        self.0 = val;
    }

    /// Moves the clock forward by `inc` seconds
    pub fn inc(&mut self, inc: u64) {
        self.0 = self.0.saturating_add(inc);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn pre_epoch_system_time_is_the_epoch() {
        let before = SystemTime::UNIX_EPOCH - Duration::from_secs(30);
        assert_eq!(UnixTime::from(before), UnixTime(0));
    }

    #[test]
    fn test_clock_moves_only_when_told() {
        let mut clock = TestClock::new(UnixTime(1_000));
        assert_eq!(clock.now(), UnixTime(1_000));

        clock.inc(15);
        assert_eq!(clock.now(), UnixTime(1_015));

        clock.set(UnixTime(5));
        assert_eq!(clock.now(), UnixTime(5));
    }

    #[test]
    fn shared_clocks_delegate() {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(TestClock::new(UnixTime(42)));
        assert_eq!(clock.now(), UnixTime(42));
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(UnixTime(3).saturating_sub(10), UnixTime(0));
        assert_eq!(UnixTime(u64::MAX).saturating_add(1), UnixTime(u64::MAX));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_plain_seconds() {
        let t: UnixTime = serde_json::from_str("1700000000").unwrap();
        assert_eq!(t, UnixTime(1_700_000_000));
        assert_eq!(serde_json::to_string(&t).unwrap(), "1700000000");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn fractional_seconds_are_truncated() {
        let t: UnixTime = serde_json::from_str("1700003600.5").unwrap();
        assert_eq!(t, UnixTime(1_700_003_600));

        assert!(serde_json::from_str::<UnixTime>("-1").is_err());
        assert!(serde_json::from_str::<UnixTime>("-0.5").is_err());
        assert!(serde_json::from_str::<UnixTime>(r#""1700000000""#).is_err());
    }
}
