//! Expiration policy configuration

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenError};

/// Unit for an expiration duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Convert `amount` of this unit into a duration
    pub fn duration_of(self, amount: u64) -> Result<Duration> {
        let overflow =
            || TokenError::InvalidArgument(format!("{} {} is out of range", amount, self));
        let amount = i64::try_from(amount).map_err(|_| overflow())?;

        let duration = match self {
            TimeUnit::Nanoseconds => Some(Duration::nanoseconds(amount)),
            TimeUnit::Microseconds => Some(Duration::microseconds(amount)),
            TimeUnit::Milliseconds => Duration::try_milliseconds(amount),
            TimeUnit::Seconds => Duration::try_seconds(amount),
            TimeUnit::Minutes => Duration::try_minutes(amount),
            TimeUnit::Hours => Duration::try_hours(amount),
            TimeUnit::Days => Duration::try_days(amount),
        };

        duration.ok_or_else(overflow)
    }

    fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "NANOSECONDS",
            TimeUnit::Microseconds => "MICROSECONDS",
            TimeUnit::Milliseconds => "MILLISECONDS",
            TimeUnit::Seconds => "SECONDS",
            TimeUnit::Minutes => "MINUTES",
            TimeUnit::Hours => "HOURS",
            TimeUnit::Days => "DAYS",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanosecond" | "nanoseconds" => TimeUnit::Nanoseconds,
            "us" | "microsecond" | "microseconds" => TimeUnit::Microseconds,
            "ms" | "millisecond" | "milliseconds" => TimeUnit::Milliseconds,
            "s" | "sec" | "second" | "seconds" => TimeUnit::Seconds,
            "m" | "min" | "minute" | "minutes" => TimeUnit::Minutes,
            "h" | "hour" | "hours" => TimeUnit::Hours,
            "d" | "day" | "days" => TimeUnit::Days,
            _ => {
                return Err(TokenError::InvalidArgument(format!(
                    "Unknown time unit '{}'",
                    s
                )))
            }
        };
        Ok(unit)
    }
}

/// How long tokens stay valid after they are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationPolicy {
    pub duration: u64,
    pub unit: TimeUnit,
}

impl ExpirationPolicy {
    pub fn new(duration: u64, unit: TimeUnit) -> Self {
        Self { duration, unit }
    }

    /// Build a policy from optional parts; both must be present
    pub fn from_parts(duration: Option<u64>, unit: Option<TimeUnit>) -> Result<Self> {
        match (duration, unit) {
            (Some(duration), Some(unit)) => Ok(Self::new(duration, unit)),
            (duration, unit) => Err(TokenError::InvalidArgument(format!(
                "The token expiration must have both its duration ({}) and unit ({}) set.",
                display_part(duration),
                display_part(unit)
            ))),
        }
    }

    pub fn lifetime(&self) -> Result<Duration> {
        self.unit.duration_of(self.duration)
    }

    /// Expiration timestamp, in whole seconds, for a token issued at `issued_at`
    ///
    /// Rounded up so a token never lives shorter than the policy allows.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Result<i64> {
        let lifetime = self.lifetime()?;
        let expiry = issued_at.checked_add_signed(lifetime).ok_or_else(|| {
            TokenError::InvalidArgument(format!(
                "Expiration {} {} overflows the clock",
                self.duration, self.unit
            ))
        })?;

        let seconds = expiry.timestamp();
        if expiry.timestamp_subsec_nanos() > 0 {
            Ok(seconds + 1)
        } else {
            Ok(seconds)
        }
    }
}

fn display_part<T: fmt::Display>(part: Option<T>) -> String {
    part.map(|p| p.to_string())
        .unwrap_or_else(|| "null".to_string())
}
