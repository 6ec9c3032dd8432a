//! Account bans.
//!
//! Ban lengths come from a picker with fixed presets (`24h`, `3d`, `7d`,
//! `30d`, `permanent`) plus custom `Nh` / `Nd` values. Anything longer than a
//! year has to be issued as permanent.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountRef, AdminUserId, BanId};

/// Longest timed ban, in days.
pub const MAX_TIMED_BAN_DAYS: u32 = 365;

/// Errors from parsing or validating a [`BanDuration`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BanDurationError {
    #[error("ban duration must be greater than zero")]
    Zero,
    #[error("timed bans cannot exceed {MAX_TIMED_BAN_DAYS} days; use a permanent ban")]
    TooLong,
    #[error("invalid ban duration: {0}")]
    Invalid(String),
}

/// How long a ban lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BanDuration {
    Hours(u32),
    Days(u32),
    Permanent,
}

impl BanDuration {
    /// Picker presets in display order.
    pub const PRESETS: [Self; 5] = [
        Self::Hours(24),
        Self::Days(3),
        Self::Days(7),
        Self::Days(30),
        Self::Permanent,
    ];

    /// Check bounds.
    ///
    /// # Errors
    ///
    /// `BanDurationError::Zero` for zero-length and `BanDurationError::TooLong`
    /// for timed bans over [`MAX_TIMED_BAN_DAYS`].
    pub fn validate(self) -> Result<Self, BanDurationError> {
        let hours = match self {
            Self::Permanent => return Ok(self),
            Self::Hours(h) => u64::from(h),
            Self::Days(d) => u64::from(d) * 24,
        };
        if hours == 0 {
            return Err(BanDurationError::Zero);
        }
        if hours > u64::from(MAX_TIMED_BAN_DAYS) * 24 {
            return Err(BanDurationError::TooLong);
        }
        Ok(self)
    }

    /// When a ban starting at `start` ends; `None` for permanent bans.
    #[must_use]
    pub fn ends_at(self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Hours(h) => Some(start + Duration::hours(i64::from(h))),
            Self::Days(d) => Some(start + Duration::days(i64::from(d))),
            Self::Permanent => None,
        }
    }

    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }
}

impl fmt::Display for BanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hours(h) => write!(f, "{h}h"),
            Self::Days(d) => write!(f, "{d}d"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

impl FromStr for BanDuration {
    type Err = BanDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "permanent" {
            return Ok(Self::Permanent);
        }

        let invalid = || BanDurationError::Invalid(s.clone());
        let duration = if let Some(hours) = s.strip_suffix('h') {
            Self::Hours(hours.parse().map_err(|_| invalid())?)
        } else if let Some(days) = s.strip_suffix('d') {
            Self::Days(days.parse().map_err(|_| invalid())?)
        } else {
            return Err(invalid());
        };
        duration.validate()
    }
}

impl TryFrom<String> for BanDuration {
    type Error = BanDurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BanDuration> for String {
    fn from(value: BanDuration) -> Self {
        value.to_string()
    }
}

/// A ban issued by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ban {
    pub id: BanId,
    pub target: AccountRef,
    pub reason: String,
    pub starts_at: DateTime<Utc>,
    /// `None` for permanent bans.
    pub ends_at: Option<DateTime<Utc>>,
    pub lifted_at: Option<DateTime<Utc>>,
    pub issued_by: AdminUserId,
}

impl Ban {
    /// Whether the ban is in force at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.lifted_at.is_some_and(|lifted| lifted <= now) {
            return false;
        }
        if now < self.starts_at {
            return false;
        }
        self.ends_at.is_none_or(|end| now < end)
    }

    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.ends_at.is_none()
    }
}
