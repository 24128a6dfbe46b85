//! Lookback window selecting which profiles a sync run covers.

use std::{fmt, str::FromStr};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use crate::error::{GatewayError, Result};

/// Unit of a [`LookbackWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    /// `m`
    Minutes,
    /// `h`
    Hours,
    /// `d`
    Days,
}

impl WindowUnit {
    const fn suffix(self) -> char {
        match self {
            Self::Minutes => 'm',
            Self::Hours => 'h',
            Self::Days => 'd',
        }
    }
}

/// Relative window such as `30m`, `3h` or `2d`.
///
/// # Examples
///
/// ```
/// use billing_gateway::sync::LookbackWindow;
///
/// let window: LookbackWindow = "3h".parse().unwrap();
/// assert_eq!(window.duration().num_minutes(), 180);
///
/// // Anything unparseable means one hour.
/// let fallback = LookbackWindow::parse_or_default(Some("3w"));
/// assert_eq!(fallback, LookbackWindow::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    amount: u32,
    unit: WindowUnit,
    duration: TimeDelta,
}

impl LookbackWindow {
    /// Builds a window.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidWindow`] if the duration does not fit a
    /// [`TimeDelta`].
    pub fn new(amount: u32, unit: WindowUnit) -> Result<Self> {
        let amount_i64 = i64::from(amount);
        let duration = match unit {
            WindowUnit::Minutes => TimeDelta::try_minutes(amount_i64),
            WindowUnit::Hours => TimeDelta::try_hours(amount_i64),
            WindowUnit::Days => TimeDelta::try_days(amount_i64),
        }
        .ok_or_else(|| GatewayError::InvalidWindow(format!("{amount}{}", unit.suffix())))?;
        Ok(Self { amount, unit, duration })
    }

    /// Parses `input`, falling back to one hour with a warning when it is
    /// missing or malformed.
    #[must_use]
    pub fn parse_or_default(input: Option<&str>) -> Self {
        match input.map(str::parse::<Self>) {
            Some(Ok(window)) => window,
            Some(Err(e)) => {
                warn!(error = %e, "falling back to the default lookback window");
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Length of the window.
    #[must_use]
    pub const fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// Start of the window ending at `now`.
    #[must_use]
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.duration).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for LookbackWindow {
    fn default() -> Self {
        Self { amount: 1, unit: WindowUnit::Hours, duration: TimeDelta::hours(1) }
    }
}

impl FromStr for LookbackWindow {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GatewayError::InvalidWindow(s.to_owned());

        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let unit = match chars.next_back() {
            Some('m') => WindowUnit::Minutes,
            Some('h') => WindowUnit::Hours,
            Some('d') => WindowUnit::Days,
            _ => return Err(invalid()),
        };
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let amount = digits.parse::<u32>().map_err(|_| invalid())?;
        Self::new(amount, unit).map_err(|_| invalid())
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}
