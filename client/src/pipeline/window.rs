//! Time window that selects which resources are accounted in a run

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("records from/to and records period are mutually exclusive")]
    Conflicting,

    #[error("records from ({from}) is after records to ({to})")]
    Inverted {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// Window bounds as configured, before resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSelector {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub period: Option<TimeDelta>,
}

/// Resolved `[from, to]` interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl FilterWindow {
    /// Resolve the selector against `now`.
    ///
    /// - `period` alone: `[now - period, now]`
    /// - `from`/`to`: missing `from` is the zero time, missing `to` is `now`
    /// - `period` together with `from` or `to` is rejected
    pub fn resolve(selector: &WindowSelector, now: DateTime<Utc>) -> Result<Self, WindowError> {
        if selector.period.is_some() && (selector.from.is_some() || selector.to.is_some()) {
            return Err(WindowError::Conflicting);
        }

        let (from, to) = match selector.period {
            Some(period) => (
                now.checked_sub_signed(period).unwrap_or(DateTime::<Utc>::MIN_UTC),
                now,
            ),
            None => (
                selector.from.unwrap_or(DateTime::<Utc>::MIN_UTC),
                selector.to.unwrap_or(now),
            ),
        };

        if from > to {
            return Err(WindowError::Inverted { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Whether `[start, end]` overlaps the window; no `end` means still running.
    ///
    /// Both intervals are closed: an instance ending exactly at `from` or
    /// starting exactly at `to` overlaps.
    pub fn overlaps(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
        start <= self.to && end.is_none_or(|end| end >= self.from)
    }
}
