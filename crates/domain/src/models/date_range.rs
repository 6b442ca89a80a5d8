//! Calendar date ranges and the overlap test used for booking conflicts.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// How two ranges that touch on a single boundary day are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Closed intervals: a range ending on day D conflicts with one starting on D.
    #[default]
    Inclusive,
    /// A vehicle returned on day D may be picked up again on day D.
    SameDayTurnover,
}

impl BoundaryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryPolicy::Inclusive => "inclusive",
            BoundaryPolicy::SameDayTurnover => "same_day_turnover",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inclusive" => Some(BoundaryPolicy::Inclusive),
            "same_day_turnover" => Some(BoundaryPolicy::SameDayTurnover),
            _ => None,
        }
    }
}

/// An ordered pair of calendar dates, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a range from a start date and an optional end; a missing end
    /// collapses the range to the start day.
    pub fn open_ended(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, DomainError> {
        Self::new(start, end.unwrap_or(start))
    }

    /// Builds a range, pulling an end that precedes the start up to the start.
    pub fn clamped(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// First day after the range when it is read as half-open, never equal
    /// to the start.
    pub fn exclusive_end(&self) -> NaiveDate {
        half_open_end(self.start, self.end)
    }

    pub fn overlaps(&self, other: &DateRange, policy: BoundaryPolicy) -> bool {
        overlaps(self.start, self.end, other.start, other.end, policy)
    }
}

/// Returns true when `[a_start, a_end]` and `[b_start, b_end]` share a day
/// under the given boundary policy.
pub fn overlaps(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
    policy: BoundaryPolicy,
) -> bool {
    match policy {
        BoundaryPolicy::Inclusive => a_start <= b_end && b_start <= a_end,
        BoundaryPolicy::SameDayTurnover => {
            // Half-open [start, end), widened to at least one day.
            let a_end = half_open_end(a_start, a_end);
            let b_end = half_open_end(b_start, b_end);
            a_start < b_end && b_start < a_end
        }
    }
}

fn half_open_end(start: NaiveDate, end: NaiveDate) -> NaiveDate {
    if end > start {
        end
    } else {
        start.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
    }
}
