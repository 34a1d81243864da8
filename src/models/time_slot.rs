//! Weekly time grid.
//!
//! The grid is fixed at five school days with six periods each.
//! Slots order by day, then period, so iterating a `BTreeMap` keyed
//! by slot walks the week chronologically.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TimetableError};

/// Number of teaching periods per day.
pub const PERIODS_PER_DAY: u8 = 6;

/// Number of school days per week.
pub const DAYS_PER_WEEK: usize = 5;

/// Total cells per class in one week.
pub const SLOTS_PER_WEEK: usize = DAYS_PER_WEEK * PERIODS_PER_DAY as usize;

/// School day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Day {
    /// All school days in week order.
    pub const ALL: [Day; DAYS_PER_WEEK] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    /// Short label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
        }
    }

    /// Slots of this day, period 1 first.
    pub fn slots(self) -> impl Iterator<Item = TimeSlot> {
        (1..=PERIODS_PER_DAY).map(move |period| TimeSlot { day: self, period })
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (day, period) cell of the weekly grid.
///
/// Periods are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    /// School day.
    pub day: Day,
    /// Period within the day (1..=6).
    pub period: u8,
}

impl TimeSlot {
    /// Creates a time slot.
    ///
    /// # Panics
    /// If `period` is outside `1..=PERIODS_PER_DAY`.
    pub fn new(day: Day, period: u8) -> Self {
        match Self::try_new(day, period) {
            Ok(slot) => slot,
            Err(e) => panic!("{e}"),
        }
    }

    /// Creates a time slot, rejecting out-of-range periods.
    pub fn try_new(day: Day, period: u8) -> Result<Self> {
        if (1..=PERIODS_PER_DAY).contains(&period) {
            Ok(Self { day, period })
        } else {
            Err(TimetableError::InvalidPeriod(period))
        }
    }

    /// Whether the period lies inside the daily grid.
    ///
    /// Always true for slots built with [`TimeSlot::new`]; deserialized
    /// slots are not checked.
    #[inline]
    pub fn is_in_grid(&self) -> bool {
        (1..=PERIODS_PER_DAY).contains(&self.period)
    }

    /// Every slot of the week in chronological order.
    pub fn all() -> impl Iterator<Item = TimeSlot> {
        Day::ALL.into_iter().flat_map(Day::slots)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.day, self.period)
    }
}
