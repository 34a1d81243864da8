//! Error types for u-timetable.
//!
//! Only invariant breaches and malformed input surface as errors.
//! Rejected placements are [`Rejection`](crate::constraints::Rejection)
//! values and schedule audits produce [`Violation`](crate::models::Violation)s.

use thiserror::Error;

use crate::models::{ClassRef, TimeSlot};

/// Main error type for timetable operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimetableError {
    /// Attempted to write or clear a locked cell.
    #[error("cell {slot} / {class_ref} is locked")]
    CellLocked { slot: TimeSlot, class_ref: ClassRef },

    /// Attempted to assign into a cell that already holds an assignment.
    #[error("cell {slot} / {class_ref} is already occupied")]
    CellOccupied { slot: TimeSlot, class_ref: ClassRef },

    /// Period outside `1..=PERIODS_PER_DAY`.
    #[error("period {0} is outside the daily grid")]
    InvalidPeriod(u8),

    /// Configuration that cannot be used as given.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for timetable operations.
pub type Result<T> = std::result::Result<T, TimetableError>;
