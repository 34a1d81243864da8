//! Constraint-satisfaction engine for weekly school timetables.
//!
//! Places (subject, teacher) lessons into a 5-day × 6-period grid per
//! class so that weekly hours are met and school rules hold: no teacher
//! double-booking, same-day subject caps, an exclusive shared facility,
//! synchronized class groups, and exchange/parent class pairings.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeSlot`, `ClassRef`, `Assignment`,
//!   `Schedule`, `School`, `Rules`, `AbsenceCalendar`, `Violation`
//! - **`constraints`**: `ConstraintValidator`, incremental placement
//!   checks and whole-schedule audits
//! - **`csp`**: Domain building and backtracking search (MRV, LCV,
//!   propagation)
//! - **`repair`**: Local search that reduces violations of a finished
//!   schedule
//! - **`report`**: Quality indicators for a schedule
//! - **`validation`**: Input integrity checks (duplicates, unknown
//!   classes, unstaffed subjects)
//!
//! # Pipeline
//!
//! ```text
//! validate_input → CspSolver::solve → RepairOptimizer::optimize → ScheduleReport
//! ```
//!
//! # References
//!
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", ch. 6
//! - Schaerf (1999), "A Survey of Automated Timetabling"

pub mod constraints;
pub mod csp;
pub mod error;
pub mod models;
pub mod repair;
pub mod report;
pub mod validation;

pub use error::{Result, TimetableError};
