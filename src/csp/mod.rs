//! Constraint-satisfaction search.
//!
//! Each open (slot, class) cell of a schedule is a variable whose values
//! are (subject, teacher) pairs. [`DomainBuilder`] derives the legal
//! values from the current schedule; [`CspSolver`] runs backtracking
//! search over them.
//!
//! # Domain Mappings
//!
//! | CSP | Timetable |
//! |-----|-----------|
//! | Variable | Open (slot, class) cell |
//! | Value | (subject, teacher) |
//! | Constraint | Placement rules of the validator |
//! | Wipeout | A class can no longer meet its weekly hours |

mod domain;
mod solver;

pub use domain::{CspVariable, Domain, DomainBuilder, DomainValue};
pub use solver::{
    CspSolver, SolveOutcome, SolverConfig, SolverStats, UnmetDemand, ValueOrder, VariableOrder,
};
