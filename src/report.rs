//! Timetable quality report.
//!
//! Summarizes a schedule against the school's requirements and rules.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Filled cells | Cells holding an assignment |
//! | Locked cells | Cells frozen before solving |
//! | Empty cells | Grid cells of known classes with no assignment |
//! | Shortfall | Required hours minus placed hours, per (class, subject) |
//! | Violations | Findings of the whole-schedule audit |
//! | Fill rate | Filled / total grid cells of known classes |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintValidator;
use crate::models::{ClassRef, Rules, Schedule, School, Subject, TimeSlot, SLOTS_PER_WEEK};

/// Hours a class still misses for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// Class below its hours.
    pub class_ref: ClassRef,
    /// Subject below its hours.
    pub subject: Subject,
    /// Standard weekly hours.
    pub required: u32,
    /// Hours placed in the schedule.
    pub placed: u32,
}

impl Shortfall {
    /// Missing hours.
    pub fn missing(&self) -> u32 {
        self.required.saturating_sub(self.placed)
    }
}

/// Schedule quality indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    /// Cells holding an assignment.
    pub filled_cells: usize,
    /// Locked cells, empty or not.
    pub locked_cells: usize,
    /// Grid cells of known classes left empty.
    pub empty_cells: usize,
    /// Subjects below their standard hours, in class order.
    pub shortfalls: Vec<Shortfall>,
    /// Sum of missing hours.
    pub total_shortfall: u32,
    /// Findings of the whole-schedule audit.
    pub violation_count: usize,
    /// Fraction of grid cells filled (0.0..1.0).
    pub fill_rate: f64,
}

impl ScheduleReport {
    /// Computes the report.
    ///
    /// # Arguments
    /// * `schedule` - The timetable to assess.
    /// * `school` - Classes and their required hours.
    /// * `rules` - Rule set for the violation audit.
    pub fn calculate(schedule: &Schedule, school: &School, rules: &Rules) -> Self {
        let classes: BTreeSet<ClassRef> = school.all_classes().iter().copied().collect();
        let total_cells = classes.len() * SLOTS_PER_WEEK;

        let mut filled = 0;
        for &class_ref in &classes {
            filled += TimeSlot::all()
                .filter(|&s| schedule.is_occupied(s, class_ref))
                .count();
        }

        let mut shortfalls = Vec::new();
        for &class_ref in &classes {
            for req in school.requirements(class_ref) {
                let placed = schedule.placed_hours(class_ref, &req.subject);
                if placed < req.hours {
                    shortfalls.push(Shortfall {
                        class_ref,
                        subject: req.subject.clone(),
                        required: req.hours,
                        placed,
                    });
                }
            }
        }
        let total_shortfall = shortfalls.iter().map(Shortfall::missing).sum();

        let violation_count = ConstraintValidator::new(school, rules).violation_count(schedule);

        let fill_rate = if total_cells == 0 {
            0.0
        } else {
            filled as f64 / total_cells as f64
        };

        Self {
            filled_cells: filled,
            locked_cells: schedule.locked_count(),
            empty_cells: total_cells - filled,
            shortfalls,
            total_shortfall,
            violation_count,
            fill_rate,
        }
    }

    /// No violations and no missing hours.
    pub fn is_feasible(&self) -> bool {
        self.violation_count == 0 && self.total_shortfall == 0
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_violations: usize, max_shortfall: u32) -> bool {
        self.violation_count <= max_violations && self.total_shortfall <= max_shortfall
    }
}
