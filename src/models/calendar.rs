//! Teacher absence calendar.
//!
//! Records the slots at which a teacher cannot teach. A teacher with
//! no entry is always available.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{Day, Teacher, TimeSlot};

/// Per-teacher blocked slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceCalendar {
    blocked: BTreeMap<Teacher, BTreeSet<TimeSlot>>,
}

impl AbsenceCalendar {
    /// Creates an empty calendar (everyone available).
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks a single slot.
    pub fn with_absence(mut self, teacher: impl Into<Teacher>, slot: TimeSlot) -> Self {
        self.add_absence(teacher, slot);
        self
    }

    /// Blocks a whole day.
    pub fn with_absent_day(mut self, teacher: impl Into<Teacher>, day: Day) -> Self {
        let teacher = teacher.into();
        for slot in day.slots() {
            self.add_absence(teacher.clone(), slot);
        }
        self
    }

    /// Blocks a single slot in place.
    pub fn add_absence(&mut self, teacher: impl Into<Teacher>, slot: TimeSlot) {
        self.blocked.entry(teacher.into()).or_default().insert(slot);
    }

    /// Whether `teacher` is absent at `slot`.
    #[inline]
    pub fn is_absent(&self, teacher: &Teacher, slot: TimeSlot) -> bool {
        self.blocked
            .get(teacher)
            .is_some_and(|slots| slots.contains(&slot))
    }

    /// Blocked slots of a teacher.
    pub fn absences_of(&self, teacher: &Teacher) -> impl Iterator<Item = TimeSlot> + '_ {
        self.blocked.get(teacher).into_iter().flatten().copied()
    }

    /// Number of teachers with at least one absence.
    pub fn teacher_count(&self) -> usize {
        self.blocked.len()
    }
}
