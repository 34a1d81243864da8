//! Schedule (timetable) model and violation records.
//!
//! A schedule maps (time slot, class) cells to at most one
//! [`Assignment`]. Cells may be locked: locked cells hold test periods,
//! protected subjects and already-finalized content, and no engine
//! operation writes or clears them.
//!
//! # Invariants
//! - A cell is empty or holds exactly one assignment whose `class_ref`
//!   matches the cell's class.
//! - Locked cells are never reassigned or removed; attempts are
//!   programming errors ([`Schedule::assign`] panics,
//!   [`Schedule::try_assign`] returns an error).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{Assignment, ClassRef, Day, Subject, Teacher, TimeSlot};
use crate::error::{Result, TimetableError};

/// Cell key: (slot, class).
pub type Cell = (TimeSlot, ClassRef);

/// A weekly timetable for every class.
///
/// Serializes as a flat list of cell records, so it round-trips
/// through any serde format. `Clone` gives an independent deep copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScheduleRecord", into = "ScheduleRecord")]
pub struct Schedule {
    cells: BTreeMap<Cell, Assignment>,
    locked: BTreeSet<Cell>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignment at a cell.
    pub fn get(&self, slot: TimeSlot, class_ref: ClassRef) -> Option<&Assignment> {
        self.cells.get(&(slot, class_ref))
    }

    /// Whether a cell is locked.
    #[inline]
    pub fn is_locked(&self, slot: TimeSlot, class_ref: ClassRef) -> bool {
        self.locked.contains(&(slot, class_ref))
    }

    /// Whether a cell holds an assignment.
    #[inline]
    pub fn is_occupied(&self, slot: TimeSlot, class_ref: ClassRef) -> bool {
        self.cells.contains_key(&(slot, class_ref))
    }

    /// Locks a cell, empty or not.
    pub fn lock(&mut self, slot: TimeSlot, class_ref: ClassRef) {
        self.locked.insert((slot, class_ref));
    }

    /// Places an assignment and locks its cell.
    ///
    /// Used to seed protected content before solving.
    pub fn place_locked(&mut self, slot: TimeSlot, assignment: Assignment) -> Result<()> {
        let class_ref = assignment.class_ref;
        self.try_assign(slot, assignment)?;
        self.lock(slot, class_ref);
        Ok(())
    }

    /// Places an assignment into an empty, unlocked cell.
    pub fn try_assign(&mut self, slot: TimeSlot, assignment: Assignment) -> Result<()> {
        let class_ref = assignment.class_ref;
        if self.is_locked(slot, class_ref) {
            return Err(TimetableError::CellLocked { slot, class_ref });
        }
        if self.is_occupied(slot, class_ref) {
            return Err(TimetableError::CellOccupied { slot, class_ref });
        }
        self.cells.insert((slot, class_ref), assignment);
        Ok(())
    }

    /// Places an assignment.
    ///
    /// # Panics
    /// If the cell is locked or occupied. Search code only calls this
    /// after a successful placement check.
    pub fn assign(&mut self, slot: TimeSlot, assignment: Assignment) {
        if let Err(e) = self.try_assign(slot, assignment) {
            panic!("invariant violated: {e}");
        }
    }

    /// Clears an unlocked cell, returning its previous content.
    pub fn try_remove(&mut self, slot: TimeSlot, class_ref: ClassRef) -> Result<Option<Assignment>> {
        if self.is_locked(slot, class_ref) {
            return Err(TimetableError::CellLocked { slot, class_ref });
        }
        Ok(self.cells.remove(&(slot, class_ref)))
    }

    /// Clears a cell.
    ///
    /// # Panics
    /// If the cell is locked.
    pub fn remove(&mut self, slot: TimeSlot, class_ref: ClassRef) -> Option<Assignment> {
        match self.try_remove(slot, class_ref) {
            Ok(previous) => previous,
            Err(e) => panic!("invariant violated: {e}"),
        }
    }

    /// All filled cells in (slot, class) order.
    pub fn iter(&self) -> impl Iterator<Item = (TimeSlot, &Assignment)> {
        self.cells.iter().map(|(&(slot, _), a)| (slot, a))
    }

    /// Assignments at a slot, in class order.
    pub fn at_slot(&self, slot: TimeSlot) -> impl Iterator<Item = &Assignment> {
        self.cells
            .range((slot, ClassRef::new(0, 0))..=(slot, ClassRef::new(u8::MAX, u8::MAX)))
            .map(|(_, a)| a)
    }

    /// Assignments at a slot taught by `teacher`.
    pub fn taught_at<'a>(
        &'a self,
        slot: TimeSlot,
        teacher: &'a Teacher,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.at_slot(slot).filter(move |a| a.is_taught_by(teacher))
    }

    /// Number of cells of `class_ref` carrying `subject` across the week.
    pub fn placed_hours(&self, class_ref: ClassRef, subject: &Subject) -> u32 {
        TimeSlot::all()
            .filter(|&slot| self.get(slot, class_ref).is_some_and(|a| &a.subject == subject))
            .count() as u32
    }

    /// Number of cells of `class_ref` carrying `subject` on `day`.
    pub fn daily_count(&self, class_ref: ClassRef, day: Day, subject: &Subject) -> u32 {
        day.slots()
            .filter(|&slot| self.get(slot, class_ref).is_some_and(|a| &a.subject == subject))
            .count() as u32
    }

    /// Number of filled cells.
    pub fn assignment_count(&self) -> usize {
        self.cells.len()
    }

    /// Locked cells in order.
    pub fn locked_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.locked.iter().copied()
    }

    /// Number of locked cells.
    pub fn locked_count(&self) -> usize {
        self.locked.len()
    }
}

/// Serialized form of a single cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CellRecord {
    slot: TimeSlot,
    class_ref: ClassRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assignment: Option<Assignment>,
    #[serde(default)]
    locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduleRecord {
    cells: Vec<CellRecord>,
}

impl From<Schedule> for ScheduleRecord {
    fn from(schedule: Schedule) -> Self {
        let keys: BTreeSet<Cell> = schedule
            .cells
            .keys()
            .chain(schedule.locked.iter())
            .copied()
            .collect();
        let cells = keys
            .into_iter()
            .map(|(slot, class_ref)| CellRecord {
                slot,
                class_ref,
                assignment: schedule.cells.get(&(slot, class_ref)).cloned(),
                locked: schedule.locked.contains(&(slot, class_ref)),
            })
            .collect();
        Self { cells }
    }
}

impl From<ScheduleRecord> for Schedule {
    fn from(record: ScheduleRecord) -> Self {
        let mut schedule = Schedule::new();
        for cell in record.cells {
            if let Some(mut assignment) = cell.assignment {
                assignment.class_ref = cell.class_ref;
                schedule.cells.insert((cell.slot, cell.class_ref), assignment);
            }
            if cell.locked {
                schedule.locked.insert((cell.slot, cell.class_ref));
            }
        }
        schedule
    }
}

/// A constraint violation found in a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub kind: ViolationKind,
    /// Slot concerned (none for day-level findings).
    pub slot: Option<TimeSlot>,
    /// Day concerned.
    pub day: Option<Day>,
    /// Classes involved, in class order.
    pub classes: Vec<ClassRef>,
    /// Teacher involved.
    pub teacher: Option<Teacher>,
    /// Subject involved.
    pub subject: Option<Subject>,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Teacher holds two or more non-exempt classes at once.
    TeacherConflict,
    /// Teacher exceeds a configured per-slot class limit.
    TeacherSlotLimit,
    /// Lesson placed while its teacher is absent.
    TeacherAbsence,
    /// Subject appears more often in a day than its cap allows.
    DailyDuplicate,
    /// Exclusive facility used by more than one class.
    FacilityConflict,
    /// Synchronized-group classes carry different subjects.
    SyncGroupMismatch,
    /// Exchange class diverges from its parent outside individualized activity.
    ExchangeMismatch,
    /// Individualized activity while the parent runs a disallowed subject.
    IndividualizedActivity,
}

impl Violation {
    /// Creates a violation with the kind's default severity.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            slot: None,
            day: None,
            classes: Vec::new(),
            teacher: None,
            subject: None,
            message: message.into(),
            severity: kind.default_severity(),
        }
    }

    /// Sets the slot (and its day).
    pub fn at(mut self, slot: TimeSlot) -> Self {
        self.slot = Some(slot);
        self.day = Some(slot.day);
        self
    }

    /// Sets the day.
    pub fn on(mut self, day: Day) -> Self {
        self.day = Some(day);
        self
    }

    /// Sets the classes involved.
    pub fn with_classes(mut self, classes: impl IntoIterator<Item = ClassRef>) -> Self {
        self.classes = classes.into_iter().collect();
        self.classes.sort();
        self.classes.dedup();
        self
    }

    /// Sets the teacher.
    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teacher = Some(teacher);
        self
    }

    /// Sets the subject.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }
}

impl ViolationKind {
    /// Default severity for this kind.
    pub fn default_severity(&self) -> i32 {
        match self {
            ViolationKind::TeacherConflict => 95,
            ViolationKind::TeacherAbsence => 95,
            ViolationKind::TeacherSlotLimit => 90,
            ViolationKind::FacilityConflict => 85,
            ViolationKind::SyncGroupMismatch => 80,
            ViolationKind::ExchangeMismatch => 80,
            ViolationKind::IndividualizedActivity => 75,
            ViolationKind::DailyDuplicate => 60,
        }
    }
}
