//! Rule configuration.
//!
//! Everything institution-specific lives here as data: which subjects
//! are protected, individualized, core or facility-bound, the same-day
//! caps, synchronized groups, exchange/parent pairings, protected test
//! periods and per-teacher slot limits.
//!
//! `Rules` is serde-deserializable; every field has a default so a
//! partial document is enough.
//!
//! ```
//! use u_timetable::models::{ClassRef, Rules, Subject};
//!
//! let rules = Rules::new()
//!     .with_core_subjects(["Math", "English"])
//!     .with_sync_group([ClassRef::new(1, 5), ClassRef::new(2, 5)])
//!     .with_exchange_pair(ClassRef::new(1, 6), ClassRef::new(1, 1));
//!
//! assert_eq!(rules.daily_cap(&Subject::new("Math")), Some(2));
//! assert_eq!(rules.daily_cap(&Subject::new("Art")), Some(1));
//! assert_eq!(rules.parent_of(ClassRef::new(1, 6)), Some(ClassRef::new(1, 1)));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{ClassRef, Subject, Teacher, TimeSlot};

/// Strictness of the same-day duplicate rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckLevel {
    /// Every subject at most once per day.
    Strict,
    /// Core subjects up to `core_daily_cap`, others `default_daily_cap`.
    #[default]
    Normal,
    /// Every subject up to `relaxed_daily_cap`.
    Relaxed,
}

/// An exchange class and the parent class it mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePair {
    /// Class that follows the parent except during individualized activity.
    pub exchange: ClassRef,
    /// Class being mirrored.
    pub parent: ClassRef,
}

/// Upper bound on how many classes a teacher may hold at one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSlotLimit {
    /// Limited teacher.
    pub teacher: Teacher,
    /// Slot the limit applies to.
    pub slot: TimeSlot,
    /// Classes the teacher may hold at `slot`.
    pub max_classes: u32,
}

/// Data-driven rule set consulted by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Subjects never placed, moved or capped by the engine.
    pub protected_subjects: BTreeSet<Subject>,
    /// Individualized-activity subjects (exchange classes may diverge).
    pub individualized_subjects: BTreeSet<Subject>,
    /// Subjects a parent class may run while its exchange class is in
    /// individualized activity.
    pub parent_subjects: BTreeSet<Subject>,
    /// Core subjects allowed more than once per day at `Normal` level.
    pub core_subjects: BTreeSet<Subject>,
    /// Subjects that occupy the exclusive shared facility (gym).
    pub facility_subjects: BTreeSet<Subject>,
    /// Same-day duplicate strictness.
    pub check_level: CheckLevel,
    /// Cap for non-core subjects at `Normal` level.
    pub default_daily_cap: u32,
    /// Cap for core subjects at `Normal` level.
    pub core_daily_cap: u32,
    /// Cap for every subject at `Relaxed` level.
    pub relaxed_daily_cap: u32,
    /// Groups of classes that must carry identical subjects.
    pub sync_groups: Vec<BTreeSet<ClassRef>>,
    /// Exchange/parent pairings.
    pub exchange_pairs: Vec<ExchangePair>,
    /// Slots no placement may touch.
    pub test_periods: BTreeSet<TimeSlot>,
    /// Per-teacher, per-slot class limits.
    pub teacher_slot_limits: Vec<TeacherSlotLimit>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            protected_subjects: BTreeSet::new(),
            individualized_subjects: BTreeSet::new(),
            parent_subjects: BTreeSet::new(),
            core_subjects: BTreeSet::new(),
            facility_subjects: BTreeSet::new(),
            check_level: CheckLevel::Normal,
            default_daily_cap: 1,
            core_daily_cap: 2,
            relaxed_daily_cap: 3,
            sync_groups: Vec::new(),
            exchange_pairs: Vec::new(),
            test_periods: BTreeSet::new(),
            teacher_slot_limits: Vec::new(),
        }
    }
}

fn subject_set<S: Into<Subject>>(subjects: impl IntoIterator<Item = S>) -> BTreeSet<Subject> {
    subjects.into_iter().map(Into::into).collect()
}

impl Rules {
    /// Creates an empty rule set with default caps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subjects the engine never places or moves.
    pub fn with_protected_subjects<S: Into<Subject>>(
        mut self,
        subjects: impl IntoIterator<Item = S>,
    ) -> Self {
        self.protected_subjects = subject_set(subjects);
        self
    }

    /// Sets the individualized-activity subjects.
    pub fn with_individualized_subjects<S: Into<Subject>>(
        mut self,
        subjects: impl IntoIterator<Item = S>,
    ) -> Self {
        self.individualized_subjects = subject_set(subjects);
        self
    }

    /// Sets the subjects a parent may run during individualized activity.
    pub fn with_parent_subjects<S: Into<Subject>>(
        mut self,
        subjects: impl IntoIterator<Item = S>,
    ) -> Self {
        self.parent_subjects = subject_set(subjects);
        self
    }

    /// Sets the core subjects (higher daily cap).
    pub fn with_core_subjects<S: Into<Subject>>(
        mut self,
        subjects: impl IntoIterator<Item = S>,
    ) -> Self {
        self.core_subjects = subject_set(subjects);
        self
    }

    /// Sets the subjects that occupy the shared facility.
    pub fn with_facility_subjects<S: Into<Subject>>(
        mut self,
        subjects: impl IntoIterator<Item = S>,
    ) -> Self {
        self.facility_subjects = subject_set(subjects);
        self
    }

    /// Sets the duplicate-check strictness.
    pub fn with_check_level(mut self, level: CheckLevel) -> Self {
        self.check_level = level;
        self
    }

    /// Sets the `Normal`-level caps (non-core, core).
    pub fn with_daily_caps(mut self, default_cap: u32, core_cap: u32) -> Self {
        self.default_daily_cap = default_cap;
        self.core_daily_cap = core_cap;
        self
    }

    /// Adds a synchronized group.
    pub fn with_sync_group(mut self, classes: impl IntoIterator<Item = ClassRef>) -> Self {
        self.sync_groups.push(classes.into_iter().collect());
        self
    }

    /// Adds an exchange/parent pairing.
    pub fn with_exchange_pair(mut self, exchange: ClassRef, parent: ClassRef) -> Self {
        self.exchange_pairs.push(ExchangePair { exchange, parent });
        self
    }

    /// Marks a slot as a protected test period.
    pub fn with_test_period(mut self, slot: TimeSlot) -> Self {
        self.test_periods.insert(slot);
        self
    }

    /// Caps the classes `teacher` may hold at `slot`.
    pub fn with_teacher_slot_limit(
        mut self,
        teacher: impl Into<Teacher>,
        slot: TimeSlot,
        max_classes: u32,
    ) -> Self {
        self.teacher_slot_limits.push(TeacherSlotLimit {
            teacher: teacher.into(),
            slot,
            max_classes,
        });
        self
    }

    /// Whether `subject` is never placed, moved or capped.
    #[inline]
    pub fn is_protected(&self, subject: &Subject) -> bool {
        self.protected_subjects.contains(subject)
    }

    /// Whether `subject` is an individualized activity.
    #[inline]
    pub fn is_individualized(&self, subject: &Subject) -> bool {
        self.individualized_subjects.contains(subject)
    }

    /// Whether a parent may run `subject` beside an individualized activity.
    #[inline]
    pub fn is_parent_subject(&self, subject: &Subject) -> bool {
        self.parent_subjects.contains(subject)
    }

    /// Whether `subject` is a core subject.
    #[inline]
    pub fn is_core(&self, subject: &Subject) -> bool {
        self.core_subjects.contains(subject)
    }

    /// Whether `subject` occupies the shared facility.
    #[inline]
    pub fn uses_facility(&self, subject: &Subject) -> bool {
        self.facility_subjects.contains(subject)
    }

    /// Whether `slot` is a protected test period.
    #[inline]
    pub fn is_test_period(&self, slot: TimeSlot) -> bool {
        self.test_periods.contains(&slot)
    }

    /// Same-day cap for a subject. `None` means uncapped (protected).
    pub fn daily_cap(&self, subject: &Subject) -> Option<u32> {
        if self.is_protected(subject) {
            return None;
        }
        Some(match self.check_level {
            CheckLevel::Strict => 1,
            CheckLevel::Normal if self.is_core(subject) => self.core_daily_cap,
            CheckLevel::Normal => self.default_daily_cap,
            CheckLevel::Relaxed => self.relaxed_daily_cap,
        })
    }

    /// Synchronized group containing `class_ref`.
    pub fn sync_group_of(&self, class_ref: ClassRef) -> Option<&BTreeSet<ClassRef>> {
        self.sync_groups.iter().find(|g| g.contains(&class_ref))
    }

    /// Whether two distinct classes share a synchronized group.
    pub fn in_same_sync_group(&self, a: ClassRef, b: ClassRef) -> bool {
        self.sync_group_of(a).is_some_and(|g| g.contains(&b))
    }

    /// Parent of an exchange class.
    pub fn parent_of(&self, exchange: ClassRef) -> Option<ClassRef> {
        self.exchange_pairs
            .iter()
            .find(|p| p.exchange == exchange)
            .map(|p| p.parent)
    }

    /// Exchange class mirroring a parent.
    pub fn exchange_of(&self, parent: ClassRef) -> Option<ClassRef> {
        self.exchange_pairs
            .iter()
            .find(|p| p.parent == parent)
            .map(|p| p.exchange)
    }

    /// Whether `a` and `b` form an exchange/parent pair, in either order.
    pub fn is_exchange_pair(&self, a: ClassRef, b: ClassRef) -> bool {
        self.exchange_pairs.iter().any(|p| {
            (p.exchange == a && p.parent == b) || (p.exchange == b && p.parent == a)
        })
    }

    /// Whether two distinct classes may use the facility at the same
    /// time: same synchronized group, or an exchange class and its
    /// parent running a mirrored lesson.
    pub fn shares_facility(&self, a: ClassRef, b: ClassRef) -> bool {
        self.in_same_sync_group(a, b) || self.is_exchange_pair(a, b)
    }

    /// Class limit for a teacher at a slot.
    pub fn slot_limit(&self, teacher: &Teacher, slot: TimeSlot) -> Option<u32> {
        self.teacher_slot_limits
            .iter()
            .filter(|l| &l.teacher == teacher && l.slot == slot)
            .map(|l| l.max_classes)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Day;

    #[test]
    fn test_daily_caps_by_level() {
        let rules = Rules::new()
            .with_core_subjects(["Math"])
            .with_protected_subjects(["Homeroom"]);
        let math = Subject::new("Math");
        let art = Subject::new("Art");
        let hr = Subject::new("Homeroom");

        assert_eq!(rules.daily_cap(&math), Some(2));
        assert_eq!(rules.daily_cap(&art), Some(1));
        assert_eq!(rules.daily_cap(&hr), None);

        let strict = rules.clone().with_check_level(CheckLevel::Strict);
        assert_eq!(strict.daily_cap(&math), Some(1));

        let relaxed = rules.with_check_level(CheckLevel::Relaxed);
        assert_eq!(relaxed.daily_cap(&art), Some(3));
    }

    #[test]
    fn test_groups_and_pairs() {
        let (a, b, c) = (ClassRef::new(1, 5), ClassRef::new(2, 5), ClassRef::new(1, 1));
        let rules = Rules::new()
            .with_sync_group([a, b])
            .with_exchange_pair(ClassRef::new(1, 6), c);

        assert!(rules.in_same_sync_group(a, b));
        assert!(!rules.in_same_sync_group(a, c));
        assert_eq!(rules.exchange_of(c), Some(ClassRef::new(1, 6)));
        assert_eq!(rules.parent_of(c), None);

        let ex = ClassRef::new(1, 6);
        assert!(rules.is_exchange_pair(ex, c));
        assert!(rules.is_exchange_pair(c, ex));
        assert!(rules.shares_facility(a, b));
        assert!(rules.shares_facility(c, ex));
        assert!(!rules.shares_facility(a, c));
        assert!(!rules.shares_facility(ex, b));
    }

    #[test]
    fn test_slot_limit_takes_minimum() {
        let slot = TimeSlot::new(Day::Tue, 5);
        let rules = Rules::new()
            .with_teacher_slot_limit("Inoue", slot, 2)
            .with_teacher_slot_limit("Inoue", slot, 1);
        assert_eq!(rules.slot_limit(&Teacher::new("Inoue"), slot), Some(1));
        assert_eq!(rules.slot_limit(&Teacher::new("Inoue"), TimeSlot::new(Day::Tue, 4)), None);
    }

    #[test]
    fn test_deserialize_partial_document() {
        let json = r#"{
            "core_subjects": ["Math", "English"],
            "check_level": "strict",
            "sync_groups": [[{"grade": 1, "class_number": 5}, {"grade": 2, "class_number": 5}]],
            "exchange_pairs": [{"exchange": {"grade": 1, "class_number": 6},
                                "parent": {"grade": 1, "class_number": 1}}],
            "test_periods": [{"day": "Mon", "period": 1}]
        }"#;
        let rules: Rules = serde_json::from_str(json).unwrap();
        assert_eq!(rules.check_level, CheckLevel::Strict);
        assert_eq!(rules.core_daily_cap, 2);
        assert!(rules.is_core(&Subject::new("English")));
        assert!(rules.is_test_period(TimeSlot::new(Day::Mon, 1)));
        assert!(rules.in_same_sync_group(ClassRef::new(1, 5), ClassRef::new(2, 5)));
        assert_eq!(rules.parent_of(ClassRef::new(1, 6)), Some(ClassRef::new(1, 1)));
    }
}
