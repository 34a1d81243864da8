//! Constraint validation.
//!
//! [`ConstraintValidator`] is the single source of truth for legality.
//! It answers two questions:
//!
//! - **Incremental**: can this assignment go into this cell right now?
//!   ([`ConstraintValidator::can_place`]). Used on every tentative
//!   placement during search and repair.
//! - **Audit**: what is wrong with this whole schedule?
//!   ([`ConstraintValidator::validate_all`]). Exhaustive, non-recursive,
//!   linear in slots × (classes + teachers).
//!
//! Neither operation panics or errors: a refusal is a [`Rejection`]
//! value, an audit finding is a [`Violation`](crate::models::Violation).
//!
//! # Exemptions
//! Two situations let a teacher hold several classes at once:
//! - every class involved belongs to the same synchronized group and
//!   runs the same subject (a joint lesson);
//! - every class involved runs an individualized-activity subject.
//!
//! A facility subject may be shared only by classes of one
//! synchronized group, or by an exchange class and its parent running
//! the mirrored lesson.

mod audit;
mod placement;

use thiserror::Error;

use crate::models::{Assignment, ClassRef, Rules, School, Subject, Teacher};

/// Why a placement was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("cell is locked")]
    Locked,

    #[error("cell already holds an assignment")]
    Occupied,

    #[error("slot is a protected test period")]
    TestPeriod,

    #[error("{0} is a protected subject")]
    ProtectedSubject(Subject),

    #[error("{0} has no teacher")]
    MissingTeacher(Subject),

    #[error("{0} is absent")]
    TeacherAbsent(Teacher),

    #[error("{teacher} may hold at most {max_classes} classes at this slot")]
    TeacherSlotLimit { teacher: Teacher, max_classes: u32 },

    #[error("{teacher} is already teaching {class_ref}")]
    TeacherConflict { teacher: Teacher, class_ref: ClassRef },

    #[error("{subject} already placed {count} time(s) today (cap {cap})")]
    DailyDuplicate { subject: Subject, count: u32, cap: u32 },

    #[error("facility is in use by {0}")]
    FacilityInUse(ClassRef),

    #[error("individualized activity needs parent {parent} to run an allowed subject")]
    IndividualizedActivity { parent: ClassRef },

    #[error("must mirror {other}, which runs {subject}")]
    ExchangeMismatch { other: ClassRef, subject: Subject },

    #[error("exchange class {exchange} is in individualized activity")]
    ParentLocked { exchange: ClassRef },

    #[error("synchronized class {class_ref} runs {subject}")]
    SyncGroupMismatch { class_ref: ClassRef, subject: Subject },
}

impl Rejection {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::Locked => "locked",
            Rejection::Occupied => "occupied",
            Rejection::TestPeriod => "test_period",
            Rejection::ProtectedSubject(_) => "protected_subject",
            Rejection::MissingTeacher(_) => "missing_teacher",
            Rejection::TeacherAbsent(_) => "teacher_absent",
            Rejection::TeacherSlotLimit { .. } => "teacher_slot_limit",
            Rejection::TeacherConflict { .. } => "teacher_conflict",
            Rejection::DailyDuplicate { .. } => "daily_duplicate",
            Rejection::FacilityInUse(_) => "facility_in_use",
            Rejection::IndividualizedActivity { .. } => "individualized_activity",
            Rejection::ExchangeMismatch { .. } => "exchange_mismatch",
            Rejection::ParentLocked { .. } => "parent_locked",
            Rejection::SyncGroupMismatch { .. } => "sync_group_mismatch",
        }
    }
}

/// Rule engine over a school and its rule set.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintValidator<'a> {
    school: &'a School,
    rules: &'a Rules,
}

impl<'a> ConstraintValidator<'a> {
    /// Creates a validator.
    pub fn new(school: &'a School, rules: &'a Rules) -> Self {
        Self { school, rules }
    }

    /// School data in use.
    pub fn school(&self) -> &'a School {
        self.school
    }

    /// Rule set in use.
    pub fn rules(&self) -> &'a Rules {
        self.rules
    }

    /// Whether assignments holding the same teacher at one slot form an
    /// exempt joint or individualized session.
    pub(crate) fn is_exempt_session(&self, sessions: &[&Assignment]) -> bool {
        let Some(first) = sessions.first() else {
            return true;
        };
        if sessions
            .iter()
            .all(|a| self.rules.is_individualized(&a.subject))
        {
            return true;
        }
        match self.rules.sync_group_of(first.class_ref) {
            Some(group) => sessions
                .iter()
                .all(|a| group.contains(&a.class_ref) && a.subject == first.subject),
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared school used by validator, domain and solver tests.

    use crate::models::{ClassRef, Rules, School};

    pub const C11: ClassRef = ClassRef { grade: 1, class_number: 1 };
    pub const C12: ClassRef = ClassRef { grade: 1, class_number: 2 };
    pub const C15: ClassRef = ClassRef { grade: 1, class_number: 5 };
    pub const C25: ClassRef = ClassRef { grade: 2, class_number: 5 };
    pub const C16: ClassRef = ClassRef { grade: 1, class_number: 6 };

    /// Two regular classes, a two-class synchronized group and one
    /// exchange class paired with 1-1.
    pub fn school() -> School {
        School::new()
            .with_lesson(C11, "Math", 4, "Tanaka")
            .with_lesson(C11, "English", 4, "Ito")
            .with_lesson(C11, "PE", 3, "Sato")
            .with_lesson(C12, "Math", 4, "Tanaka")
            .with_lesson(C12, "Science", 3, "Mori")
            .with_lesson(C12, "PE", 3, "Sato")
            .with_lesson(C15, "Math", 3, "Kato")
            .with_lesson(C15, "PE", 2, "Sato")
            .with_lesson(C25, "Math", 3, "Kato")
            .with_lesson(C25, "PE", 2, "Sato")
            .with_lesson(C16, "Math", 4, "Ueda")
            .with_lesson(C16, "Independent", 2, "Hayashi")
    }

    pub fn rules() -> Rules {
        Rules::new()
            .with_protected_subjects(["Homeroom", "Exam"])
            .with_individualized_subjects(["Independent"])
            .with_parent_subjects(["Math", "English"])
            .with_core_subjects(["Math", "English"])
            .with_facility_subjects(["PE"])
            .with_sync_group([C15, C25])
            .with_exchange_pair(C16, C11)
    }
}
