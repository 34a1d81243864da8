//! Incremental placement check.
//!
//! Rules run in a fixed order and stop at the first failure:
//!
//! 1. cell not locked
//! 2. cell not occupied
//! 3. slot not a test period, subject not protected
//! 4. teacher present (and present at all for taught subjects)
//! 5. teacher slot limit and teacher conflict (with exemptions)
//! 6. same-day duplicate cap
//! 7. exclusive facility (shared within a synchronized group or an
//!    exchange pair)
//! 8. exchange class follows its parent
//! 9. parent class respects its exchange class
//! 10. synchronized group carries one subject

use super::{ConstraintValidator, Rejection};
use crate::models::{Assignment, Schedule, TimeSlot};

type Check = Result<(), Rejection>;

impl ConstraintValidator<'_> {
    /// Whether `assignment` may be placed at `slot` in `schedule`.
    ///
    /// Never panics; a refusal carries the first failing rule.
    ///
    /// # Example
    /// ```
    /// use u_timetable::constraints::{ConstraintValidator, Rejection};
    /// use u_timetable::models::{Assignment, ClassRef, Day, Rules, Schedule, School, TimeSlot};
    ///
    /// let (a, b) = (ClassRef::new(1, 1), ClassRef::new(1, 2));
    /// let school = School::new()
    ///     .with_lesson(a, "Math", 4, "Tanaka")
    ///     .with_lesson(b, "Math", 4, "Tanaka");
    /// let rules = Rules::new();
    /// let validator = ConstraintValidator::new(&school, &rules);
    ///
    /// let slot = TimeSlot::new(Day::Mon, 1);
    /// let mut schedule = Schedule::new();
    /// schedule.assign(slot, Assignment::new(a, "Math", "Tanaka"));
    ///
    /// let err = validator
    ///     .can_place(&schedule, slot, &Assignment::new(b, "Math", "Tanaka"))
    ///     .unwrap_err();
    /// assert_eq!(err.code(), "teacher_conflict");
    /// ```
    pub fn can_place(&self, schedule: &Schedule, slot: TimeSlot, assignment: &Assignment) -> Check {
        let class_ref = assignment.class_ref;
        if schedule.is_locked(slot, class_ref) {
            return Err(Rejection::Locked);
        }
        if schedule.is_occupied(slot, class_ref) {
            return Err(Rejection::Occupied);
        }
        if self.rules.is_test_period(slot) {
            return Err(Rejection::TestPeriod);
        }
        if self.rules.is_protected(&assignment.subject) {
            return Err(Rejection::ProtectedSubject(assignment.subject.clone()));
        }
        self.check_teacher(schedule, slot, assignment)?;
        self.check_daily_cap(schedule, slot, assignment)?;
        self.check_facility(schedule, slot, assignment)?;
        self.check_exchange_class(schedule, slot, assignment)?;
        self.check_parent_class(schedule, slot, assignment)?;
        self.check_sync_group(schedule, slot, assignment)
    }

    fn check_teacher(&self, schedule: &Schedule, slot: TimeSlot, assignment: &Assignment) -> Check {
        let Some(teacher) = assignment.teacher.as_ref() else {
            return Err(Rejection::MissingTeacher(assignment.subject.clone()));
        };
        if self.school.is_teacher_unavailable(slot, teacher) {
            return Err(Rejection::TeacherAbsent(teacher.clone()));
        }

        let others: Vec<&Assignment> = schedule
            .taught_at(slot, teacher)
            .filter(|a| a.class_ref != assignment.class_ref)
            .collect();

        if let Some(max_classes) = self.rules.slot_limit(teacher, slot) {
            if others.len() as u32 + 1 > max_classes {
                return Err(Rejection::TeacherSlotLimit {
                    teacher: teacher.clone(),
                    max_classes,
                });
            }
        }

        if others.is_empty() {
            return Ok(());
        }
        let mut session = others.clone();
        session.push(assignment);
        if self.is_exempt_session(&session) {
            return Ok(());
        }
        Err(Rejection::TeacherConflict {
            teacher: teacher.clone(),
            class_ref: others[0].class_ref,
        })
    }

    fn check_daily_cap(&self, schedule: &Schedule, slot: TimeSlot, assignment: &Assignment) -> Check {
        let Some(cap) = self.rules.daily_cap(&assignment.subject) else {
            return Ok(());
        };
        let count = schedule.daily_count(assignment.class_ref, slot.day, &assignment.subject);
        if count >= cap {
            return Err(Rejection::DailyDuplicate {
                subject: assignment.subject.clone(),
                count,
                cap,
            });
        }
        Ok(())
    }

    fn check_facility(&self, schedule: &Schedule, slot: TimeSlot, assignment: &Assignment) -> Check {
        if !self.rules.uses_facility(&assignment.subject) {
            return Ok(());
        }
        let class_ref = assignment.class_ref;
        let blocking = schedule.at_slot(slot).find(|other| {
            other.class_ref != class_ref
                && self.rules.uses_facility(&other.subject)
                && !self.rules.shares_facility(class_ref, other.class_ref)
        });
        match blocking {
            Some(other) => Err(Rejection::FacilityInUse(other.class_ref)),
            None => Ok(()),
        }
    }

    fn check_exchange_class(
        &self,
        schedule: &Schedule,
        slot: TimeSlot,
        assignment: &Assignment,
    ) -> Check {
        let Some(parent) = self.rules.parent_of(assignment.class_ref) else {
            return Ok(());
        };
        let parent_lesson = schedule.get(slot, parent);

        if self.rules.is_individualized(&assignment.subject) {
            return match parent_lesson {
                Some(p) if self.rules.is_parent_subject(&p.subject) => Ok(()),
                _ => Err(Rejection::IndividualizedActivity { parent }),
            };
        }
        match parent_lesson {
            Some(p) if p.subject != assignment.subject => Err(Rejection::ExchangeMismatch {
                other: parent,
                subject: p.subject.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn check_parent_class(
        &self,
        schedule: &Schedule,
        slot: TimeSlot,
        assignment: &Assignment,
    ) -> Check {
        let Some(exchange) = self.rules.exchange_of(assignment.class_ref) else {
            return Ok(());
        };
        let Some(ex_lesson) = schedule.get(slot, exchange) else {
            return Ok(());
        };

        if self.rules.is_individualized(&ex_lesson.subject) {
            if self.rules.is_parent_subject(&assignment.subject) {
                return Ok(());
            }
            return Err(Rejection::ParentLocked { exchange });
        }
        if ex_lesson.subject != assignment.subject {
            return Err(Rejection::ExchangeMismatch {
                other: exchange,
                subject: ex_lesson.subject.clone(),
            });
        }
        Ok(())
    }

    fn check_sync_group(&self, schedule: &Schedule, slot: TimeSlot, assignment: &Assignment) -> Check {
        let Some(group) = self.rules.sync_group_of(assignment.class_ref) else {
            return Ok(());
        };
        for &member in group.iter().filter(|&&c| c != assignment.class_ref) {
            if let Some(other) = schedule.get(slot, member) {
                if other.subject != assignment.subject {
                    return Err(Rejection::SyncGroupMismatch {
                        class_ref: member,
                        subject: other.subject.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
