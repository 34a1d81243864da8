//! Whole-schedule audit.
//!
//! One pass over every slot groups simultaneous lessons by teacher and
//! checks facility, synchronized-group and exchange-pair rules; a
//! second pass checks same-day duplicates per class and day. Each
//! finding becomes one [`Violation`].

use std::collections::{BTreeMap, BTreeSet};

use super::ConstraintValidator;
use crate::models::{
    Assignment, ClassRef, Day, Schedule, Subject, Teacher, TimeSlot, Violation, ViolationKind,
};

impl ConstraintValidator<'_> {
    /// Lists every violation in `schedule`.
    ///
    /// Empty cells are never violations on their own; an exchange class
    /// in individualized activity next to an empty parent is.
    pub fn validate_all(&self, schedule: &Schedule) -> Vec<Violation> {
        let mut violations = Vec::new();
        for slot in TimeSlot::all() {
            self.audit_teachers(schedule, slot, &mut violations);
            self.audit_facility(schedule, slot, &mut violations);
            self.audit_sync_groups(schedule, slot, &mut violations);
            self.audit_exchange_pairs(schedule, slot, &mut violations);
        }
        self.audit_daily_duplicates(schedule, &mut violations);
        violations
    }

    /// Number of violations in `schedule`.
    pub fn violation_count(&self, schedule: &Schedule) -> usize {
        self.validate_all(schedule).len()
    }

    fn audit_teachers(&self, schedule: &Schedule, slot: TimeSlot, out: &mut Vec<Violation>) {
        let mut by_teacher: BTreeMap<&Teacher, Vec<&Assignment>> = BTreeMap::new();
        for a in schedule.at_slot(slot) {
            if let Some(teacher) = a.teacher.as_ref() {
                by_teacher.entry(teacher).or_default().push(a);
            }
        }

        for (teacher, sessions) in by_teacher {
            let classes = sessions.iter().map(|a| a.class_ref);

            if self.school.is_teacher_unavailable(slot, teacher) {
                out.push(
                    Violation::new(
                        ViolationKind::TeacherAbsence,
                        format!("{teacher} is absent at {slot} but teaches {} class(es)", sessions.len()),
                    )
                    .at(slot)
                    .with_classes(classes.clone())
                    .with_teacher(teacher.clone()),
                );
            }

            if let Some(max) = self.rules.slot_limit(teacher, slot) {
                if sessions.len() as u32 > max {
                    out.push(
                        Violation::new(
                            ViolationKind::TeacherSlotLimit,
                            format!("{teacher} holds {} classes at {slot} (limit {max})", sessions.len()),
                        )
                        .at(slot)
                        .with_classes(classes.clone())
                        .with_teacher(teacher.clone()),
                    );
                }
            }

            if sessions.len() > 1 && !self.is_exempt_session(&sessions) {
                out.push(
                    Violation::new(
                        ViolationKind::TeacherConflict,
                        format!("{teacher} teaches {} classes at {slot}", sessions.len()),
                    )
                    .at(slot)
                    .with_classes(classes)
                    .with_teacher(teacher.clone()),
                );
            }
        }
    }

    fn audit_facility(&self, schedule: &Schedule, slot: TimeSlot, out: &mut Vec<Violation>) {
        let users: Vec<&Assignment> = schedule
            .at_slot(slot)
            .filter(|a| self.rules.uses_facility(&a.subject))
            .collect();
        let shared = users.iter().enumerate().all(|(i, a)| {
            users[i + 1..].iter().all(|b| {
                a.class_ref == b.class_ref || self.rules.shares_facility(a.class_ref, b.class_ref)
            })
        });
        if !shared {
            out.push(
                Violation::new(
                    ViolationKind::FacilityConflict,
                    format!("{} classes use the facility at {slot}", users.len()),
                )
                .at(slot)
                .with_classes(users.iter().map(|a| a.class_ref)),
            );
        }
    }

    fn audit_sync_groups(&self, schedule: &Schedule, slot: TimeSlot, out: &mut Vec<Violation>) {
        for group in &self.rules.sync_groups {
            let lessons: Vec<&Assignment> = group
                .iter()
                .filter_map(|&c| schedule.get(slot, c))
                .collect();
            let Some(first) = lessons.first() else {
                continue;
            };
            if lessons.iter().any(|a| a.subject != first.subject) {
                let subjects: Vec<&str> = lessons.iter().map(|a| a.subject.name()).collect();
                out.push(
                    Violation::new(
                        ViolationKind::SyncGroupMismatch,
                        format!("synchronized group diverges at {slot}: {}", subjects.join(", ")),
                    )
                    .at(slot)
                    .with_classes(lessons.iter().map(|a| a.class_ref)),
                );
            }
        }
    }

    fn audit_exchange_pairs(&self, schedule: &Schedule, slot: TimeSlot, out: &mut Vec<Violation>) {
        for pair in &self.rules.exchange_pairs {
            let Some(ex) = schedule.get(slot, pair.exchange) else {
                continue;
            };
            let parent = schedule.get(slot, pair.parent);

            if self.rules.is_individualized(&ex.subject) {
                let allowed = parent.is_some_and(|p| self.rules.is_parent_subject(&p.subject));
                if !allowed {
                    let running = parent.map_or("nothing", |p| p.subject.name());
                    out.push(
                        Violation::new(
                            ViolationKind::IndividualizedActivity,
                            format!(
                                "{} has {} at {slot} while {} runs {running}",
                                pair.exchange, ex.subject, pair.parent
                            ),
                        )
                        .at(slot)
                        .with_classes([pair.exchange, pair.parent])
                        .with_subject(ex.subject.clone()),
                    );
                }
            } else if let Some(p) = parent {
                if p.subject != ex.subject {
                    out.push(
                        Violation::new(
                            ViolationKind::ExchangeMismatch,
                            format!(
                                "{} has {} at {slot} but parent {} has {}",
                                pair.exchange, ex.subject, pair.parent, p.subject
                            ),
                        )
                        .at(slot)
                        .with_classes([pair.exchange, pair.parent])
                        .with_subject(ex.subject.clone()),
                    );
                }
            }
        }
    }

    fn audit_daily_duplicates(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let classes: BTreeSet<ClassRef> = self.school.all_classes().iter().copied().collect();
        for class_ref in classes {
            for day in Day::ALL {
                let mut counts: BTreeMap<&Subject, u32> = BTreeMap::new();
                for slot in day.slots() {
                    if let Some(a) = schedule.get(slot, class_ref) {
                        *counts.entry(&a.subject).or_insert(0) += 1;
                    }
                }
                for (subject, count) in counts {
                    let Some(cap) = self.rules.daily_cap(subject) else {
                        continue;
                    };
                    if count > cap {
                        out.push(
                            Violation::new(
                                ViolationKind::DailyDuplicate,
                                format!("{class_ref} has {subject} {count} times on {day} (cap {cap})"),
                            )
                            .on(day)
                            .with_classes([class_ref])
                            .with_subject(subject.clone()),
                        );
                    }
                }
            }
        }
    }
}
