//! School reference data.
//!
//! Classes, required subjects with standard weekly hours, the
//! teacher-to-(class, subject) table and the absence calendar.
//! Loaded once by the caller before solving; the engine only reads it.

use std::collections::{BTreeSet, HashMap};

use super::{AbsenceCalendar, ClassRef, Subject, Teacher, TimeSlot};

/// A subject a class must take, with its standard weekly hours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRequirement {
    /// Required subject.
    pub subject: Subject,
    /// Standard weekly hours.
    pub hours: u32,
}

/// Read-only school data consulted by the engine.
#[derive(Debug, Clone, Default)]
pub struct School {
    classes: Vec<ClassRef>,
    teachers: BTreeSet<Teacher>,
    requirements: HashMap<ClassRef, Vec<SubjectRequirement>>,
    teacher_map: HashMap<(ClassRef, Subject), Teacher>,
    absences: AbsenceCalendar,
}

impl School {
    /// Creates an empty school.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class. Duplicates are kept so input validation can
    /// report them.
    pub fn with_class(mut self, class_ref: ClassRef) -> Self {
        self.classes.push(class_ref);
        self
    }

    /// Registers a teacher without any mapping.
    pub fn with_teacher(mut self, teacher: impl Into<Teacher>) -> Self {
        self.teachers.insert(teacher.into());
        self
    }

    /// Adds (or replaces) a required subject with its weekly hours.
    ///
    /// Registers the class if it is not known yet.
    pub fn with_requirement(
        mut self,
        class_ref: ClassRef,
        subject: impl Into<Subject>,
        hours: u32,
    ) -> Self {
        if !self.classes.contains(&class_ref) {
            self.classes.push(class_ref);
        }
        let subject = subject.into();
        let reqs = self.requirements.entry(class_ref).or_default();
        match reqs.iter_mut().find(|r| r.subject == subject) {
            Some(existing) => existing.hours = hours,
            None => reqs.push(SubjectRequirement { subject, hours }),
        }
        self
    }

    /// Maps the teacher of a (class, subject).
    pub fn with_assigned_teacher(
        mut self,
        class_ref: ClassRef,
        subject: impl Into<Subject>,
        teacher: impl Into<Teacher>,
    ) -> Self {
        let teacher = teacher.into();
        self.teachers.insert(teacher.clone());
        self.teacher_map.insert((class_ref, subject.into()), teacher);
        self
    }

    /// Shorthand for a requirement plus its teacher mapping.
    pub fn with_lesson(
        self,
        class_ref: ClassRef,
        subject: impl Into<Subject>,
        hours: u32,
        teacher: impl Into<Teacher>,
    ) -> Self {
        let subject = subject.into();
        self.with_requirement(class_ref, subject.clone(), hours)
            .with_assigned_teacher(class_ref, subject, teacher)
    }

    /// Sets the absence calendar.
    pub fn with_absences(mut self, absences: AbsenceCalendar) -> Self {
        self.absences = absences;
        self
    }

    /// All classes in registration order.
    pub fn all_classes(&self) -> &[ClassRef] {
        &self.classes
    }

    /// All known teachers.
    pub fn all_teachers(&self) -> impl Iterator<Item = &Teacher> {
        self.teachers.iter()
    }

    /// Teacher mapped to (subject, class).
    pub fn assigned_teacher(&self, subject: &Subject, class_ref: ClassRef) -> Option<&Teacher> {
        self.teacher_map.get(&(class_ref, subject.clone()))
    }

    /// Standard weekly hours of a subject for a class (0 if not required).
    pub fn standard_hours(&self, class_ref: ClassRef, subject: &Subject) -> u32 {
        self.requirements
            .get(&class_ref)
            .and_then(|reqs| reqs.iter().find(|r| &r.subject == subject))
            .map_or(0, |r| r.hours)
    }

    /// Whether `teacher` is absent at `slot`.
    #[inline]
    pub fn is_teacher_unavailable(&self, slot: TimeSlot, teacher: &Teacher) -> bool {
        self.absences.is_absent(teacher, slot)
    }

    /// Required subjects of a class with their hours, in insertion order.
    pub fn requirements(&self, class_ref: ClassRef) -> &[SubjectRequirement] {
        self.requirements
            .get(&class_ref)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Required subjects of a class.
    pub fn required_subjects(&self, class_ref: ClassRef) -> impl Iterator<Item = &Subject> {
        self.requirements(class_ref).iter().map(|r| &r.subject)
    }

    /// Total standard weekly hours of a class.
    pub fn total_hours(&self, class_ref: ClassRef) -> u32 {
        self.requirements(class_ref).iter().map(|r| r.hours).sum()
    }

    /// Absence calendar.
    pub fn absences(&self) -> &AbsenceCalendar {
        &self.absences
    }
}
