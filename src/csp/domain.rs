//! CSP variables and their domains.
//!
//! A variable is an open (slot, class) cell. Its domain is the set of
//! (subject, teacher) pairs that pass
//! [`can_place`](crate::constraints::ConstraintValidator::can_place)
//! right now, restricted to subjects whose standard weekly hours are
//! not yet met.
//!
//! Subjects a class requires but that have no teacher mapping never
//! enter a domain. They are reported through [`Domain::unstaffed`] and
//! [`DomainBuilder::unstaffed`] instead of being dropped silently.

use std::fmt;

use crate::constraints::ConstraintValidator;
use crate::models::{Assignment, ClassRef, Rules, Schedule, School, Subject, Teacher, TimeSlot};

/// An open cell to be filled by the search.
///
/// Ordered by class, then slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CspVariable {
    /// Class owning the cell.
    pub class_ref: ClassRef,
    /// Slot of the cell.
    pub slot: TimeSlot,
}

impl CspVariable {
    /// Creates a variable for the cell at `slot` of `class_ref`.
    pub fn new(slot: TimeSlot, class_ref: ClassRef) -> Self {
        Self { class_ref, slot }
    }
}

impl fmt::Display for CspVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.class_ref, self.slot)
    }
}

/// One candidate value: a subject with its mapped teacher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainValue {
    /// Subject to place.
    pub subject: Subject,
    /// Teacher mapped to the subject for the class.
    pub teacher: Teacher,
}

impl DomainValue {
    /// Creates a candidate value.
    pub fn new(subject: impl Into<Subject>, teacher: impl Into<Teacher>) -> Self {
        Self {
            subject: subject.into(),
            teacher: teacher.into(),
        }
    }

    /// Assignment this value produces for `class_ref`.
    pub fn to_assignment(&self, class_ref: ClassRef) -> Assignment {
        Assignment {
            class_ref,
            subject: self.subject.clone(),
            teacher: Some(self.teacher.clone()),
        }
    }
}

/// Legal values of one variable, in the class's requirement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domain {
    values: Vec<DomainValue>,
    unstaffed: Vec<Subject>,
}

impl Domain {
    /// Creates a domain from values.
    pub fn from_values(values: impl IntoIterator<Item = DomainValue>) -> Self {
        Self {
            values: values.into_iter().collect(),
            unstaffed: Vec::new(),
        }
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value is left (wipeout).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in requirement order.
    pub fn values(&self) -> &[DomainValue] {
        &self.values
    }

    /// Iterates over the values.
    pub fn iter(&self) -> impl Iterator<Item = &DomainValue> {
        self.values.iter()
    }

    /// Whether some value carries `subject`.
    pub fn contains_subject(&self, subject: &Subject) -> bool {
        self.values.iter().any(|v| &v.subject == subject)
    }

    /// Whether some value is taught by `teacher`.
    pub fn contains_teacher(&self, teacher: &Teacher) -> bool {
        self.values.iter().any(|v| &v.teacher == teacher)
    }

    /// Number of values taught by `teacher`.
    pub fn count_teacher(&self, teacher: &Teacher) -> usize {
        self.values.iter().filter(|v| &v.teacher == teacher).count()
    }

    /// Subjects short of hours that have no teacher mapping.
    pub fn unstaffed(&self) -> &[Subject] {
        &self.unstaffed
    }
}

/// Builds domains against the current schedule.
#[derive(Debug, Clone, Copy)]
pub struct DomainBuilder<'a> {
    validator: ConstraintValidator<'a>,
}

impl<'a> DomainBuilder<'a> {
    /// Creates a builder over a school and its rules.
    pub fn new(school: &'a School, rules: &'a Rules) -> Self {
        Self {
            validator: ConstraintValidator::new(school, rules),
        }
    }

    /// Validator used for legality checks.
    pub fn validator(&self) -> ConstraintValidator<'a> {
        self.validator
    }

    /// Domain of `var` in `schedule`.
    ///
    /// An occupied or locked cell, or a class with nothing left to
    /// place, yields an empty domain.
    ///
    /// # Example
    /// ```
    /// use u_timetable::csp::{CspVariable, DomainBuilder, DomainValue};
    /// use u_timetable::models::{ClassRef, Day, Rules, Schedule, School, TimeSlot};
    ///
    /// let c = ClassRef::new(1, 1);
    /// let school = School::new().with_lesson(c, "Math", 1, "T");
    /// let rules = Rules::new();
    /// let builder = DomainBuilder::new(&school, &rules);
    ///
    /// let var = CspVariable::new(TimeSlot::new(Day::Mon, 1), c);
    /// let domain = builder.build(&Schedule::new(), var);
    /// assert_eq!(domain.values(), &[DomainValue::new("Math", "T")]);
    /// ```
    pub fn build(&self, schedule: &Schedule, var: CspVariable) -> Domain {
        let school = self.validator.school();
        let mut domain = Domain::default();
        for req in school.requirements(var.class_ref) {
            if self.validator.rules().is_protected(&req.subject)
                || schedule.placed_hours(var.class_ref, &req.subject) >= req.hours
            {
                continue;
            }
            let Some(teacher) = school.assigned_teacher(&req.subject, var.class_ref) else {
                domain.unstaffed.push(req.subject.clone());
                continue;
            };
            let value = DomainValue {
                subject: req.subject.clone(),
                teacher: teacher.clone(),
            };
            let candidate = value.to_assignment(var.class_ref);
            if self.validator.can_place(schedule, var.slot, &candidate).is_ok() {
                domain.values.push(value);
            }
        }
        domain
    }

    /// Whether `value` is still legal for `var`: hours remain and the
    /// placement check passes.
    pub fn still_valid(&self, schedule: &Schedule, var: CspVariable, value: &DomainValue) -> bool {
        self.remaining_hours(schedule, var.class_ref, &value.subject) > 0
            && self
                .validator
                .can_place(schedule, var.slot, &value.to_assignment(var.class_ref))
                .is_ok()
    }

    /// Hours of `subject` still to place for `class_ref`.
    pub fn remaining_hours(&self, schedule: &Schedule, class_ref: ClassRef, subject: &Subject) -> u32 {
        self.validator
            .school()
            .standard_hours(class_ref, subject)
            .saturating_sub(schedule.placed_hours(class_ref, subject))
    }

    /// Whether the search is responsible for placing `subject` in
    /// `class_ref`: it has a teacher and is not protected.
    pub fn is_placeable(&self, class_ref: ClassRef, subject: &Subject) -> bool {
        !self.validator.rules().is_protected(subject)
            && self
                .validator
                .school()
                .assigned_teacher(subject, class_ref)
                .is_some()
    }

    /// Placeable subjects of `class_ref` that still miss hours, with the
    /// number of missing hours.
    pub fn open_demand(&self, schedule: &Schedule, class_ref: ClassRef) -> Vec<(Subject, u32)> {
        self.validator
            .school()
            .requirements(class_ref)
            .iter()
            .filter(|r| self.is_placeable(class_ref, &r.subject))
            .filter_map(|r| {
                let left = self.remaining_hours(schedule, class_ref, &r.subject);
                (left > 0).then(|| (r.subject.clone(), left))
            })
            .collect()
    }

    /// Total placeable hours still missing for `class_ref`.
    pub fn remaining_demand(&self, schedule: &Schedule, class_ref: ClassRef) -> u32 {
        self.open_demand(schedule, class_ref)
            .iter()
            .map(|(_, hours)| hours)
            .sum()
    }

    /// Every (class, subject) with required hours but no teacher.
    pub fn unstaffed(&self) -> Vec<(ClassRef, Subject)> {
        let school = self.validator.school();
        let mut out = Vec::new();
        for &class_ref in school.all_classes() {
            for req in school.requirements(class_ref) {
                let pair = (class_ref, req.subject.clone());
                if req.hours > 0
                    && !self.validator.rules().is_protected(&req.subject)
                    && school.assigned_teacher(&req.subject, class_ref).is_none()
                    && !out.contains(&pair)
                {
                    out.push(pair);
                }
            }
        }
        out
    }
}
