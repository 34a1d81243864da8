//! Input validation for timetabling problems.
//!
//! Checks structural integrity of the school data and rule set before
//! solving. Detects:
//! - Duplicate classes
//! - Required subjects without a teacher mapping
//! - Groups or pairings that reference unknown classes
//! - A class in more than one synchronized group
//! - Chained or doubled exchange pairings
//! - Weekly hours that cannot fit the grid
//! - Slots outside the daily grid

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ClassRef, Rules, School, TimeSlot, SLOTS_PER_WEEK};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A class is registered twice.
    DuplicateClass,
    /// A required subject has no teacher for a class.
    UnstaffedSubject,
    /// A group or pairing names a class the school does not have.
    UnknownClass,
    /// A class belongs to two synchronized groups.
    OverlappingGroups,
    /// An exchange class is also a parent, or is paired twice.
    InvalidExchangePair,
    /// A class requires more weekly hours than the grid holds.
    HoursExceedGrid,
    /// A slot lies outside the daily grid.
    InvalidSlot,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the school data and rule set.
///
/// Checks:
/// 1. No duplicate classes
/// 2. Every required, non-protected subject has a teacher
/// 3. No class requires more than [`SLOTS_PER_WEEK`] hours
/// 4. Synchronized groups reference known classes, without overlap
/// 5. Exchange pairs reference known classes, no class is both exchange
///    and parent, no exchange class has two parents
/// 6. Test periods and slot limits lie inside the grid
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(school: &School, rules: &Rules) -> ValidationResult {
    let mut errors = Vec::new();

    let mut known = BTreeSet::new();
    for &class_ref in school.all_classes() {
        if !known.insert(class_ref) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateClass,
                format!("Duplicate class: {class_ref}"),
            ));
        }
    }

    for &class_ref in &known {
        for req in school.requirements(class_ref) {
            if req.hours > 0
                && !rules.is_protected(&req.subject)
                && school.assigned_teacher(&req.subject, class_ref).is_none()
            {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnstaffedSubject,
                    format!("Class {class_ref} requires {} but has no teacher for it", req.subject),
                ));
            }
        }
        let hours = school.total_hours(class_ref);
        if hours as usize > SLOTS_PER_WEEK {
            errors.push(ValidationError::new(
                ValidationErrorKind::HoursExceedGrid,
                format!("Class {class_ref} requires {hours} hours, grid holds {SLOTS_PER_WEEK}"),
            ));
        }
    }

    check_sync_groups(rules, &known, &mut errors);
    check_exchange_pairs(rules, &known, &mut errors);
    check_slots(rules, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn unknown(class_ref: ClassRef, context: &str) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::UnknownClass,
        format!("{context} references unknown class {class_ref}"),
    )
}

fn check_sync_groups(rules: &Rules, known: &BTreeSet<ClassRef>, errors: &mut Vec<ValidationError>) {
    let mut owner: BTreeMap<ClassRef, usize> = BTreeMap::new();
    for (index, group) in rules.sync_groups.iter().enumerate() {
        for &class_ref in group {
            if !known.contains(&class_ref) {
                errors.push(unknown(class_ref, &format!("Synchronized group {index}")));
            }
            if let Some(first) = owner.insert(class_ref, index) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OverlappingGroups,
                    format!("Class {class_ref} is in synchronized groups {first} and {index}"),
                ));
            }
        }
    }
}

fn check_exchange_pairs(
    rules: &Rules,
    known: &BTreeSet<ClassRef>,
    errors: &mut Vec<ValidationError>,
) {
    let parents: BTreeSet<ClassRef> = rules.exchange_pairs.iter().map(|p| p.parent).collect();
    let mut exchanges = BTreeSet::new();
    for pair in &rules.exchange_pairs {
        for class_ref in [pair.exchange, pair.parent] {
            if !known.contains(&class_ref) {
                errors.push(unknown(class_ref, "Exchange pair"));
            }
        }
        if pair.exchange == pair.parent || parents.contains(&pair.exchange) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidExchangePair,
                format!("Exchange class {} is also a parent class", pair.exchange),
            ));
        }
        if !exchanges.insert(pair.exchange) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidExchangePair,
                format!("Exchange class {} has more than one parent", pair.exchange),
            ));
        }
    }
}

fn check_slots(rules: &Rules, errors: &mut Vec<ValidationError>) {
    let bad = |slot: &TimeSlot| !slot.is_in_grid();
    for slot in rules.test_periods.iter().filter(|s| bad(s)) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSlot,
            format!("Test period {slot} is outside the grid"),
        ));
    }
    for limit in rules.teacher_slot_limits.iter().filter(|l| bad(&l.slot)) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSlot,
            format!("Slot limit for {} at {} is outside the grid", limit.teacher, limit.slot),
        ));
    }
}
