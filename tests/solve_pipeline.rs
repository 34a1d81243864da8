//! End-to-end: input checks, search, audit, repair and report.

use u_timetable::constraints::ConstraintValidator;
use u_timetable::csp::{CspSolver, SolverConfig};
use u_timetable::models::{Assignment, ClassRef, Day, Rules, Schedule, School, Subject, TimeSlot};
use u_timetable::repair::{RepairConfig, RepairOptimizer};
use u_timetable::report::ScheduleReport;
use u_timetable::validation::validate_input;

const C11: ClassRef = ClassRef { grade: 1, class_number: 1 };
const C12: ClassRef = ClassRef { grade: 1, class_number: 2 };
const C15: ClassRef = ClassRef { grade: 1, class_number: 5 };
const C25: ClassRef = ClassRef { grade: 2, class_number: 5 };
const C16: ClassRef = ClassRef { grade: 1, class_number: 6 };

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn school() -> School {
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

fn rules() -> Rules {
    let json = r#"{
        "protected_subjects": ["Homeroom", "Exam"],
        "individualized_subjects": ["Independent"],
        "parent_subjects": ["Math", "English"],
        "core_subjects": ["Math", "English"],
        "facility_subjects": ["PE"],
        "sync_groups": [[{"grade": 1, "class_number": 5}, {"grade": 2, "class_number": 5}]],
        "exchange_pairs": [{"exchange": {"grade": 1, "class_number": 6}, "parent": {"grade": 1, "class_number": 1}}],
        "test_periods": [{"day": "Wed", "period": 6}]
    }"#;
    serde_json::from_str(json).unwrap()
}

fn seeded(school: &School) -> Schedule {
    let mut initial = Schedule::new();
    for &class_ref in school.all_classes() {
        initial
            .place_locked(TimeSlot::new(Day::Fri, 6), Assignment::untaught(class_ref, "Homeroom"))
            .unwrap();
    }
    initial
}

fn hours_of(schedule: &Schedule, school: &School) -> Vec<(ClassRef, Subject, u32)> {
    let mut out = Vec::new();
    for &class_ref in school.all_classes() {
        for req in school.requirements(class_ref) {
            out.push((class_ref, req.subject.clone(), schedule.placed_hours(class_ref, &req.subject)));
        }
    }
    out
}

#[test]
fn test_full_pipeline_produces_clean_timetable() {
    init_tracing();
    let (school, rules) = (school(), rules());
    assert!(validate_input(&school, &rules).is_ok());

    let initial = seeded(&school);
    let outcome = CspSolver::new(&school, &rules)
        .with_config(SolverConfig::default().with_max_nodes(200_000))
        .solve(&initial);
    assert!(outcome.complete, "unassigned: {:?}", outcome.unassigned);
    assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);

    let validator = ConstraintValidator::new(&school, &rules);
    assert!(validator.validate_all(&outcome.schedule).is_empty());
    assert_eq!(outcome.schedule.at_slot(TimeSlot::new(Day::Wed, 6)).count(), 0);

    let report = ScheduleReport::calculate(&outcome.schedule, &school, &rules);
    assert!(report.is_feasible());
    assert_eq!(report.locked_cells, 5);
    // 37 lesson hours plus 5 homerooms.
    assert_eq!(report.filled_cells, 42);

    let repaired = RepairOptimizer::new(&school, &rules)
        .with_config(RepairConfig::default().with_seed(1))
        .optimize(&outcome.schedule);
    assert_eq!(repaired.stats.iterations, 0);
    assert_eq!(repaired.schedule, outcome.schedule);
}

#[test]
fn test_repair_after_manual_edit() {
    init_tracing();
    let (school, rules) = (school(), rules());
    let solved = CspSolver::new(&school, &rules).solve(&seeded(&school)).schedule;

    // Move one of 1-2's Math lessons onto a slot where 1-1 also has
    // Tanaka, creating a teacher conflict.
    let tanaka = u_timetable::models::Teacher::new("Tanaka");
    let conflict_slot = TimeSlot::all()
        .find(|&s| solved.get(s, C11).is_some_and(|a| a.is_taught_by(&tanaka)))
        .unwrap();
    let math_slot = TimeSlot::all()
        .find(|&s| solved.get(s, C12).is_some_and(|a| a.is_taught_by(&tanaka)))
        .unwrap();
    let mut edited = solved.clone();
    let math = edited.remove(math_slot, C12).unwrap();
    if let Some(other) = edited.remove(conflict_slot, C12) {
        edited.assign(math_slot, other);
    }
    edited.assign(conflict_slot, math);

    let validator = ConstraintValidator::new(&school, &rules);
    let before = validator.violation_count(&edited);
    assert!(before >= 1);

    let outcome = RepairOptimizer::new(&school, &rules)
        .with_config(RepairConfig::default().with_seed(7).with_max_iterations(500))
        .optimize(&edited);
    assert_eq!(outcome.stats.initial_violations, before);
    assert!(outcome.stats.final_violations <= before);
    assert_eq!(outcome.violations.len(), outcome.stats.final_violations);
    assert_eq!(hours_of(&outcome.schedule, &school), hours_of(&edited, &school));
    for (slot, class_ref) in edited.locked_cells() {
        assert_eq!(outcome.schedule.get(slot, class_ref), edited.get(slot, class_ref));
    }
}

#[test]
fn test_infeasible_input_reported_before_solving() {
    let school = school().with_requirement(C12, "Music", 2);
    let errors = validate_input(&school, &rules()).unwrap_err();
    assert_eq!(errors.len(), 1);

    let outcome = CspSolver::new(&school, &rules()).solve(&Schedule::new());
    assert_eq!(outcome.unstaffed, vec![(C12, Subject::new("Music"))]);
    let report = ScheduleReport::calculate(&outcome.schedule, &school, &rules());
    assert!(report.total_shortfall >= 2);
}
