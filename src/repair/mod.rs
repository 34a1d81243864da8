//! Local-search repair.
//!
//! Improves a mostly filled schedule that still carries violations,
//! without a full search. Two moves are used:
//!
//! - **Random swap**: exchange the contents of two unlocked cells of
//!   one class. Kept when the violation count does not increase.
//! - **Targeted relocation**: move one lesson named by a violation to
//!   an empty cell of the same class where it passes the placement
//!   check. Kept when the violation count strictly decreases.
//!
//! Both moves keep every class's weekly hours unchanged and never touch
//! locked cells, test periods or protected subjects. The returned
//! schedule is never worse than the input.
//!
//! # Reference
//! - Minton et al. (1992), "Minimizing Conflicts: A Heuristic Repair
//!   Method for Constraint Satisfaction and Scheduling Problems"
//! - Schaerf (1999), "A Survey of Automated Timetabling", Sec. 4

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constraints::ConstraintValidator;
use crate::models::{ClassRef, Day, Rules, Schedule, School, TimeSlot, Violation};

/// Local-search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Iteration budget.
    pub max_iterations: usize,
    /// Stop after this many consecutive iterations without improvement.
    pub patience: usize,
    /// RNG seed (`None` = OS entropy).
    pub seed: Option<u64>,
    /// Wall-clock budget.
    pub time_limit: Option<Duration>,
    /// Try a targeted relocation before each random swap.
    pub relocation: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            patience: 20,
            seed: None,
            time_limit: None,
            relocation: true,
        }
    }
}

impl RepairConfig {
    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Sets the early-stop patience.
    pub fn with_patience(mut self, n: usize) -> Self {
        self.patience = n;
        self
    }

    /// Fixes the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Caps the wall-clock time.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Enables or disables targeted relocation.
    pub fn with_relocation(mut self, enabled: bool) -> Self {
        self.relocation = enabled;
        self
    }
}

/// Repair counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairStats {
    /// Iterations run.
    pub iterations: usize,
    /// Random swaps tried.
    pub swap_attempts: usize,
    /// Random swaps kept.
    pub swaps_kept: usize,
    /// Targeted relocations tried.
    pub relocation_attempts: usize,
    /// Targeted relocations kept.
    pub relocations_kept: usize,
    /// Violations of the input.
    pub initial_violations: usize,
    /// Violations of the returned schedule.
    pub final_violations: usize,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl RepairStats {
    /// Share of the initial violations removed, in percent.
    pub fn improvement_percentage(&self) -> f64 {
        if self.initial_violations == 0 {
            return 0.0;
        }
        let removed = self.initial_violations.saturating_sub(self.final_violations);
        removed as f64 / self.initial_violations as f64 * 100.0
    }
}

/// Result of a repair run.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    /// Best schedule seen.
    pub schedule: Schedule,
    /// Counters of the run.
    pub stats: RepairStats,
    /// Violations remaining in `schedule`.
    pub violations: Vec<Violation>,
}

/// Violation-driven local search.
///
/// # Example
/// ```
/// use u_timetable::models::{Assignment, ClassRef, Day, Rules, Schedule, School, TimeSlot};
/// use u_timetable::repair::{RepairConfig, RepairOptimizer};
///
/// let (a, b) = (ClassRef::new(1, 1), ClassRef::new(1, 2));
/// let school = School::new()
///     .with_lesson(a, "Math", 1, "Tanaka")
///     .with_lesson(b, "Math", 1, "Tanaka");
/// let rules = Rules::new();
///
/// let slot = TimeSlot::new(Day::Mon, 1);
/// let mut schedule = Schedule::new();
/// schedule.assign(slot, Assignment::new(a, "Math", "Tanaka"));
/// schedule.assign(slot, Assignment::new(b, "Math", "Tanaka"));
///
/// let optimizer = RepairOptimizer::new(&school, &rules)
///     .with_config(RepairConfig::default().with_seed(1));
/// let outcome = optimizer.optimize(&schedule);
/// assert_eq!(outcome.stats.initial_violations, 1);
/// assert!(outcome.violations.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RepairOptimizer<'a> {
    validator: ConstraintValidator<'a>,
    config: RepairConfig,
}

impl<'a> RepairOptimizer<'a> {
    /// Creates an optimizer with default configuration.
    pub fn new(school: &'a School, rules: &'a Rules) -> Self {
        Self {
            validator: ConstraintValidator::new(school, rules),
            config: RepairConfig::default(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: RepairConfig) -> Self {
        self.config = config;
        self
    }

    /// Repair configuration in use.
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// Runs the local search on a copy of `schedule`.
    pub fn optimize(&self, schedule: &Schedule) -> RepairOutcome {
        let started = Instant::now();
        let deadline = self.config.time_limit.map(|limit| started + limit);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut current = schedule.clone();
        let mut count = self.validator.violation_count(&current);
        let mut best = current.clone();
        let mut best_count = count;
        let mut stats = RepairStats {
            initial_violations: count,
            ..RepairStats::default()
        };
        let mut stale = 0;

        info!(
            event = "repair_start",
            violations = count,
            max_iterations = self.config.max_iterations,
        );

        for _ in 0..self.config.max_iterations {
            if best_count == 0 || stale >= self.config.patience {
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(event = "budget_exhausted", iterations = stats.iterations);
                break;
            }
            stats.iterations += 1;

            let mut moved = false;
            if self.config.relocation && count > 0 {
                let violations = self.validator.validate_all(&current);
                let target = &violations[rng.random_range(0..violations.len())];
                stats.relocation_attempts += 1;
                if let Some(after) = self.relocate(&mut current, target, count) {
                    stats.relocations_kept += 1;
                    debug!(event = "move_kept", kind = "relocation", violations = after);
                    count = after;
                    moved = true;
                }
            }
            if !moved {
                stats.swap_attempts += 1;
                if let Some(after) = self.swap(&mut current, count, &mut rng) {
                    stats.swaps_kept += 1;
                    if after < count {
                        debug!(event = "move_kept", kind = "swap", violations = after);
                    }
                    count = after;
                }
            }

            if count < best_count {
                best_count = count;
                best = current.clone();
                stale = 0;
            } else {
                stale += 1;
            }
        }

        stats.final_violations = best_count;
        stats.elapsed = started.elapsed();
        info!(
            event = "repair_end",
            iterations = stats.iterations,
            initial_violations = stats.initial_violations,
            final_violations = stats.final_violations,
            swaps_kept = stats.swaps_kept,
            relocations_kept = stats.relocations_kept,
            duration_ms = stats.elapsed.as_millis() as u64,
        );

        let violations = self.validator.validate_all(&best);
        RepairOutcome {
            schedule: best,
            stats,
            violations,
        }
    }

    /// Swaps two random unlocked cells of one class in place.
    ///
    /// Returns whether the swap was kept (the violation count did not
    /// increase); otherwise `schedule` is left as it was.
    pub fn random_swap<R: Rng>(&self, schedule: &mut Schedule, rng: &mut R) -> bool {
        let count = self.validator.violation_count(schedule);
        self.swap(schedule, count, rng).is_some()
    }

    /// Moves one lesson named by `violation` to an empty cell of the
    /// same class where it passes the placement check.
    ///
    /// Returns whether a move was kept (the violation count strictly
    /// decreased); otherwise `schedule` is left as it was.
    pub fn targeted_relocation(&self, schedule: &mut Schedule, violation: &Violation) -> bool {
        let count = self.validator.violation_count(schedule);
        self.relocate(schedule, violation, count).is_some()
    }

    fn swap<R: Rng>(
        &self,
        schedule: &mut Schedule,
        count: usize,
        rng: &mut R,
    ) -> Option<usize> {
        let classes: Vec<(ClassRef, Vec<TimeSlot>)> = self
            .validator
            .school()
            .all_classes()
            .iter()
            .map(|&c| (c, self.movable_cells(schedule, c)))
            .filter(|(c, cells)| {
                cells.len() >= 2 && cells.iter().any(|&s| schedule.is_occupied(s, *c))
            })
            .collect();
        if classes.is_empty() {
            return None;
        }

        let (class_ref, cells) = &classes[rng.random_range(0..classes.len())];
        let class_ref = *class_ref;
        let filled: Vec<TimeSlot> = cells
            .iter()
            .copied()
            .filter(|&s| schedule.is_occupied(s, class_ref))
            .collect();
        let a = filled[rng.random_range(0..filled.len())];
        let others: Vec<TimeSlot> = cells.iter().copied().filter(|&s| s != a).collect();
        let b = others[rng.random_range(0..others.len())];
        if schedule.get(a, class_ref) == schedule.get(b, class_ref) {
            return None;
        }

        swap_cells(schedule, class_ref, a, b);
        let after = self.validator.violation_count(schedule);
        if after <= count {
            Some(after)
        } else {
            swap_cells(schedule, class_ref, a, b);
            None
        }
    }

    fn relocate(&self, schedule: &mut Schedule, violation: &Violation, count: usize) -> Option<usize> {
        for (class_ref, from) in self.offending_cells(schedule, violation) {
            let Some(lesson) = schedule.get(from, class_ref).cloned() else {
                continue;
            };
            let targets: Vec<TimeSlot> = self
                .movable_cells(schedule, class_ref)
                .into_iter()
                .filter(|&s| !schedule.is_occupied(s, class_ref))
                .collect();

            schedule.remove(from, class_ref);
            for to in targets {
                if self.validator.can_place(schedule, to, &lesson).is_err() {
                    continue;
                }
                schedule.assign(to, lesson.clone());
                let after = self.validator.violation_count(schedule);
                if after < count {
                    return Some(after);
                }
                schedule.remove(to, class_ref);
            }
            schedule.assign(from, lesson);
        }
        None
    }

    /// Cells holding the lessons a violation is about.
    fn offending_cells(&self, schedule: &Schedule, violation: &Violation) -> Vec<(ClassRef, TimeSlot)> {
        let slots: Vec<TimeSlot> = match (violation.slot, violation.day) {
            (Some(slot), _) => vec![slot],
            (None, Some(day)) => day.slots().collect(),
            (None, None) => Day::ALL.into_iter().flat_map(Day::slots).collect(),
        };
        let mut cells = Vec::new();
        for &class_ref in &violation.classes {
            for &slot in &slots {
                let Some(lesson) = schedule.get(slot, class_ref) else {
                    continue;
                };
                let subject_matches = violation
                    .subject
                    .as_ref()
                    .map_or(true, |s| s == &lesson.subject);
                if subject_matches && self.is_movable(schedule, slot, class_ref) {
                    cells.push((class_ref, slot));
                }
            }
        }
        cells
    }

    /// Unlocked cells of a class outside test periods whose content, if
    /// any, is not a protected subject.
    fn movable_cells(&self, schedule: &Schedule, class_ref: ClassRef) -> Vec<TimeSlot> {
        TimeSlot::all()
            .filter(|&s| self.is_movable(schedule, s, class_ref))
            .collect()
    }

    fn is_movable(&self, schedule: &Schedule, slot: TimeSlot, class_ref: ClassRef) -> bool {
        let rules = self.validator.rules();
        !schedule.is_locked(slot, class_ref)
            && !rules.is_test_period(slot)
            && schedule
                .get(slot, class_ref)
                .map_or(true, |a| !rules.is_protected(&a.subject))
    }
}

/// Exchanges the contents of two unlocked cells of one class.
fn swap_cells(schedule: &mut Schedule, class_ref: ClassRef, a: TimeSlot, b: TimeSlot) {
    let first = schedule.remove(a, class_ref);
    let second = schedule.remove(b, class_ref);
    if let Some(lesson) = first {
        schedule.assign(b, lesson);
    }
    if let Some(lesson) = second {
        schedule.assign(a, lesson);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::fixtures::*;
    use crate::models::{Assignment, Subject, ViolationKind};
    use rand::rngs::SmallRng;

    fn slot(day: Day, period: u8) -> TimeSlot {
        TimeSlot::new(day, period)
    }

    /// Fixture lessons packed into the first periods, with clashes.
    fn messy_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.assign(slot(Day::Mon, 1), Assignment::new(C11, "Math", "Tanaka"));
        s.assign(slot(Day::Mon, 1), Assignment::new(C12, "Math", "Tanaka"));
        s.assign(slot(Day::Mon, 2), Assignment::new(C11, "PE", "Sato"));
        s.assign(slot(Day::Mon, 2), Assignment::new(C12, "PE", "Sato"));
        s.assign(slot(Day::Mon, 3), Assignment::new(C12, "Science", "Mori"));
        s.assign(slot(Day::Mon, 4), Assignment::new(C12, "Science", "Mori"));
        s.assign(slot(Day::Tue, 1), Assignment::new(C15, "Math", "Kato"));
        s.assign(slot(Day::Tue, 1), Assignment::new(C25, "PE", "Sato"));
        s.place_locked(slot(Day::Fri, 6), Assignment::untaught(C11, "Homeroom"))
            .unwrap();
        s.lock(slot(Day::Thu, 1), C12);
        s
    }

    fn class_hours(schedule: &Schedule) -> Vec<(ClassRef, Subject, u32)> {
        let school = school();
        let mut out = Vec::new();
        for &c in school.all_classes() {
            for req in school.requirements(c) {
                out.push((c, req.subject.clone(), schedule.placed_hours(c, &req.subject)));
            }
        }
        out
    }

    #[test]
    fn test_zero_iterations_returns_input() {
        let (school, rules) = (school(), rules());
        let input = messy_schedule();
        let outcome = RepairOptimizer::new(&school, &rules)
            .with_config(RepairConfig::default().with_max_iterations(0).with_seed(3))
            .optimize(&input);

        assert_eq!(outcome.schedule, input);
        assert_eq!(outcome.stats.iterations, 0);
        assert_eq!(outcome.stats.final_violations, outcome.stats.initial_violations);
    }

    #[test]
    fn test_relocation_fixes_teacher_conflict() {
        let (school, rules) = (school(), rules());
        let optimizer = RepairOptimizer::new(&school, &rules);
        let validator = ConstraintValidator::new(&school, &rules);
        let mut schedule = Schedule::new();
        schedule.assign(slot(Day::Mon, 1), Assignment::new(C11, "Math", "Tanaka"));
        schedule.assign(slot(Day::Mon, 1), Assignment::new(C12, "Math", "Tanaka"));

        let found = validator.validate_all(&schedule);
        assert_eq!(found.len(), 1);
        assert!(optimizer.targeted_relocation(&mut schedule, &found[0]));
        assert_eq!(validator.violation_count(&schedule), 0);
        assert_eq!(schedule.placed_hours(C11, &Subject::new("Math")), 1);
        assert_eq!(schedule.placed_hours(C12, &Subject::new("Math")), 1);
    }

    #[test]
    fn test_relocation_fixes_daily_duplicate() {
        let (school, rules) = (school(), rules());
        let optimizer = RepairOptimizer::new(&school, &rules);
        let validator = ConstraintValidator::new(&school, &rules);
        let mut schedule = Schedule::new();
        schedule.assign(slot(Day::Wed, 1), Assignment::new(C12, "Science", "Mori"));
        schedule.assign(slot(Day::Wed, 4), Assignment::new(C12, "Science", "Mori"));

        let found = validator.validate_all(&schedule);
        assert_eq!(found[0].kind, ViolationKind::DailyDuplicate);
        assert!(optimizer.targeted_relocation(&mut schedule, &found[0]));
        assert_eq!(validator.violation_count(&schedule), 0);
        assert_eq!(schedule.daily_count(C12, Day::Wed, &Subject::new("Science")), 1);
    }

    #[test]
    fn test_relocation_leaves_schedule_when_stuck() {
        let (school, rules) = (school(), rules());
        let optimizer = RepairOptimizer::new(&school, &rules);
        let validator = ConstraintValidator::new(&school, &rules);
        let mut schedule = Schedule::new();
        schedule
            .place_locked(slot(Day::Mon, 1), Assignment::new(C11, "Math", "Tanaka"))
            .unwrap();
        schedule
            .place_locked(slot(Day::Mon, 1), Assignment::new(C12, "Math", "Tanaka"))
            .unwrap();
        let before = schedule.clone();

        let found = validator.validate_all(&schedule);
        assert!(!optimizer.targeted_relocation(&mut schedule, &found[0]));
        assert_eq!(schedule, before);
    }

    #[test]
    fn test_random_swap_never_increases_violations() {
        let (school, rules) = (school(), rules());
        let optimizer = RepairOptimizer::new(&school, &rules);
        let validator = ConstraintValidator::new(&school, &rules);
        let mut schedule = messy_schedule();
        let mut rng = SmallRng::seed_from_u64(42);

        let mut count = validator.violation_count(&schedule);
        for _ in 0..50 {
            optimizer.random_swap(&mut schedule, &mut rng);
            let now = validator.violation_count(&schedule);
            assert!(now <= count);
            count = now;
        }
    }

    #[test]
    fn test_optimize_never_worse_and_keeps_locks() {
        let (school, rules) = (school(), rules());
        let input = messy_schedule();
        let validator = ConstraintValidator::new(&school, &rules);
        let before = validator.violation_count(&input);

        let outcome = RepairOptimizer::new(&school, &rules)
            .with_config(RepairConfig::default().with_max_iterations(300).with_seed(7))
            .optimize(&input);

        assert_eq!(outcome.stats.initial_violations, before);
        assert!(outcome.stats.final_violations <= before);
        assert!(outcome.stats.final_violations < before);
        assert_eq!(outcome.violations.len(), outcome.stats.final_violations);
        for (s, c) in input.locked_cells() {
            assert_eq!(outcome.schedule.get(s, c), input.get(s, c));
            assert!(outcome.schedule.is_locked(s, c));
        }
        assert_eq!(class_hours(&outcome.schedule), class_hours(&input));
    }

    #[test]
    fn test_clean_schedule_is_returned_unchanged() {
        let (school, rules) = (school(), rules());
        let mut input = Schedule::new();
        input.assign(slot(Day::Mon, 1), Assignment::new(C11, "Math", "Tanaka"));
        let outcome = RepairOptimizer::new(&school, &rules)
            .with_config(RepairConfig::default().with_seed(1))
            .optimize(&input);
        assert_eq!(outcome.schedule, input);
        assert_eq!(outcome.stats.iterations, 0);
        assert_eq!(outcome.stats.improvement_percentage(), 0.0);
    }

    /// Two locked clashing lessons and nothing movable.
    fn stuck_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.place_locked(slot(Day::Mon, 1), Assignment::new(C11, "Math", "Tanaka"))
            .unwrap();
        s.place_locked(slot(Day::Mon, 1), Assignment::new(C12, "Math", "Tanaka"))
            .unwrap();
        s
    }

    #[test]
    fn test_patience_stops_after_stale_iterations() {
        let (school, rules) = (school(), rules());
        let input = stuck_schedule();
        let outcome = RepairOptimizer::new(&school, &rules)
            .with_config(RepairConfig::default().with_patience(4).with_seed(5))
            .optimize(&input);

        assert_eq!(outcome.stats.iterations, 4);
        assert_eq!(outcome.stats.relocations_kept + outcome.stats.swaps_kept, 0);
        assert_eq!(outcome.stats.final_violations, 1);
        assert_eq!(outcome.schedule, input);
    }

    #[test]
    fn test_time_limit_stops_search() {
        let (school, rules) = (school(), rules());
        let input = stuck_schedule();
        let config = RepairConfig::default()
            .with_patience(1000)
            .with_time_limit(Duration::ZERO)
            .with_seed(5);
        let outcome = RepairOptimizer::new(&school, &rules)
            .with_config(config)
            .optimize(&input);

        assert_eq!(outcome.stats.iterations, 0);
        assert_eq!(outcome.schedule, input);
        assert_eq!(outcome.violations.len(), 1);
    }

    #[test]
    fn test_improvement_percentage() {
        let stats = RepairStats {
            initial_violations: 8,
            final_violations: 2,
            ..RepairStats::default()
        };
        assert!((stats.improvement_percentage() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: RepairConfig = serde_json::from_str(r#"{"seed": 9, "relocation": false}"#).unwrap();
        assert_eq!(config.seed, Some(9));
        assert!(!config.relocation);
        assert_eq!(config.patience, 20);
        assert_eq!(config.max_iterations, 1000);
    }
}
