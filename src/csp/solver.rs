//! Backtracking search with MRV, LCV and forward propagation.
//!
//! # Algorithm
//!
//! 1. Pick the open cell with the fewest legal values (MRV); cells whose
//!    domain is currently empty are not candidates.
//! 2. Order its values least-constraining first (LCV).
//! 3. Place a value and re-derive the domains of every open cell at the
//!    same slot and of the same class.
//! 4. If a touched class can no longer cover its missing hours with the
//!    cells still open to it, undo (domain wipeout).
//! 5. Recurse; on failure undo the placement and restore the saved
//!    domains.
//! 6. When a class has more open cells than missing hours, leaving the
//!    cell empty is tried after every value.
//!
//! The search succeeds as soon as no class misses a staffed hour. An
//! exhausted or aborted search returns the schedule that had the fewest
//! missing hours.
//!
//! # Reference
//! - Russell & Norvig (2021), "Artificial Intelligence: A Modern
//!   Approach", Ch. 6.3 (Backtracking Search for CSPs)
//! - Haralick & Elliott (1980), "Increasing Tree Search Efficiency for
//!   Constraint Satisfaction Problems"

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{CspVariable, Domain, DomainBuilder, DomainValue};
use crate::models::{ClassRef, Day, Rules, Schedule, School, Subject, TimeSlot, Violation};

/// Variable selection strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableOrder {
    /// Smallest domain first (MRV).
    #[default]
    MostConstrained,
    /// First open cell in class, then slot order.
    Sequential,
}

/// Value ordering strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrder {
    /// Lowest constraint score first (LCV).
    #[default]
    LeastConstraining,
    /// Requirement order.
    Natural,
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Which open cell to fill next.
    pub variable_order: VariableOrder,
    /// In which order to try its values.
    pub value_order: ValueOrder,
    /// Re-derive neighbouring domains after each placement.
    pub propagate: bool,
    /// Node budget.
    pub max_nodes: Option<u64>,
    /// Wall-clock budget.
    pub time_limit: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            variable_order: VariableOrder::MostConstrained,
            value_order: ValueOrder::LeastConstraining,
            propagate: true,
            max_nodes: None,
            time_limit: None,
        }
    }
}

impl SolverConfig {
    /// Sets the variable selection strategy.
    pub fn with_variable_order(mut self, order: VariableOrder) -> Self {
        self.variable_order = order;
        self
    }

    /// Sets the value ordering strategy.
    pub fn with_value_order(mut self, order: ValueOrder) -> Self {
        self.value_order = order;
        self
    }

    /// Enables or disables propagation.
    pub fn with_propagation(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    /// Caps the number of search nodes.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    /// Caps the wall-clock time.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Search counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Search nodes entered.
    pub nodes_explored: u64,
    /// Placements or skips undone after their subtree failed.
    pub backtracks: u64,
    /// Propagation passes run.
    pub propagations: u64,
    /// Branches cut because a class could no longer meet its hours.
    pub domain_wipeouts: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

/// Hours of a staffed subject the search could not place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetDemand {
    /// Class short of hours.
    pub class_ref: ClassRef,
    /// Subject short of hours.
    pub subject: Subject,
    /// Hours still missing.
    pub missing_hours: u32,
}

/// Result of a solve.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Best schedule found.
    pub schedule: Schedule,
    /// Counters of the run.
    pub stats: SolverStats,
    /// Every staffed hour placed.
    pub complete: bool,
    /// Staffed hours left unplaced.
    pub unassigned: Vec<UnmetDemand>,
    /// (class, subject) pairs with required hours but no teacher.
    pub unstaffed: Vec<(ClassRef, Subject)>,
    /// Audit of the returned schedule.
    pub violations: Vec<Violation>,
}

/// Backtracking timetable solver.
///
/// # Example
/// ```
/// use u_timetable::csp::CspSolver;
/// use u_timetable::models::{ClassRef, Rules, Schedule, School};
///
/// let (a, b) = (ClassRef::new(1, 1), ClassRef::new(1, 2));
/// let school = School::new()
///     .with_lesson(a, "Math", 3, "Tanaka")
///     .with_lesson(b, "Math", 3, "Tanaka")
///     .with_lesson(b, "Art", 1, "Mori");
/// let rules = Rules::new().with_core_subjects(["Math"]);
///
/// let outcome = CspSolver::new(&school, &rules).solve(&Schedule::new());
/// assert!(outcome.complete);
/// assert!(outcome.violations.is_empty());
/// assert_eq!(outcome.schedule.assignment_count(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct CspSolver<'a> {
    school: &'a School,
    rules: &'a Rules,
    config: SolverConfig,
}

impl<'a> CspSolver<'a> {
    /// Creates a solver with default configuration.
    pub fn new(school: &'a School, rules: &'a Rules) -> Self {
        Self {
            school,
            rules,
            config: SolverConfig::default(),
        }
    }

    /// Sets the search configuration.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Search configuration in use.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Open cells of `schedule`: unlocked, empty, outside test periods.
    pub fn variables(&self, schedule: &Schedule) -> Vec<CspVariable> {
        let mut vars = Vec::new();
        for class_ref in distinct_classes(self.school) {
            for slot in TimeSlot::all() {
                if !schedule.is_locked(slot, class_ref)
                    && !schedule.is_occupied(slot, class_ref)
                    && !self.rules.is_test_period(slot)
                {
                    vars.push(CspVariable::new(slot, class_ref));
                }
            }
        }
        vars
    }

    /// Fills the open cells of `initial`.
    ///
    /// `initial` is not modified. Its filled cells, locked or not, are
    /// kept and count towards weekly hours.
    pub fn solve(&self, initial: &Schedule) -> SolveOutcome {
        let started = Instant::now();
        let builder = DomainBuilder::new(self.school, self.rules);

        let unstaffed = builder.unstaffed();
        for (class_ref, subject) in &unstaffed {
            warn!(
                event = "unstaffed_subject",
                class = %class_ref,
                subject = %subject,
                "required subject has no teacher and will not be placed"
            );
        }

        let mut search = Search::new(
            builder,
            &self.config,
            distinct_classes(self.school),
            initial.clone(),
            self.variables(initial),
            started,
        );

        info!(
            event = "solve_start",
            classes = search.classes.len(),
            variables = search.domains.len(),
            missing_hours = search.open_hours(),
        );

        let step = search.search();
        let mut stats = search.stats;
        stats.elapsed = started.elapsed();
        let schedule = match step {
            Step::Solved => search.schedule,
            Step::Failed | Step::Aborted => search.best,
        };

        let unassigned: Vec<UnmetDemand> = search
            .classes
            .iter()
            .flat_map(|&class_ref| {
                builder
                    .open_demand(&schedule, class_ref)
                    .into_iter()
                    .map(move |(subject, missing_hours)| UnmetDemand {
                        class_ref,
                        subject,
                        missing_hours,
                    })
            })
            .collect();
        let violations = builder.validator().validate_all(&schedule);
        let complete = unassigned.is_empty();

        info!(
            event = "solve_end",
            complete,
            aborted = matches!(step, Step::Aborted),
            nodes = stats.nodes_explored,
            backtracks = stats.backtracks,
            propagations = stats.propagations,
            wipeouts = stats.domain_wipeouts,
            missing_hours = unassigned.iter().map(|u| u.missing_hours).sum::<u32>(),
            duration_ms = stats.elapsed.as_millis() as u64,
        );

        SolveOutcome {
            schedule,
            stats,
            complete,
            unassigned,
            unstaffed,
            violations,
        }
    }
}

fn distinct_classes(school: &School) -> Vec<ClassRef> {
    let mut seen = BTreeSet::new();
    school
        .all_classes()
        .iter()
        .copied()
        .filter(|c| seen.insert(*c))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Solved,
    Failed,
    Aborted,
}

/// Undo record for one branch: the cell filled (if any) and the
/// domains it replaced, `None` meaning the variable was not open.
#[derive(Debug, Default)]
struct Trail {
    placed: Option<CspVariable>,
    saved: Vec<(CspVariable, Option<Domain>)>,
}

/// Mutable search state. `domains` holds exactly the open variables.
struct Search<'s> {
    builder: DomainBuilder<'s>,
    config: &'s SolverConfig,
    classes: Vec<ClassRef>,
    schedule: Schedule,
    domains: BTreeMap<CspVariable, Domain>,
    stats: SolverStats,
    deadline: Option<Instant>,
    best: Schedule,
    best_open_hours: u32,
}

impl<'s> Search<'s> {
    fn new(
        builder: DomainBuilder<'s>,
        config: &'s SolverConfig,
        classes: Vec<ClassRef>,
        schedule: Schedule,
        variables: Vec<CspVariable>,
        started: Instant,
    ) -> Self {
        let domains = variables
            .into_iter()
            .map(|var| (var, builder.build(&schedule, var)))
            .collect();
        let mut search = Self {
            builder,
            config,
            classes,
            best: schedule.clone(),
            schedule,
            domains,
            stats: SolverStats::default(),
            deadline: config.time_limit.map(|limit| started + limit),
            best_open_hours: u32::MAX,
        };
        search.best_open_hours = search.open_hours();
        search
    }

    fn search(&mut self) -> Step {
        self.stats.nodes_explored += 1;
        if self.open_hours() == 0 {
            return Step::Solved;
        }
        if self.budget_exhausted() {
            debug!(
                event = "budget_exhausted",
                nodes = self.stats.nodes_explored,
                missing_hours = self.open_hours(),
            );
            self.record_best();
            return Step::Aborted;
        }

        let Some((var, domain)) = self.select() else {
            self.record_best();
            return Step::Failed;
        };

        for value in self.order_values(var, &domain) {
            if !self.builder.still_valid(&self.schedule, var, &value) {
                continue;
            }
            let (trail, consistent) = self.place(var, &value);
            match self.descend(trail, consistent, var) {
                Step::Failed => {}
                done => return done,
            }
        }

        if self.has_slack(var.class_ref) {
            let (trail, consistent) = self.skip(var);
            match self.descend(trail, consistent, var) {
                Step::Failed => {}
                done => return done,
            }
        }

        self.record_best();
        Step::Failed
    }

    /// Recurses below a placement or skip, undoing it on failure.
    fn descend(&mut self, trail: Trail, consistent: bool, var: CspVariable) -> Step {
        if !consistent {
            self.stats.domain_wipeouts += 1;
            debug!(event = "domain_wipeout", variable = %var);
            self.undo(trail);
            return Step::Failed;
        }
        match self.search() {
            Step::Failed => {
                self.undo(trail);
                self.stats.backtracks += 1;
                Step::Failed
            }
            done => done,
        }
    }

    fn budget_exhausted(&self) -> bool {
        self.config
            .max_nodes
            .is_some_and(|max| self.stats.nodes_explored > max)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Domain of an open variable as the search sees it.
    fn current_domain(&self, var: CspVariable) -> Domain {
        if self.config.propagate {
            self.domains.get(&var).cloned().unwrap_or_default()
        } else {
            self.builder.build(&self.schedule, var)
        }
    }

    fn select(&self) -> Option<(CspVariable, Domain)> {
        let mut candidates = self
            .domains
            .keys()
            .map(|&var| (var, self.current_domain(var)))
            .filter(|(_, domain)| !domain.is_empty());
        match self.config.variable_order {
            VariableOrder::Sequential => candidates.next(),
            VariableOrder::MostConstrained => candidates.min_by_key(|(_, domain)| domain.len()),
        }
    }

    fn order_values(&self, var: CspVariable, domain: &Domain) -> Vec<DomainValue> {
        let mut values = domain.values().to_vec();
        if self.config.value_order == ValueOrder::LeastConstraining {
            values.sort_by_cached_key(|value| self.constraint_score(var, value));
        }
        values
    }

    /// Higher means the value takes more away from other cells.
    fn constraint_score(&self, var: CspVariable, value: &DomainValue) -> usize {
        let mut score = 0;
        if self.schedule.taught_at(var.slot, &value.teacher).next().is_some() {
            score += 100;
        }
        score += self
            .classes
            .iter()
            .filter(|&&c| c != var.class_ref)
            .filter_map(|&c| self.domains.get(&CspVariable::new(var.slot, c)))
            .map(|d| d.count_teacher(&value.teacher))
            .sum::<usize>();
        if self
            .schedule
            .daily_count(var.class_ref, var.slot.day, &value.subject)
            > 0
        {
            score += 50;
        }
        score
    }

    /// Fills `var` and propagates. Returns the trail and whether every
    /// touched class can still meet its hours.
    fn place(&mut self, var: CspVariable, value: &DomainValue) -> (Trail, bool) {
        let mut trail = Trail {
            placed: Some(var),
            saved: vec![(var, self.domains.remove(&var))],
        };
        self.schedule
            .assign(var.slot, value.to_assignment(var.class_ref));
        if !self.config.propagate {
            return (trail, true);
        }

        self.stats.propagations += 1;
        let mut touched = BTreeSet::from([var.class_ref]);
        for neighbour in self.neighbours(var) {
            let fresh = self.builder.build(&self.schedule, neighbour);
            if self.domains.get(&neighbour) != Some(&fresh) {
                touched.insert(neighbour.class_ref);
                let previous = self.domains.insert(neighbour, fresh);
                trail.saved.push((neighbour, previous));
            }
        }
        let consistent = touched.into_iter().all(|c| self.class_feasible(c));
        (trail, consistent)
    }

    /// Closes `var` without filling it.
    fn skip(&mut self, var: CspVariable) -> (Trail, bool) {
        let trail = Trail {
            placed: None,
            saved: vec![(var, self.domains.remove(&var))],
        };
        let consistent = !self.config.propagate || self.class_feasible(var.class_ref);
        (trail, consistent)
    }

    fn undo(&mut self, trail: Trail) {
        if let Some(var) = trail.placed {
            self.schedule.remove(var.slot, var.class_ref);
        }
        for (var, previous) in trail.saved.into_iter().rev() {
            match previous {
                Some(domain) => {
                    self.domains.insert(var, domain);
                }
                None => {
                    self.domains.remove(&var);
                }
            }
        }
    }

    /// Open variables at the same slot or of the same class.
    fn neighbours(&self, var: CspVariable) -> Vec<CspVariable> {
        let same_slot = self
            .classes
            .iter()
            .filter(|&&c| c != var.class_ref)
            .map(|&c| CspVariable::new(var.slot, c))
            .filter(|v| self.domains.contains_key(v));
        let same_class = self
            .open_cells(var.class_ref)
            .map(|(&v, _)| v)
            .filter(|v| v.slot != var.slot);
        same_slot.chain(same_class).collect()
    }

    fn open_cells(&self, class_ref: ClassRef) -> impl Iterator<Item = (&CspVariable, &Domain)> {
        let first = CspVariable::new(TimeSlot::new(Day::Mon, 1), class_ref);
        self.domains
            .range(first..)
            .take_while(move |(v, _)| v.class_ref == class_ref)
    }

    fn has_slack(&self, class_ref: ClassRef) -> bool {
        let open = self.open_cells(class_ref).count() as u32;
        open > self.builder.remaining_demand(&self.schedule, class_ref)
    }

    /// Whether `class_ref` can still meet its missing hours with the
    /// cells open to it.
    ///
    /// A cell counts for a subject if its domain holds the subject now.
    /// Individualized subjects of an exchange class also count wherever
    /// the parent's cell is still open, since a later parent lesson can
    /// make them legal.
    fn class_feasible(&self, class_ref: ClassRef) -> bool {
        let demand = self.builder.open_demand(&self.schedule, class_ref);
        if demand.is_empty() {
            return true;
        }
        let rules = self.builder.validator().rules();
        let parent = rules.parent_of(class_ref);
        let reachable = |var: &CspVariable, domain: &Domain, subject: &Subject| {
            domain.contains_subject(subject)
                || (rules.is_individualized(subject)
                    && parent.is_some_and(|p| {
                        self.domains.contains_key(&CspVariable::new(var.slot, p))
                    }))
        };

        let cells: Vec<(&CspVariable, &Domain)> = self.open_cells(class_ref).collect();
        let total: u32 = demand.iter().map(|(_, hours)| hours).sum();
        let live = cells
            .iter()
            .filter(|(v, d)| demand.iter().any(|(s, _)| reachable(v, d, s)))
            .count() as u32;
        if live < total {
            return false;
        }
        demand.iter().all(|(subject, hours)| {
            cells.iter().filter(|(v, d)| reachable(v, d, subject)).count() as u32 >= *hours
        })
    }

    fn open_hours(&self) -> u32 {
        self.classes
            .iter()
            .map(|&c| self.builder.remaining_demand(&self.schedule, c))
            .sum()
    }

    fn record_best(&mut self) {
        let open = self.open_hours();
        if open < self.best_open_hours {
            self.best_open_hours = open;
            self.best = self.schedule.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::fixtures::*;
    use crate::models::{Assignment, CheckLevel, Teacher};

    fn slot(day: Day, period: u8) -> TimeSlot {
        TimeSlot::new(day, period)
    }

    fn assert_hours_met(school: &School, schedule: &Schedule) {
        for &class_ref in school.all_classes() {
            for req in school.requirements(class_ref) {
                assert_eq!(
                    schedule.placed_hours(class_ref, &req.subject),
                    req.hours,
                    "{class_ref} {}",
                    req.subject
                );
            }
        }
    }

    /// Two classes, Mon-1 and Mon-2 only: 1-2 needs T twice, which
    /// leaves no slot for 1-1's Math with T.
    fn overloaded() -> (School, Rules) {
        let (a, b) = (ClassRef::new(1, 1), ClassRef::new(1, 2));
        let school = School::new()
            .with_lesson(a, "Math", 1, "T")
            .with_lesson(a, "Art", 1, "U")
            .with_lesson(b, "Science", 2, "T");
        let mut rules = Rules::new().with_check_level(CheckLevel::Relaxed);
        for s in TimeSlot::all().filter(|s| !(s.day == Day::Mon && s.period <= 2)) {
            rules = rules.with_test_period(s);
        }
        (school, rules)
    }

    #[test]
    fn test_solves_fixture_school() {
        let (school, rules) = (school(), rules());
        let outcome = CspSolver::new(&school, &rules).solve(&Schedule::new());

        assert!(outcome.complete);
        assert!(outcome.unassigned.is_empty());
        assert!(outcome.unstaffed.is_empty());
        assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);
        assert_hours_met(&school, &outcome.schedule);
        assert!(outcome.stats.nodes_explored > 0);
        assert!(outcome.stats.propagations > 0);
    }

    #[test]
    fn test_solves_without_heuristics() {
        let (school, rules) = (school(), rules());
        let config = SolverConfig::default()
            .with_variable_order(VariableOrder::Sequential)
            .with_value_order(ValueOrder::Natural)
            .with_propagation(false);
        let outcome = CspSolver::new(&school, &rules)
            .with_config(config)
            .solve(&Schedule::new());

        assert!(outcome.complete);
        assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);
        assert_eq!(outcome.stats.propagations, 0);
        assert_hours_met(&school, &outcome.schedule);
    }

    #[test]
    fn test_locked_cells_and_test_periods_untouched() {
        let school = school();
        let rules = rules().with_test_period(slot(Day::Wed, 6));
        let mut initial = Schedule::new();
        for &class_ref in school.all_classes() {
            initial
                .place_locked(slot(Day::Fri, 6), Assignment::untaught(class_ref, "Homeroom"))
                .unwrap();
        }
        initial.lock(slot(Day::Mon, 1), C11);

        let outcome = CspSolver::new(&school, &rules).solve(&initial);
        assert!(outcome.complete);
        for (s, class_ref) in initial.locked_cells() {
            assert_eq!(outcome.schedule.get(s, class_ref), initial.get(s, class_ref));
            assert!(outcome.schedule.is_locked(s, class_ref));
        }
        assert_eq!(outcome.schedule.at_slot(slot(Day::Wed, 6)).count(), 0);
        // Input is left as it was.
        assert_eq!(initial.assignment_count(), school.all_classes().len());
    }

    #[test]
    fn test_pre_placed_lessons_count_towards_hours() {
        let c = ClassRef::new(1, 1);
        let school = School::new().with_lesson(c, "Math", 2, "T");
        let rules = Rules::new().with_core_subjects(["Math"]);
        let mut initial = Schedule::new();
        initial.assign(slot(Day::Tue, 3), Assignment::new(c, "Math", "T"));

        let outcome = CspSolver::new(&school, &rules).solve(&initial);
        assert!(outcome.complete);
        assert_eq!(outcome.schedule.assignment_count(), 2);
        assert!(outcome.schedule.get(slot(Day::Tue, 3), c).is_some());
    }

    #[test]
    fn test_infeasible_returns_best_partial() {
        let (school, rules) = overloaded();
        let outcome = CspSolver::new(&school, &rules).solve(&Schedule::new());

        assert!(!outcome.complete);
        assert!(outcome.stats.domain_wipeouts >= 1);
        assert!(outcome.stats.backtracks >= 1);
        assert_eq!(outcome.schedule.assignment_count(), 2);
        let missing: u32 = outcome.unassigned.iter().map(|u| u.missing_hours).sum();
        assert_eq!(missing, 2);
        assert!(outcome.violations.is_empty());
    }

    #[test]
    fn test_exchange_pair_shares_facility_slot() {
        // Mon-1 is the only open slot: both classes need PE there.
        let school = School::new()
            .with_lesson(C11, "PE", 1, "Sato")
            .with_lesson(C16, "PE", 1, "Aoki");
        let mut rules = Rules::new()
            .with_facility_subjects(["PE"])
            .with_exchange_pair(C16, C11);
        for s in TimeSlot::all().filter(|&s| s != slot(Day::Mon, 1)) {
            rules = rules.with_test_period(s);
        }

        let outcome = CspSolver::new(&school, &rules).solve(&Schedule::new());
        assert!(outcome.complete, "{:?}", outcome.unassigned);
        assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);
        assert_eq!(outcome.schedule.at_slot(slot(Day::Mon, 1)).count(), 2);
    }

    #[test]
    fn test_time_limit_stops_search() {
        let (school, rules) = overloaded();
        let config = SolverConfig::default().with_time_limit(Duration::ZERO);
        let outcome = CspSolver::new(&school, &rules)
            .with_config(config)
            .solve(&Schedule::new());

        assert!(!outcome.complete);
        assert_eq!(outcome.stats.nodes_explored, 1);
        assert_eq!(outcome.schedule.assignment_count(), 0);
    }

    #[test]
    fn test_node_budget_stops_search() {
        let (school, rules) = overloaded();
        let config = SolverConfig::default().with_max_nodes(1);
        let outcome = CspSolver::new(&school, &rules)
            .with_config(config)
            .solve(&Schedule::new());

        assert!(!outcome.complete);
        assert_eq!(outcome.stats.nodes_explored, 2);
        assert_eq!(outcome.schedule.assignment_count(), 1);
    }

    #[test]
    fn test_unstaffed_subject_reported_not_searched() {
        let c = ClassRef::new(2, 1);
        let school = School::new()
            .with_lesson(c, "Math", 2, "T")
            .with_requirement(c, "Music", 2);
        let rules = Rules::new().with_core_subjects(["Math"]);
        let outcome = CspSolver::new(&school, &rules).solve(&Schedule::new());

        assert!(outcome.complete);
        assert_eq!(outcome.unstaffed, vec![(c, Subject::new("Music"))]);
        assert_eq!(outcome.schedule.assignment_count(), 2);
    }

    #[test]
    fn test_undo_restores_schedule_and_domains() {
        let (school, rules) = (school(), rules());
        let builder = DomainBuilder::new(&school, &rules);
        let config = SolverConfig::default();
        let solver = CspSolver::new(&school, &rules);
        let initial = Schedule::new();
        let mut search = Search::new(
            builder,
            &config,
            distinct_classes(&school),
            initial.clone(),
            solver.variables(&initial),
            Instant::now(),
        );

        let schedule_before = search.schedule.clone();
        let domains_before = search.domains.clone();

        let var = CspVariable::new(slot(Day::Mon, 1), C11);
        let (trail, consistent) = search.place(var, &DomainValue::new("Math", "Tanaka"));
        assert!(consistent);
        assert_ne!(search.domains, domains_before);
        // Tanaka is gone from 1-2's Mon-1 domain.
        let b = &search.domains[&CspVariable::new(slot(Day::Mon, 1), C12)];
        assert!(!b.contains_teacher(&Teacher::new("Tanaka")));
        search.undo(trail);
        assert_eq!(search.schedule, schedule_before);
        assert_eq!(search.domains, domains_before);

        let (trail, _) = search.skip(CspVariable::new(slot(Day::Tue, 2), C25));
        search.undo(trail);
        assert_eq!(search.domains, domains_before);
    }

    #[test]
    fn test_lcv_prefers_free_teacher() {
        let (school, rules) = (school(), rules());
        let config = SolverConfig::default();
        let solver = CspSolver::new(&school, &rules);
        let initial = Schedule::new();
        let search = Search::new(
            DomainBuilder::new(&school, &rules),
            &config,
            distinct_classes(&school),
            initial.clone(),
            solver.variables(&initial),
            Instant::now(),
        );

        // Sato is wanted by three other classes at Mon-3, Ito by none.
        let var = CspVariable::new(slot(Day::Mon, 3), C11);
        let english = DomainValue::new("English", "Ito");
        let pe = DomainValue::new("PE", "Sato");
        assert_eq!(search.constraint_score(var, &english), 0);
        assert_eq!(search.constraint_score(var, &pe), 3);
        let ordered = search.order_values(var, &Domain::from_values([pe.clone(), english.clone()]));
        assert_eq!(ordered, vec![english, pe]);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"variable_order": "sequential", "max_nodes": 500}"#).unwrap();
        assert_eq!(config.variable_order, VariableOrder::Sequential);
        assert_eq!(config.value_order, ValueOrder::LeastConstraining);
        assert!(config.propagate);
        assert_eq!(config.max_nodes, Some(500));
        assert_eq!(config.time_limit, None);
    }
}
