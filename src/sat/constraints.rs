//! Clause generation for planning as satisfiability

use super::VariableIndexer;
use crate::problem::{ActionId, FluentId, PlanningProblem};
use itertools::Itertools;

/// Represents a SAT clause (disjunction of literals)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub literals: Vec<i32>, // Positive for variable, negative for negation
}

impl Clause {
    /// Create a new clause from literals
    pub fn new(literals: Vec<i32>) -> Self {
        Self { literals }
    }

    /// Create a unit clause (single literal)
    pub fn unit(literal: i32) -> Self {
        Self { literals: vec![literal] }
    }

    /// Create a binary clause (two literals)
    pub fn binary(lit1: i32, lit2: i32) -> Self {
        Self { literals: vec![lit1, lit2] }
    }

    /// Check if clause is empty (unsatisfiable)
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Check if clause is unit
    pub fn is_unit(&self) -> bool {
        self.literals.len() == 1
    }

    /// Whether some literal is true under the model (`model[v - 1]` is the signed value of `v`)
    pub fn is_satisfied_by(&self, model: &[i32]) -> bool {
        self.literals.iter().any(|&lit| {
            (lit.unsigned_abs() as usize)
                .checked_sub(1)
                .and_then(|index| model.get(index))
                .is_some_and(|&value| (value > 0) == (lit > 0))
        })
    }
}

/// Ordered clauses of one horizon attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseSet {
    clauses: Vec<Clause>,
}

impl ClauseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) {
        debug_assert!(!clause.is_empty(), "encoder produced an empty clause");
        self.clauses.push(clause);
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Clause> {
        self.clauses.iter()
    }

    pub fn as_slice(&self) -> &[Clause] {
        &self.clauses
    }

    /// Largest variable id mentioned by any clause
    pub fn max_variable(&self) -> usize {
        self.clauses
            .iter()
            .flat_map(|c| c.literals.iter())
            .map(|lit| lit.unsigned_abs() as usize)
            .max()
            .unwrap_or(0)
    }

    /// Whether every clause is satisfied by the model
    pub fn is_satisfied_by(&self, model: &[i32]) -> bool {
        self.clauses.iter().all(|c| c.is_satisfied_by(model))
    }
}

impl From<Vec<Clause>> for ClauseSet {
    fn from(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }
}

impl<'a> IntoIterator for &'a ClauseSet {
    type Item = &'a Clause;
    type IntoIter = std::slice::Iter<'a, Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.iter()
    }
}

/// Number of clauses emitted per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClauseBreakdown {
    pub initial_state: usize,
    pub goal: usize,
    pub action_implications: usize,
    pub frame_axioms: usize,
    pub mutual_exclusion: usize,
}

impl ClauseBreakdown {
    pub fn total(&self) -> usize {
        self.initial_state + self.goal + self.action_implications + self.frame_axioms + self.mutual_exclusion
    }
}

impl std::fmt::Display for ClauseBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Clause Breakdown:")?;
        writeln!(f, "  Initial state: {}", self.initial_state)?;
        writeln!(f, "  Goal: {}", self.goal)?;
        writeln!(f, "  Action implications: {}", self.action_implications)?;
        writeln!(f, "  Frame axioms: {}", self.frame_axioms)?;
        writeln!(f, "  Mutual exclusion: {}", self.mutual_exclusion)?;
        writeln!(f, "  Total: {}", self.total())?;
        Ok(())
    }
}

/// Generates the clause set of one horizon attempt
pub struct ClauseEncoder<'a> {
    problem: &'a PlanningProblem,
    indexer: VariableIndexer,
    clauses: ClauseSet,
    breakdown: ClauseBreakdown,
}

impl<'a> ClauseEncoder<'a> {
    /// Create a new clause encoder
    pub fn new(problem: &'a PlanningProblem, indexer: VariableIndexer) -> Self {
        debug_assert_eq!(problem.fluent_count(), indexer.fluent_count());
        debug_assert_eq!(problem.action_count(), indexer.action_count());

        Self {
            problem,
            indexer,
            clauses: ClauseSet::new(),
            breakdown: ClauseBreakdown::default(),
        }
    }

    /// Generate all clauses, consuming the encoder
    pub fn encode(mut self) -> (ClauseSet, ClauseBreakdown) {
        // 1. Initial state is fully specified at step 0
        self.breakdown.initial_state = self.generate_initial_state_constraints();

        // 2. Goal literals at the final step
        self.breakdown.goal = self.generate_goal_constraints();

        // 3. Actions imply their precondition now and their effect next step
        self.breakdown.action_implications = self.generate_action_constraints();

        // 4. Explanatory frame axioms
        self.breakdown.frame_axioms = self.generate_frame_axioms();

        // 5. At most one action per step
        self.breakdown.mutual_exclusion = self.generate_mutual_exclusion_constraints();

        debug_assert_eq!(self.breakdown.total(), self.clauses.len());
        (self.clauses, self.breakdown)
    }

    fn emit(&mut self, clause: Clause) -> usize {
        self.clauses.push(clause);
        1
    }

    fn generate_initial_state_constraints(&mut self) -> usize {
        let problem = self.problem;
        let initial = problem.initial_state();
        let mut count = 0;

        for fluent in problem.fluent_ids() {
            let var = self.indexer.fluent_variable(fluent, 0);
            let literal = if initial.holds(fluent) { var } else { -var };
            count += self.emit(Clause::unit(literal));
        }

        count
    }

    fn generate_goal_constraints(&mut self) -> usize {
        let problem = self.problem;
        let final_step = self.indexer.horizon();
        let mut count = 0;

        for literal in problem.goal().literals() {
            count += self.emit(Clause::unit(self.indexer.literal(literal, final_step)));
        }

        count
    }

    /// `¬a(s) ∨ p(s)` per precondition literal and `¬a(s) ∨ e(s+1)` per effect literal.
    ///
    /// Each fluent is looked up once per action; the literals an action mentions
    /// are collected before the step loop so every step reuses them.
    fn generate_action_constraints(&mut self) -> usize {
        let problem = self.problem;
        let mut count = 0;

        for action in problem.actions() {
            let mut components = Vec::with_capacity(action.precondition.len() + action.effect.len());
            for fluent in problem.fluent_ids() {
                if let Some(p) = action.precondition.literal_for(fluent) {
                    components.push((p, 0));
                }
                if let Some(e) = action.effect.literal_for(fluent) {
                    components.push((e, 1));
                }
            }

            for step in 0..self.indexer.horizon() {
                let fired = self.indexer.action_variable(action.id, step);
                for &(literal, offset) in &components {
                    let component = self.indexer.literal(literal, step + offset);
                    count += self.emit(Clause::binary(-fired, component));
                }
            }
        }

        count
    }

    /// `f(s) ∨ ¬f(s+1) ∨ ⋁adders(s)` and `¬f(s) ∨ f(s+1) ∨ ⋁deleters(s)`
    fn generate_frame_axioms(&mut self) -> usize {
        let problem = self.problem;
        let (adders, deleters) = self.effect_index();
        let mut count = 0;

        for fluent in problem.fluent_ids() {
            for step in 0..self.indexer.horizon() {
                let now = self.indexer.fluent_variable(fluent, step);
                let next = self.indexer.fluent_variable(fluent, step + 1);

                let mut becomes_true = vec![now, -next];
                becomes_true.extend(adders[fluent.index()].iter().map(|&a| self.indexer.action_variable(a, step)));
                count += self.emit(Clause::new(becomes_true));

                let mut becomes_false = vec![-now, next];
                becomes_false.extend(deleters[fluent.index()].iter().map(|&a| self.indexer.action_variable(a, step)));
                count += self.emit(Clause::new(becomes_false));
            }
        }

        count
    }

    /// Per fluent, the actions adding it and the actions deleting it, in action order
    fn effect_index(&self) -> (Vec<Vec<ActionId>>, Vec<Vec<ActionId>>) {
        let mut adders = vec![Vec::new(); self.problem.fluent_count()];
        let mut deleters = vec![Vec::new(); self.problem.fluent_count()];

        for action in self.problem.actions() {
            for FluentId(f) in action.effect.positive.iter() {
                adders[f].push(action.id);
            }
            for FluentId(f) in action.effect.negative.iter() {
                deleters[f].push(action.id);
            }
        }

        (adders, deleters)
    }

    fn generate_mutual_exclusion_constraints(&mut self) -> usize {
        let mut count = 0;

        for step in 0..self.indexer.horizon() {
            let pairs: Vec<(i32, i32)> = self.indexer.action_variables_at(step).tuple_combinations().collect();
            for (a, b) in pairs {
                count += self.emit(Clause::binary(-a, -b));
            }
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::model::{delivery_problem, switch_problem};

    fn encode(problem: &PlanningProblem, horizon: usize) -> (VariableIndexer, ClauseSet, ClauseBreakdown) {
        let vi = VariableIndexer::new(problem.fluent_count(), problem.action_count(), horizon);
        let (clauses, breakdown) = ClauseEncoder::new(problem, vi).encode();
        (vi, clauses, breakdown)
    }

    fn literals(clauses: &ClauseSet) -> Vec<Vec<i32>> {
        clauses.iter().map(|c| c.literals.clone()).collect()
    }

    #[test]
    fn test_clause_creation() {
        let clause = Clause::new(vec![1, -2, 3]);
        assert_eq!(clause.literals, vec![1, -2, 3]);
        assert!(!clause.is_empty());
        assert!(!clause.is_unit());

        let unit_clause = Clause::unit(5);
        assert!(unit_clause.is_unit());
        assert_eq!(unit_clause.literals, vec![5]);
    }

    #[test]
    fn test_clause_satisfaction() {
        let model = [1, -2, 3];
        assert!(Clause::new(vec![-1, -2]).is_satisfied_by(&model));
        assert!(!Clause::new(vec![-1, 2]).is_satisfied_by(&model));
        assert!(!Clause::unit(4).is_satisfied_by(&model));
        // 0 is the terminator, never a variable
        assert!(!Clause::new(vec![0]).is_satisfied_by(&model));
        assert!(Clause::new(vec![0, 3]).is_satisfied_by(&model));
    }

    #[test]
    fn test_switch_clause_set() {
        // Variables: on@0=1 switch-on@0=2 on@1=3 switch-on@1=4 on@2=5
        let (_, clauses, breakdown) = encode(&switch_problem(), 2);

        assert_eq!(
            literals(&clauses),
            vec![
                vec![-1],
                vec![5],
                vec![-2, 3],
                vec![-4, 5],
                vec![1, -3, 2],
                vec![-1, 3],
                vec![3, -5, 4],
                vec![-3, 5],
            ]
        );
        assert_eq!(breakdown.mutual_exclusion, 0);
        assert_eq!(breakdown.total(), 8);
    }

    #[test]
    fn test_switch_plan_model_satisfies_clauses() {
        let (_, clauses, _) = encode(&switch_problem(), 2);

        let plan_at_step_zero = [-1, 2, 3, -4, 5];
        assert!(clauses.is_satisfied_by(&plan_at_step_zero));

        // Without any action the fluent may not change
        let unjustified = [-1, -2, 3, -4, 5];
        assert!(!clauses.is_satisfied_by(&unjustified));
    }

    #[test]
    fn test_initial_state_covers_every_fluent() {
        let problem = delivery_problem();
        let (vi, clauses, breakdown) = encode(&problem, 3);
        assert_eq!(breakdown.initial_state, problem.fluent_count());

        for fluent in problem.fluent_ids() {
            let var = vi.fluent_variable(fluent, 0);
            let expected = if problem.initial_state().holds(fluent) { var } else { -var };
            assert!(clauses.iter().any(|c| c.literals == vec![expected]));
        }
    }

    #[test]
    fn test_action_implications() {
        let problem = delivery_problem();
        let (vi, clauses, breakdown) = encode(&problem, 3);

        // 10 precondition + 12 effect literals per step
        assert_eq!(breakdown.action_implications, 22 * 3);

        let load = problem.action_by_name("load-a").unwrap();
        let fired = vi.action_variable(load.id, 1);
        let pkg_at_a = problem.fluent_id("pkg-at-a").unwrap();
        let pkg_in_truck = problem.fluent_id("pkg-in-truck").unwrap();

        let ls = literals(&clauses);
        assert!(ls.contains(&vec![-fired, vi.fluent_variable(pkg_at_a, 1)]));
        assert!(ls.contains(&vec![-fired, -vi.fluent_variable(pkg_at_a, 2)]));
        assert!(ls.contains(&vec![-fired, vi.fluent_variable(pkg_in_truck, 2)]));
    }

    #[test]
    fn test_frame_axioms_list_justifying_actions() {
        let problem = delivery_problem();
        let (vi, clauses, breakdown) = encode(&problem, 2);
        assert_eq!(breakdown.frame_axioms, 2 * problem.fluent_count() * 2);

        let pkg_in_truck = problem.fluent_id("pkg-in-truck").unwrap();
        let load_a = problem.action_by_name("load-a").unwrap().id;
        let load_b = problem.action_by_name("load-b").unwrap().id;
        let unload_a = problem.action_by_name("unload-a").unwrap().id;
        let unload_b = problem.action_by_name("unload-b").unwrap().id;

        let now = vi.fluent_variable(pkg_in_truck, 1);
        let next = vi.fluent_variable(pkg_in_truck, 2);
        let ls = literals(&clauses);
        assert!(ls.contains(&vec![now, -next, vi.action_variable(load_a, 1), vi.action_variable(load_b, 1)]));
        assert!(ls.contains(&vec![-now, next, vi.action_variable(unload_a, 1), vi.action_variable(unload_b, 1)]));
    }

    #[test]
    fn test_mutual_exclusion_is_pairwise_per_step() {
        let problem = delivery_problem();
        let (vi, clauses, breakdown) = encode(&problem, 3);
        let a = problem.action_count();
        assert_eq!(breakdown.mutual_exclusion, 3 * a * (a - 1) / 2);

        let first = vi.action_variable(ActionId(0), 2);
        let last = vi.action_variable(ActionId(a - 1), 2);
        assert!(literals(&clauses).contains(&vec![-first, -last]));

        // No exclusion across steps
        let other_step = vi.action_variable(ActionId(1), 1);
        assert!(!literals(&clauses).contains(&vec![-first, -other_step]));
    }

    #[test]
    fn test_clause_set_mentions_every_variable() {
        let problem = delivery_problem();
        let (vi, clauses, _) = encode(&problem, 4);
        assert_eq!(clauses.max_variable(), vi.variable_count());
        assert!(clauses.iter().all(|c| !c.is_empty()));
    }
}
