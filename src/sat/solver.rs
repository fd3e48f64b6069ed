//! SAT solver integration using CaDiCaL

use super::dimacs::{parse_dimacs, ParsedInstance};
use crate::error::{PlannerError, PlannerResult};
use cadical::{Solver, Timeout};
use std::time::{Duration, Instant};

/// Satisfying assignment returned by the solver.
///
/// `literals()[v - 1]` is `v` when variable `v` is true and `-v` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    literals: Vec<i32>,
}

impl Model {
    pub fn new(literals: Vec<i32>) -> Self {
        debug_assert!(literals
            .iter()
            .enumerate()
            .all(|(i, &lit)| lit.unsigned_abs() as usize == i + 1));
        Self { literals }
    }

    /// Build a model from one truth value per variable, starting at variable 1
    pub fn from_values(values: &[bool]) -> Self {
        let literals = values
            .iter()
            .enumerate()
            .map(|(i, &v)| if v { i as i32 + 1 } else { -(i as i32 + 1) })
            .collect();
        Self { literals }
    }

    /// Truth value of a variable; variables outside the model read as false
    pub fn value(&self, var: i32) -> bool {
        let index = var.unsigned_abs() as usize;
        index > 0 && self.literals.get(index - 1).is_some_and(|&lit| lit > 0)
    }

    pub fn literals(&self) -> &[i32] {
        &self.literals
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

/// Result of SAT solving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Unsatisfiable,
    /// Unsatisfiability was evident while reading the instance
    TrivialContradiction,
    Satisfiable(Model),
}

impl SatResult {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, SatResult::Satisfiable(_))
    }

    pub fn result_type(&self) -> SolverResultType {
        match self {
            SatResult::Unsatisfiable => SolverResultType::Unsatisfiable,
            SatResult::TrivialContradiction => SolverResultType::TrivialContradiction,
            SatResult::Satisfiable(_) => SolverResultType::Satisfiable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverResultType {
    Satisfiable,
    Unsatisfiable,
    TrivialContradiction,
}

/// Statistics about the last solving call
#[derive(Debug, Clone)]
pub struct SolverStatistics {
    pub variable_count: usize,
    pub clause_count: usize,
    pub solve_time: Duration,
    pub result: Option<SolverResultType>,
    /// Re-solves spent turning preferred variables false
    pub minimization_calls: usize,
}

/// Solver adapter: DIMACS text in, [`SatResult`] out.
///
/// Each call to [`solve`](Self::solve) runs a fresh CaDiCaL instance; nothing
/// is carried over between calls.
pub struct SolverAdapter {
    timeout: Option<Duration>,
    /// Variables to turn false after a satisfying answer, in visiting order
    minimized: Vec<i32>,
    statistics: SolverStatistics,
}

impl SolverAdapter {
    /// Create a solver adapter without a time budget
    pub fn new() -> Self {
        Self {
            timeout: None,
            minimized: Vec::new(),
            statistics: SolverStatistics {
                variable_count: 0,
                clause_count: 0,
                solve_time: Duration::ZERO,
                result: None,
                minimization_calls: 0,
            },
        }
    }

    /// Create a solver adapter that gives up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut adapter = Self::new();
        adapter.set_timeout(timeout);
        adapter
    }

    /// Set solving timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Prefer these variables false in the returned model.
    ///
    /// They are visited in order; each one still true is re-solved false
    /// with every earlier decision kept as an assumption.
    pub fn set_minimized(&mut self, variables: Vec<i32>) {
        self.minimized = variables;
    }

    /// Parse DIMACS text into an instance
    pub fn parse(&self, cnf_text: &str) -> PlannerResult<ParsedInstance> {
        parse_dimacs(cnf_text)
    }

    /// Parse and solve DIMACS text
    pub fn solve_text(&mut self, cnf_text: &str) -> PlannerResult<SatResult> {
        let instance = self.parse(cnf_text)?;
        self.solve(&instance)
    }

    /// Decide satisfiability of a parsed instance
    pub fn solve(&mut self, instance: &ParsedInstance) -> PlannerResult<SatResult> {
        let start_time = Instant::now();
        self.statistics.variable_count = instance.variable_count;
        self.statistics.clause_count = instance.clause_count();
        self.statistics.result = None;

        if instance.trivially_unsat {
            self.statistics.solve_time = start_time.elapsed();
            self.statistics.result = Some(SolverResultType::TrivialContradiction);
            return Ok(SatResult::TrivialContradiction);
        }

        let mut solver: Solver = Solver::new();
        if let Some(budget) = self.timeout {
            if budget.is_zero() {
                return Err(PlannerError::Timeout { budget });
            }
            solver.set_callbacks(Some(Timeout::new(budget.as_secs_f32())));
        }

        let mut max_variable = 0;
        for clause in &instance.clauses {
            for &lit in clause {
                max_variable = max_variable.max(lit.unsigned_abs() as usize);
            }
            solver.add_clause(clause.iter().copied());
        }

        let outcome = solver.solve();

        let result = match outcome {
            Some(true) => {
                let mut values = read_values(&solver, instance.variable_count, max_variable);
                self.minimize(&mut solver, &mut values, max_variable);
                SatResult::Satisfiable(Model::from_values(&values))
            }
            Some(false) => SatResult::Unsatisfiable,
            None => {
                self.statistics.solve_time = start_time.elapsed();
                return Err(PlannerError::Timeout {
                    budget: self.timeout.unwrap_or_default(),
                });
            }
        };

        self.statistics.solve_time = start_time.elapsed();
        self.statistics.result = Some(result.result_type());
        Ok(result)
    }

    /// Greedily flip the preferred variables to false.
    ///
    /// `values` always satisfies the instance together with `decided`.
    fn minimize(&mut self, solver: &mut Solver, values: &mut Vec<bool>, max_variable: usize) {
        let mut decided: Vec<i32> = Vec::with_capacity(self.minimized.len());
        self.statistics.minimization_calls = 0;

        for &var in &self.minimized {
            let index = var.unsigned_abs() as usize;
            // Variables in no clause already read false
            if index == 0 || index > max_variable {
                continue;
            }
            let var = index as i32;
            if !values[index - 1] {
                decided.push(-var);
                continue;
            }

            self.statistics.minimization_calls += 1;
            let assumptions = decided.iter().copied().chain(std::iter::once(-var));
            match solver.solve_with(assumptions) {
                Some(true) => {
                    *values = read_values(solver, values.len(), max_variable);
                    decided.push(-var);
                }
                Some(false) => decided.push(var),
                None => {
                    tracing::debug!(variable = var, "budget spent while minimizing, keeping last model");
                    break;
                }
            }
        }
    }

    /// Get statistics of the last solving call
    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }
}

/// Truth values of variables `1..=variable_count`; unmentioned ones read false
fn read_values(solver: &Solver, variable_count: usize, max_variable: usize) -> Vec<bool> {
    (1..=variable_count)
        .map(|var| var <= max_variable && solver.value(var as i32) == Some(true))
        .collect()
}

impl Default for SolverAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SolverStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SAT Solver Statistics:")?;
        writeln!(f, "  Variables: {}", self.variable_count)?;
        writeln!(f, "  Clauses: {}", self.clause_count)?;
        writeln!(f, "  Solve time: {:.3}s", self.solve_time.as_secs_f64())?;
        match self.result {
            Some(result) => writeln!(f, "  Result: {:?}", result)?,
            None => writeln!(f, "  Result: -")?,
        }
        writeln!(f, "  Minimization calls: {}", self.minimization_calls)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_satisfiable() {
        let mut solver = SolverAdapter::new();

        // (x1 ∨ x2) ∧ (¬x1 ∨ x2)
        let result = solver.solve_text("p cnf 2 2\n1 2 0\n-1 2 0\n").unwrap();
        match result {
            SatResult::Satisfiable(model) => {
                assert_eq!(model.len(), 2);
                assert!(model.value(2));
            }
            other => panic!("expected satisfiable, got {:?}", other),
        }
        assert_eq!(solver.statistics().result, Some(SolverResultType::Satisfiable));
    }

    #[test]
    fn test_unsatisfiable() {
        let mut solver = SolverAdapter::new();

        // Every combination of x1, x2 is excluded
        let text = "p cnf 2 4\n1 2 0\n1 -2 0\n-1 2 0\n-1 -2 0\n";
        assert_eq!(solver.solve_text(text).unwrap(), SatResult::Unsatisfiable);
    }

    #[test]
    fn test_trivial_contradiction_skips_solver() {
        let mut solver = SolverAdapter::new();
        let result = solver.solve_text("p cnf 1 2\n1 0\n-1 0\n").unwrap();
        assert_eq!(result, SatResult::TrivialContradiction);
        assert_eq!(solver.statistics().result, Some(SolverResultType::TrivialContradiction));
    }

    #[test]
    fn test_unmentioned_variables_read_false() {
        let mut solver = SolverAdapter::new();
        match solver.solve_text("p cnf 4 1\n2 0\n").unwrap() {
            SatResult::Satisfiable(model) => {
                assert_eq!(model.len(), 4);
                assert!(model.value(2));
                assert!(!model.value(4));
                assert_eq!(model.literals()[3], -4);
            }
            other => panic!("expected satisfiable, got {:?}", other),
        }
    }

    #[test]
    fn test_format_error_is_fatal() {
        let mut solver = SolverAdapter::new();
        assert!(matches!(solver.solve_text("1 2 0\n"), Err(PlannerError::Format { .. })));
    }

    #[test]
    fn test_spent_budget_times_out() {
        let mut solver = SolverAdapter::with_timeout(Duration::ZERO);
        assert!(matches!(
            solver.solve_text("p cnf 1 1\n1 0\n"),
            Err(PlannerError::Timeout { .. })
        ));
    }

    #[test]
    fn test_minimized_variables_turn_false() {
        // x1 or x2, with x2 visited first: only x1 stays true
        let mut solver = SolverAdapter::new();
        solver.set_minimized(vec![2, 1]);
        match solver.solve_text("p cnf 2 1\n1 2 0\n").unwrap() {
            SatResult::Satisfiable(model) => assert_eq!(model.literals(), &[1, -2]),
            other => panic!("expected satisfiable, got {:?}", other),
        }

        solver.set_minimized(vec![1, 2]);
        match solver.solve_text("p cnf 2 1\n1 2 0\n").unwrap() {
            SatResult::Satisfiable(model) => assert_eq!(model.literals(), &[-1, 2]),
            other => panic!("expected satisfiable, got {:?}", other),
        }
    }

    #[test]
    fn test_minimization_keeps_forced_variables() {
        let mut solver = SolverAdapter::new();
        solver.set_minimized(vec![1, 2, 3]);
        match solver.solve_text("p cnf 3 2\n1 0\n-1 2 0\n").unwrap() {
            SatResult::Satisfiable(model) => assert_eq!(model.literals(), &[1, 2, -3]),
            other => panic!("expected satisfiable, got {:?}", other),
        }
    }

    #[test]
    fn test_model_from_values() {
        let model = Model::from_values(&[false, true, true]);
        assert_eq!(model.literals(), &[-1, 2, 3]);
        assert!(!model.value(1));
        assert!(model.value(-3));
        assert!(!model.value(0));
        assert!(!model.value(9));
    }
}
