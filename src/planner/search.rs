//! Horizon search: encode, solve and decode at increasing horizons

use super::{PlanValidator, Solution};
use crate::config::Settings;
use crate::error::{PlannerError, PlannerResult};
use crate::problem::PlanningProblem;
use crate::sat::{ModelDecoder, Plan, SatEncoder, SatResult, SolverAdapter, StateTrace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Parameters of one search
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub min_horizon: usize,
    pub max_horizon: usize,
    /// Budget for the whole search
    pub timeout: Duration,
    /// Horizons evaluated together; 1 is strictly sequential
    pub parallel_horizons: usize,
    /// Where to keep each attempt's CNF text, if anywhere
    pub cnf_directory: Option<PathBuf>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_horizon: 2,
            max_horizon: 30,
            timeout: Duration::from_secs(1000),
            parallel_horizons: 1,
            cnf_directory: None,
        }
    }
}

impl SearchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_horizon: settings.search.min_horizon,
            max_horizon: settings.search.max_horizon,
            timeout: Duration::from_secs(settings.solver.timeout_seconds),
            parallel_horizons: settings.search.parallel_horizons,
            cnf_directory: settings
                .output
                .save_cnf
                .then(|| settings.output.output_directory.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptVerdict {
    Satisfiable,
    Unsatisfiable,
    TrivialContradiction,
}

/// What happened at one horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    pub horizon: usize,
    pub variables: usize,
    pub clauses: usize,
    pub verdict: AttemptVerdict,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Searching(usize),
    Found(usize),
    Exhausted,
}

/// Terminal result of a search that did not fail
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Found(Solution),
    /// No horizon up to the maximum admits a plan
    Exhausted { attempts: Vec<AttemptReport> },
}

impl SearchOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SearchOutcome::Found(solution) => Some(solution),
            SearchOutcome::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> &[AttemptReport] {
        match self {
            SearchOutcome::Found(solution) => &solution.attempts,
            SearchOutcome::Exhausted { attempts } => attempts,
        }
    }
}

struct Attempt {
    report: AttemptReport,
    found: Option<(StateTrace, Plan)>,
}

/// Drives the attempts for one problem
pub struct HorizonSearch<'a> {
    problem: &'a PlanningProblem,
    options: SearchOptions,
    state: SearchState,
}

impl<'a> HorizonSearch<'a> {
    pub fn new(problem: &'a PlanningProblem, options: SearchOptions) -> Self {
        let state = SearchState::Searching(options.min_horizon.max(1));
        Self {
            problem,
            options,
            state,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Search from the minimum horizon upwards and stop at the first plan.
    ///
    /// Unsatisfiable horizons are skipped; format, timeout, I/O and
    /// validation failures abort the search.
    pub fn run(&mut self) -> PlannerResult<SearchOutcome> {
        let start_time = Instant::now();
        let batch = self.options.parallel_horizons.max(1);
        let max_horizon = self.options.max_horizon;
        let mut horizon = self.options.min_horizon.max(1);
        let mut attempts = Vec::new();

        info!(
            problem = self.problem.name(),
            min_horizon = horizon,
            max_horizon,
            parallel = batch,
            "starting horizon search"
        );

        while horizon <= max_horizon {
            self.state = SearchState::Searching(horizon);
            let last = (horizon + batch - 1).min(max_horizon);
            let budget = self.remaining_budget(start_time)?;

            let this = &*self;
            let results: Vec<PlannerResult<Attempt>> = if batch == 1 {
                vec![this.attempt(horizon, budget)]
            } else {
                (horizon..=last)
                    .into_par_iter()
                    .map(|h| this.attempt(h, budget))
                    .collect()
            };

            // Scan in horizon order so the smallest satisfiable horizon wins
            for result in results {
                let attempt = result?;
                let found_at = attempt.report.horizon;
                attempts.push(attempt.report);

                if let Some((trace, plan)) = attempt.found {
                    self.state = SearchState::Found(found_at);
                    info!(horizon = found_at, actions = plan.len(), "plan found");
                    let solution = Solution::new(self.problem, found_at, plan, &trace, attempts, start_time.elapsed());
                    return Ok(SearchOutcome::Found(solution));
                }
            }

            horizon = last + 1;
        }

        self.state = SearchState::Exhausted;
        info!(max_horizon, attempts = attempts.len(), "no plan found");
        Ok(SearchOutcome::Exhausted { attempts })
    }

    fn remaining_budget(&self, start_time: Instant) -> PlannerResult<Duration> {
        let remaining = self.options.timeout.saturating_sub(start_time.elapsed());
        if remaining.is_zero() {
            return Err(PlannerError::Timeout {
                budget: self.options.timeout,
            });
        }
        Ok(remaining)
    }

    /// One attempt; the encoding and solver live only inside this call
    fn attempt(&self, horizon: usize, budget: Duration) -> PlannerResult<Attempt> {
        let started = Instant::now();
        info!(horizon, "attempting horizon");

        let encoding = SatEncoder::new(self.problem).encode(horizon);
        let cnf_text = encoding.instance.to_dimacs();

        if let Some(directory) = &self.options.cnf_directory {
            save_cnf(directory, horizon, &cnf_text)?;
        }

        // Latest steps are turned off first so surviving actions fire early
        let mut solver = SolverAdapter::with_timeout(budget);
        solver.set_minimized(
            (0..horizon)
                .rev()
                .flat_map(|step| encoding.indexer.action_variables_at(step))
                .collect(),
        );
        let result = solver.solve_text(&cnf_text)?;
        debug!(horizon, "{}", solver.statistics());

        let (verdict, found) = match result {
            SatResult::Satisfiable(model) => {
                let (trace, plan) = ModelDecoder::new(self.problem, encoding.indexer).decode(&model);
                self.check_decoded(horizon, &trace, &plan)?;
                (AttemptVerdict::Satisfiable, Some((trace, plan)))
            }
            SatResult::Unsatisfiable => (AttemptVerdict::Unsatisfiable, None),
            SatResult::TrivialContradiction => (AttemptVerdict::TrivialContradiction, None),
        };

        let report = AttemptReport {
            horizon,
            variables: encoding.instance.variable_count,
            clauses: encoding.instance.clause_count(),
            verdict,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(horizon, verdict = ?report.verdict, elapsed_ms = report.elapsed_ms, "attempt finished");

        Ok(Attempt { report, found })
    }

    fn check_decoded(&self, horizon: usize, trace: &StateTrace, plan: &Plan) -> PlannerResult<()> {
        if trace.at(0) != Some(self.problem.initial_state()) {
            return Err(PlannerError::InvalidPlan {
                horizon,
                message: "decoded step 0 differs from the initial state".to_string(),
            });
        }

        let validation = PlanValidator::new(self.problem).validate(plan);
        if !validation.is_valid {
            return Err(PlannerError::InvalidPlan {
                horizon,
                message: validation.error_message().unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Write `<directory>/horizon_<h>.cnf`
fn save_cnf(directory: &Path, horizon: usize, cnf_text: &str) -> PlannerResult<()> {
    let path = directory.join(format!("horizon_{}.cnf", horizon));
    std::fs::create_dir_all(directory)
        .and_then(|_| std::fs::write(&path, cnf_text))
        .map_err(|source| PlannerError::Io { path: path.clone(), source })?;
    debug!(path = %path.display(), "saved CNF instance");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::model::{delivery_problem, switch_problem, unreachable_problem};
    use crate::problem::FluentId;
    use crate::sat::parse_dimacs;
    use tempfile::tempdir;

    fn options(min_horizon: usize, max_horizon: usize) -> SearchOptions {
        SearchOptions {
            min_horizon,
            max_horizon,
            timeout: Duration::from_secs(60),
            ..SearchOptions::default()
        }
    }

    #[test]
    fn test_switch_found_at_minimum_horizon() {
        let problem = switch_problem();
        let mut search = HorizonSearch::new(&problem, options(2, 5));

        let outcome = search.run().unwrap();
        let solution = outcome.solution().expect("switch problem has a plan");

        assert_eq!(solution.horizon, 2);
        assert_eq!(search.state(), SearchState::Found(2));
        let steps: Vec<_> = solution
            .plan
            .steps()
            .iter()
            .map(|step| (step.step, step.action.as_str()))
            .collect();
        assert_eq!(steps, vec![(0, "switch-on")]);
        assert_eq!(solution.idle_steps(), 1);
        assert!(PlanValidator::new(&problem).quick_validate(&solution.plan));

        let on = FluentId(0);
        let trace: Vec<bool> = (0..=2)
            .map(|step| solution.state_at(&problem, step).unwrap().holds(on))
            .collect();
        assert_eq!(trace, vec![false, true, true]);
    }

    #[test]
    fn test_switch_single_step() {
        let problem = switch_problem();
        let outcome = HorizonSearch::new(&problem, options(1, 3)).run().unwrap();
        let solution = outcome.solution().unwrap();

        assert_eq!(solution.horizon, 1);
        assert_eq!(solution.plan.steps()[0].step, 0);
        assert_eq!(solution.plan.steps()[0].action, "switch-on");
    }

    #[test]
    fn test_delivery_plan_is_minimal() {
        let problem = delivery_problem();
        let outcome = HorizonSearch::new(&problem, options(2, 8)).run().unwrap();
        let solution = outcome.solution().unwrap();

        assert_eq!(solution.horizon, 4);
        assert_eq!(
            solution.plan.action_names().collect::<Vec<_>>(),
            vec!["drive-b-a", "load-a", "drive-a-b", "unload-b"]
        );

        let horizons: Vec<usize> = solution.attempts.iter().map(|a| a.horizon).collect();
        assert_eq!(horizons, vec![2, 3, 4]);
        assert!(solution.attempts[..2]
            .iter()
            .all(|a| a.verdict != AttemptVerdict::Satisfiable));
        assert_eq!(solution.attempts[2].verdict, AttemptVerdict::Satisfiable);
    }

    #[test]
    fn test_unreachable_goal_exhausts() {
        let problem = unreachable_problem();
        let mut search = HorizonSearch::new(&problem, options(2, 5));

        match search.run().unwrap() {
            SearchOutcome::Exhausted { attempts } => {
                assert_eq!(attempts.len(), 4);
                assert!(attempts.iter().all(|a| a.verdict != AttemptVerdict::Satisfiable));
            }
            SearchOutcome::Found(solution) => panic!("unexpected plan {:?}", solution.plan),
        }
        assert_eq!(search.state(), SearchState::Exhausted);
    }

    #[test]
    fn test_parallel_batches_keep_minimal_horizon() {
        let problem = delivery_problem();

        for parallel in [2, 3, 5] {
            let opts = SearchOptions {
                parallel_horizons: parallel,
                ..options(2, 8)
            };
            let outcome = HorizonSearch::new(&problem, opts).run().unwrap();
            let solution = outcome.solution().unwrap();
            assert_eq!(solution.horizon, 4, "parallel_horizons = {}", parallel);
            assert_eq!(solution.attempts.last().map(|a| a.horizon), Some(4));
        }
    }

    #[test]
    fn test_attempt_sizes_match_estimate() {
        let problem = delivery_problem();
        let outcome = HorizonSearch::new(&problem, options(2, 8)).run().unwrap();
        let encoder = SatEncoder::new(&problem);

        for attempt in outcome.attempts() {
            let estimate = encoder.estimate(attempt.horizon);
            assert_eq!(attempt.variables, estimate.variables);
            assert_eq!(attempt.clauses, estimate.clauses());
        }
    }

    #[test]
    fn test_save_cnf_writes_each_attempt() {
        let problem = switch_problem();
        let dir = tempdir().unwrap();
        let opts = SearchOptions {
            cnf_directory: Some(dir.path().join("cnf")),
            ..options(1, 2)
        };

        HorizonSearch::new(&problem, opts).run().unwrap();

        let text = std::fs::read_to_string(dir.path().join("cnf").join("horizon_1.cnf")).unwrap();
        let parsed = parse_dimacs(&text).unwrap();
        assert_eq!(parsed.variable_count, 3);
        assert!(!dir.path().join("cnf").join("horizon_2.cnf").exists());
    }

    #[test]
    fn test_unwritable_cnf_directory_is_fatal() {
        let problem = switch_problem();
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let opts = SearchOptions {
            cnf_directory: Some(blocker.join("cnf")),
            ..options(1, 2)
        };
        let result = HorizonSearch::new(&problem, opts).run();
        assert!(matches!(result, Err(PlannerError::Io { .. })));
    }

    #[test]
    fn test_spent_budget_is_timeout() {
        let problem = switch_problem();
        let opts = SearchOptions {
            timeout: Duration::ZERO,
            ..options(2, 3)
        };
        let result = HorizonSearch::new(&problem, opts).run();
        assert!(matches!(result, Err(PlannerError::Timeout { .. })));
    }

    #[test]
    fn test_options_from_settings() {
        let mut settings = Settings::default();
        settings.search.min_horizon = 3;
        settings.output.save_cnf = true;

        let opts = SearchOptions::from_settings(&settings);
        assert_eq!(opts.min_horizon, 3);
        assert_eq!(opts.max_horizon, 30);
        assert_eq!(opts.timeout, Duration::from_secs(1000));
        assert_eq!(opts.cnf_directory, Some(settings.output.output_directory.clone()));
    }
}
