//! Solution record for a found plan

use super::search::AttemptReport;
use crate::problem::{PlanningProblem, State};
use crate::sat::{Plan, StateTrace};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A plan together with how it was found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub problem: String,
    /// Smallest satisfiable horizon
    pub horizon: usize,
    pub plan: Plan,
    /// Fluents holding at every step `0..=horizon`
    pub trace: Vec<TraceStep>,
    /// Every attempt of the search, in horizon order
    pub attempts: Vec<AttemptReport>,
    #[serde(skip)]
    pub solve_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub step: usize,
    pub true_fluents: Vec<String>,
}

impl Solution {
    pub fn new(
        problem: &PlanningProblem,
        horizon: usize,
        plan: Plan,
        trace: &StateTrace,
        attempts: Vec<AttemptReport>,
        solve_time: Duration,
    ) -> Self {
        let trace = trace
            .states()
            .iter()
            .enumerate()
            .map(|(step, state)| TraceStep {
                step,
                true_fluents: state
                    .true_fluents()
                    .map(|f| problem.fluent_name(f).to_string())
                    .collect(),
            })
            .collect();

        Self {
            problem: problem.name().to_string(),
            horizon,
            plan,
            trace,
            attempts,
            solve_time,
        }
    }

    /// Rebuild the state at a step from the recorded fluent names
    pub fn state_at(&self, problem: &PlanningProblem, step: usize) -> Option<State> {
        let recorded = self.trace.get(step)?;
        let mut state = State::all_false(problem.fluent_count());
        for name in &recorded.true_fluents {
            state.set(problem.fluent_id(name)?, true);
        }
        Some(state)
    }

    /// Number of no-op steps in the plan
    pub fn idle_steps(&self) -> usize {
        self.horizon.saturating_sub(self.plan.len())
    }

    pub fn summary(&self) -> SolutionSummary {
        SolutionSummary {
            problem: self.problem.clone(),
            horizon: self.horizon,
            plan_length: self.plan.len(),
            attempts: self.attempts.len(),
            solve_time_ms: self.solve_time.as_millis() as u64,
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Create from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Save to file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }
}

/// Summary of a solution for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSummary {
    pub problem: String,
    pub horizon: usize,
    pub plan_length: usize,
    pub attempts: usize,
    pub solve_time_ms: u64,
}

impl std::fmt::Display for SolutionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} actions at horizon {} after {} attempts ({}ms)",
            self.problem, self.plan_length, self.horizon, self.attempts, self.solve_time_ms
        )
    }
}
