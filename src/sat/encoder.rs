//! SAT encoder for one planning horizon

use super::{ClauseBreakdown, ClauseEncoder, CnfInstance, VariableIndexer};
use crate::problem::PlanningProblem;

/// Everything built for one horizon attempt
#[derive(Debug, Clone)]
pub struct HorizonEncoding {
    pub indexer: VariableIndexer,
    pub instance: CnfInstance,
    pub breakdown: ClauseBreakdown,
}

impl HorizonEncoding {
    pub fn horizon(&self) -> usize {
        self.indexer.horizon()
    }

    pub fn statistics(&self, problem: &PlanningProblem) -> EncodingStatistics {
        EncodingStatistics {
            problem_name: problem.name().to_string(),
            horizon: self.horizon(),
            fluents: problem.fluent_count(),
            actions: problem.action_count(),
            total_variables: self.instance.variable_count,
            total_clauses: self.instance.clause_count(),
            breakdown: self.breakdown,
        }
    }
}

/// Builds the CNF instance of a problem for a chosen horizon
pub struct SatEncoder<'a> {
    problem: &'a PlanningProblem,
}

impl<'a> SatEncoder<'a> {
    pub fn new(problem: &'a PlanningProblem) -> Self {
        Self { problem }
    }

    pub fn indexer(&self, horizon: usize) -> VariableIndexer {
        VariableIndexer::new(self.problem.fluent_count(), self.problem.action_count(), horizon)
    }

    /// Run Indexer → Clause Encoder → CNF instance for a horizon
    pub fn encode(&self, horizon: usize) -> HorizonEncoding {
        let indexer = self.indexer(horizon);
        let (clauses, breakdown) = ClauseEncoder::new(self.problem, indexer).encode();

        tracing::debug!(
            horizon,
            variables = indexer.variable_count(),
            clauses = clauses.len(),
            "encoded horizon"
        );

        let instance = CnfInstance::new(indexer.variable_count(), clauses).with_comments(self.comments(&indexer));

        HorizonEncoding {
            indexer,
            instance,
            breakdown,
        }
    }

    fn comments(&self, indexer: &VariableIndexer) -> Vec<String> {
        let m = indexer.variables_per_step();
        vec![
            format!("planning problem '{}'", self.problem.name()),
            format!(
                "{} variables per step: {} fluents followed by {} actions",
                m,
                indexer.fluent_count(),
                indexer.action_count()
            ),
            format!(
                "{} steps; the final step {} carries fluents only",
                indexer.horizon(),
                indexer.horizon()
            ),
            format!("ids equal modulo {} denote the same fluent or action at different steps", m),
        ]
    }

    /// Exact encoding size for a horizon, computed without building clauses
    pub fn estimate(&self, horizon: usize) -> EncodingEstimate {
        let problem = self.problem;
        let f = problem.fluent_count();
        let a = problem.action_count();
        let literals_per_step: usize = problem
            .actions()
            .iter()
            .map(|action| action.precondition.len() + action.effect.len())
            .sum();

        let breakdown = ClauseBreakdown {
            initial_state: f,
            goal: problem.goal().len(),
            action_implications: horizon * literals_per_step,
            frame_axioms: 2 * f * horizon,
            mutual_exclusion: horizon * a * a.saturating_sub(1) / 2,
        };
        let variables = self.indexer(horizon).variable_count();

        EncodingEstimate {
            horizon,
            variables,
            breakdown,
            complexity_level: ComplexityLevel::from_clause_count(breakdown.total()),
        }
    }
}

/// Statistics about the SAT encoding
#[derive(Debug, Clone)]
pub struct EncodingStatistics {
    pub problem_name: String,
    pub horizon: usize,
    pub fluents: usize,
    pub actions: usize,
    pub total_variables: usize,
    pub total_clauses: usize,
    pub breakdown: ClauseBreakdown,
}

/// Predicted size of an encoding
#[derive(Debug, Clone)]
pub struct EncodingEstimate {
    pub horizon: usize,
    pub variables: usize,
    pub breakdown: ClauseBreakdown,
    pub complexity_level: ComplexityLevel,
}

impl EncodingEstimate {
    pub fn clauses(&self) -> usize {
        self.breakdown.total()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ComplexityLevel {
    fn from_clause_count(clauses: usize) -> Self {
        if clauses < 10_000 {
            ComplexityLevel::Low
        } else if clauses < 100_000 {
            ComplexityLevel::Medium
        } else if clauses < 1_000_000 {
            ComplexityLevel::High
        } else {
            ComplexityLevel::VeryHigh
        }
    }
}

impl std::fmt::Display for EncodingStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SAT Encoding Statistics:")?;
        writeln!(f, "  Problem: {}", self.problem_name)?;
        writeln!(f, "  Horizon: {}", self.horizon)?;
        writeln!(f, "  Fluents: {}, Actions: {}", self.fluents, self.actions)?;
        writeln!(f, "  Total variables: {}", self.total_variables)?;
        writeln!(f, "  Total clauses: {}", self.total_clauses)?;
        write!(f, "{}", self.breakdown)?;
        Ok(())
    }
}

impl std::fmt::Display for EncodingEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let recommendation = match self.complexity_level {
            ComplexityLevel::Low => "should solve quickly",
            ComplexityLevel::Medium => "may take some time",
            ComplexityLevel::High => "likely challenging",
            ComplexityLevel::VeryHigh => "consider a lower maximum horizon",
        };
        write!(
            f,
            "  h={:<3} {:>9} vars {:>10} clauses  {:?} ({})",
            self.horizon,
            self.variables,
            self.clauses(),
            self.complexity_level,
            recommendation
        )
    }
}
