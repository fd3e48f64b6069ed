//! Errors raised at the solver boundary

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal failures of a horizon search.
///
/// Unsatisfiable horizons and trivially contradictory instances are not errors;
/// they are ordinary [`SatResult`](crate::sat::SatResult) variants.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("malformed CNF instance (line {line}): {message}")]
    Format { line: usize, message: String },

    #[error("solver reached no decision within {budget:?}")]
    Timeout { budget: Duration },

    #[error("failed to exchange CNF instance through {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoded plan for horizon {horizon} is invalid: {message}")]
    InvalidPlan { horizon: usize, message: String },
}

impl PlannerError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}

pub type PlannerResult<T> = std::result::Result<T, PlannerError>;
