//! Plan search over increasing horizons, plan validation and solution records

pub mod search;
pub mod solution;
pub mod validator;

pub use search::{AttemptReport, AttemptVerdict, HorizonSearch, SearchOptions, SearchOutcome, SearchState};
pub use solution::{Solution, SolutionSummary, TraceStep};
pub use validator::{PlanValidator, PlanViolation, ValidationResult, ViolationKind};
