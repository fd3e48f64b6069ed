//! SAT components for bounded planning

pub mod variables;
pub mod constraints;
pub mod dimacs;
pub mod encoder;
pub mod solver;
pub mod decoder;

pub use variables::{Variable, VariableIndexer, VariableStatistics};
pub use constraints::{Clause, ClauseBreakdown, ClauseEncoder, ClauseSet};
pub use dimacs::{parse_dimacs, CnfInstance, ParsedInstance};
pub use encoder::{ComplexityLevel, EncodingEstimate, EncodingStatistics, HorizonEncoding, SatEncoder};
pub use solver::{Model, SatResult, SolverAdapter, SolverResultType, SolverStatistics};
pub use decoder::{ModelDecoder, Plan, PlanStep, StateTrace};
