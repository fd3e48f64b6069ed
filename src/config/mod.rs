//! Configuration management for the planner

pub mod settings;

pub use settings::{CliOverrides, InputConfig, OutputConfig, OutputFormat, SearchConfig, Settings, SolverConfig};
