//! Classical planning as satisfiability
//!
//! This library grounds a planning problem into CNF for a fixed horizon,
//! solves it with CaDiCaL and searches increasing horizons until the
//! shortest plan is found.

pub mod config;
pub mod error;
pub mod planner;
pub mod problem;
pub mod sat;
pub mod utils;

pub use config::Settings;
pub use error::{PlannerError, PlannerResult};
pub use planner::{HorizonSearch, SearchOptions, SearchOutcome, Solution};
pub use problem::PlanningProblem;

use anyhow::{Context, Result};

/// Main entry point: load the configured problem and search for a plan
pub fn solve(settings: &Settings) -> Result<SearchOutcome> {
    let problem = problem::load_problem_from_file(&settings.input.problem_file)
        .context("Failed to load problem file")?;
    let mut search = HorizonSearch::new(&problem, SearchOptions::from_settings(settings));
    Ok(search.run()?)
}
