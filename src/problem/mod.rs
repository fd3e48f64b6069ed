//! Grounded planning problems: the model the encoder consumes

pub mod model;
pub mod io;

pub use model::{
    ActionId, ActionSchema, FluentId, FluentLiteral, FluentMask, LiteralSet, PlanningProblem,
    ProblemBuilder, ProblemStatistics, State,
};
pub use io::{create_example_problems, load_problem_from_file, parse_problem_from_str, save_problem_to_file};
