//! Display and output formatting utilities

use crate::config::OutputFormat;
use crate::planner::{AttemptReport, Solution};
use crate::problem::{LiteralSet, PlanningProblem};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Format plans and search reports for display
pub struct PlanFormatter;

impl PlanFormatter {
    /// Format a solution for console output
    pub fn format_solution(solution: &Solution, problem: &PlanningProblem, show_trace: bool) -> String {
        let mut output = String::new();

        output.push_str(&format!("=== Plan for {} ===\n", solution.problem));
        output.push_str(&format!("Horizon: {}\n", solution.horizon));
        output.push_str(&format!("Actions: {} ({} idle steps)\n", solution.plan.len(), solution.idle_steps()));
        output.push_str(&format!("Solve Time: {:.3}s\n", solution.solve_time.as_secs_f64()));
        output.push('\n');

        output.push_str(&Self::format_plan(solution));

        if show_trace {
            output.push('\n');
            output.push_str(&Self::format_trace_table(solution, problem));
            output.push('\n');
            output.push_str(&Self::format_step_rows(solution, problem));
        }

        output
    }

    /// One line per action, numbered by the step it fires at
    pub fn format_plan(solution: &Solution) -> String {
        let mut output = String::new();
        for step in solution.plan.steps() {
            output.push_str(&format!("{:3}: {}\n", step.step, step.action));
        }
        output
    }

    /// Fluent values per step, `1` true and `0` false; the goal column uses
    /// `_` for fluents the goal leaves open
    pub fn format_trace_table(solution: &Solution, problem: &PlanningProblem) -> String {
        let width = problem.fluent_names().iter().map(|n| n.len()).max().unwrap_or(0).max(6);
        let mut output = String::new();

        output.push_str(&format!("{:width$} |", "fluent", width = width));
        for step in 0..=solution.horizon {
            output.push_str(&format!("{:>3}", step));
        }
        output.push_str(" | goal\n");
        output.push_str(&"-".repeat(width + 3 * (solution.horizon + 1) + 9));
        output.push('\n');

        let states: Vec<_> = (0..=solution.horizon)
            .map(|step| solution.state_at(problem, step))
            .collect();

        for fluent in problem.fluent_ids() {
            output.push_str(&format!("{:width$} |", problem.fluent_name(fluent), width = width));
            for state in &states {
                let cell = match state {
                    Some(state) if state.holds(fluent) => '1',
                    Some(_) => '0',
                    None => '?',
                };
                output.push_str(&format!("{:>3}", cell));
            }

            let goal = match problem.goal().literal_for(fluent) {
                Some(lit) if lit.positive => '1',
                Some(_) => '0',
                None => '_',
            };
            output.push_str(&format!(" |   {}\n", goal));
        }

        output
    }

    /// For every plan step, the state it fires in with the action's
    /// precondition and effect, then the goal.
    ///
    /// Each cell has one character per fluent in declaration order: `1`
    /// true, `0` false, `_` not mentioned, `?` state missing from the trace.
    pub fn format_step_rows(solution: &Solution, problem: &PlanningProblem) -> String {
        let label_width = solution
            .plan
            .steps()
            .iter()
            .map(|step| step.action.len() + 5)
            .max()
            .unwrap_or(0)
            .max(11);
        let cell_width = problem.fluent_count().max(5);
        let mut output = String::new();

        output.push_str(&format!(
            "{:label_width$} | {:cell_width$} | {:cell_width$} | eff\n",
            "step action", "state", "pre",
            label_width = label_width,
            cell_width = cell_width
        ));

        for step in solution.plan.steps() {
            let state: String = match solution.state_at(problem, step.step) {
                Some(state) => problem
                    .fluent_ids()
                    .map(|fluent| if state.holds(fluent) { '1' } else { '0' })
                    .collect(),
                None => "?".repeat(problem.fluent_count()),
            };
            let (pre, eff) = match problem.action_by_name(&step.action) {
                Some(action) => (literal_row(problem, &action.precondition), literal_row(problem, &action.effect)),
                None => ("?".repeat(problem.fluent_count()), "?".repeat(problem.fluent_count())),
            };

            let label = format!("{:4} {}", step.step, step.action);
            output.push_str(&format!(
                "{:label_width$} | {:cell_width$} | {:cell_width$} | {}\n",
                label, state, pre, eff,
                label_width = label_width,
                cell_width = cell_width
            ));
        }

        output.push_str(&format!(
            "{:label_width$} | {}\n",
            "goal",
            literal_row(problem, problem.goal()),
            label_width = label_width
        ));

        output
    }

    /// Format the per-horizon attempts as a table
    pub fn format_attempts(attempts: &[AttemptReport]) -> String {
        let mut output = String::new();

        output.push_str("Horizon | Variables | Clauses  | Time(ms) | Verdict\n");
        output.push_str("--------|-----------|----------|----------|----------\n");

        for attempt in attempts {
            output.push_str(&format!(
                "{:7} | {:9} | {:8} | {:8} | {:?}\n",
                attempt.horizon, attempt.variables, attempt.clauses, attempt.elapsed_ms, attempt.verdict
            ));
        }

        output
    }

    /// Save a solution as `plan_001.txt` or `plan_001.json`, returning the path
    pub fn save_plan<P: AsRef<Path>>(
        solution: &Solution,
        problem: &PlanningProblem,
        output_dir: P,
        format: OutputFormat,
    ) -> Result<PathBuf> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

        let path = match format {
            OutputFormat::Text => {
                let path = output_dir.join("plan_001.txt");
                let mut content = Self::format_solution(solution, problem, true);
                content.push('\n');
                content.push_str(&Self::format_attempts(&solution.attempts));
                std::fs::write(&path, content)?;
                path
            }
            OutputFormat::Json => {
                let path = output_dir.join("plan_001.json");
                solution.save_to_file(&path)?;
                path
            }
        };

        Ok(path)
    }
}

fn literal_row(problem: &PlanningProblem, literals: &LiteralSet) -> String {
    problem
        .fluent_ids()
        .map(|fluent| match literals.literal_for(fluent) {
            Some(lit) if lit.positive => '1',
            Some(_) => '0',
            None => '_',
        })
        .collect()
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }

    pub fn header(text: &str) -> String {
        Self::colored(text, Color::Cyan)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Cyan,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Cyan => 36,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::AttemptVerdict;
    use crate::problem::model::{delivery_problem, switch_problem};
    use crate::problem::{ActionId, FluentId, State};
    use crate::sat::{Plan, StateTrace};
    use std::time::Duration;
    use tempfile::tempdir;

    fn switch_solution(problem: &PlanningProblem) -> Solution {
        let mut plan = Plan::new();
        plan.push(0, ActionId(0), problem);

        let mut on = State::all_false(1);
        on.set(FluentId(0), true);
        let trace = StateTrace::new(vec![State::all_false(1), on.clone(), on]);

        let attempts = vec![AttemptReport {
            horizon: 2,
            variables: 5,
            clauses: 8,
            verdict: AttemptVerdict::Satisfiable,
            elapsed_ms: 0,
        }];
        Solution::new(problem, 2, plan, &trace, attempts, Duration::ZERO)
    }

    #[test]
    fn test_plan_listing() {
        let problem = switch_problem();
        let solution = switch_solution(&problem);
        assert_eq!(PlanFormatter::format_plan(&solution), "  0: switch-on\n");
    }

    #[test]
    fn test_trace_table() {
        let problem = switch_problem();
        let solution = switch_solution(&problem);

        let table = PlanFormatter::format_trace_table(&solution, &problem);
        let row = table.lines().find(|l| l.starts_with("on ")).unwrap();
        assert_eq!(row, "on     |  0  1  1 |   1");
    }

    #[test]
    fn test_step_rows() {
        let problem = switch_problem();
        let solution = switch_solution(&problem);

        let rows = PlanFormatter::format_step_rows(&solution, &problem);
        let lines: Vec<&str> = rows.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "   0 switch-on | 0     | _     | 1");
        assert_eq!(lines[2], "goal           | 1");

        let full = PlanFormatter::format_solution(&solution, &problem, true);
        assert!(full.contains("   0 switch-on | 0     | _     | 1"));
        assert!(!PlanFormatter::format_solution(&solution, &problem, false).contains("goal"));
    }

    #[test]
    fn test_delivery_step_rows_mark_unmentioned_fluents() {
        let problem = delivery_problem();
        let mut plan = Plan::new();
        let load = problem.action_by_name("load-a").unwrap();
        plan.push(0, load.id, &problem);
        let trace = StateTrace::new(vec![problem.initial_state().clone(), load.apply(problem.initial_state())]);
        let solution = Solution::new(&problem, 1, plan, &trace, Vec::new(), Duration::ZERO);

        let rows = PlanFormatter::format_step_rows(&solution, &problem);
        let row = rows.lines().nth(1).unwrap();
        let cells: Vec<&str> = row.split(" | ").map(str::trim).collect();
        assert_eq!(cells[0], "0 load-a");
        assert_eq!(cells[2].len(), problem.fluent_count());
        assert!(cells[2].contains('_'));
        assert!(cells[3].contains('_'));
    }

    #[test]
    fn test_attempt_table() {
        let problem = switch_problem();
        let table = PlanFormatter::format_attempts(&switch_solution(&problem).attempts);
        assert!(table.lines().nth(2).unwrap().contains("Satisfiable"));
    }

    #[test]
    fn test_save_plan_formats() {
        let problem = switch_problem();
        let solution = switch_solution(&problem);
        let dir = tempdir().unwrap();

        let text = PlanFormatter::save_plan(&solution, &problem, dir.path(), OutputFormat::Text).unwrap();
        assert!(std::fs::read_to_string(text).unwrap().contains("switch-on"));

        let json = PlanFormatter::save_plan(&solution, &problem, dir.path(), OutputFormat::Json).unwrap();
        assert_eq!(Solution::load_from_file(json).unwrap().horizon, 2);
    }

    #[test]
    fn test_color_output() {
        let colored = ColorOutput::colored("test", Color::Red);
        assert!(colored.contains("test"));
        assert!(ColorOutput::success("OK").contains("OK"));
    }
}
