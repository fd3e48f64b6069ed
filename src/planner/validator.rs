//! Plan validation by forward simulation

use crate::problem::{ActionId, PlanningProblem, State};
use crate::sat::Plan;
use std::time::Instant;

/// Replays plans from the initial state of a problem
pub struct PlanValidator<'a> {
    problem: &'a PlanningProblem,
}

/// Result of plan validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// States visited, starting with the initial state
    pub states: Vec<State>,
    pub violations: Vec<PlanViolation>,
    pub goal_reached: bool,
    pub validation_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    UnknownAction,
    StepOutOfOrder,
    PreconditionFailed,
    GoalNotReached,
}

/// A problem found while replaying a plan
#[derive(Debug, Clone)]
pub struct PlanViolation {
    /// Position in the plan; `None` for the goal check
    pub position: Option<usize>,
    pub kind: ViolationKind,
    pub description: String,
}

impl<'a> PlanValidator<'a> {
    pub fn new(problem: &'a PlanningProblem) -> Self {
        Self { problem }
    }

    /// Apply every action in order and check the goal at the end.
    ///
    /// Replay stops at the first inapplicable action.
    pub fn validate(&self, plan: &Plan) -> ValidationResult {
        let start_time = Instant::now();
        let problem = self.problem;
        let mut states = vec![problem.initial_state().clone()];
        let mut violations = Vec::new();
        let mut last_step: Option<usize> = None;

        for (position, step) in plan.steps().iter().enumerate() {
            let action_id = match step.action_id.or_else(|| problem.action_by_name(&step.action).map(|a| a.id)) {
                Some(id) if id.index() < problem.action_count() => id,
                _ => {
                    violations.push(PlanViolation {
                        position: Some(position),
                        kind: ViolationKind::UnknownAction,
                        description: format!("unknown action '{}'", step.action),
                    });
                    break;
                }
            };

            if last_step.is_some_and(|last| step.step <= last) {
                violations.push(PlanViolation {
                    position: Some(position),
                    kind: ViolationKind::StepOutOfOrder,
                    description: format!("step {} does not follow step {}", step.step, last_step.unwrap_or_default()),
                });
            }
            last_step = Some(step.step);

            let current = states.last().cloned().unwrap_or_else(|| problem.initial_state().clone());
            match self.check_applicable(action_id, &current) {
                Ok(()) => states.push(problem.action(action_id).apply(&current)),
                Err(description) => {
                    violations.push(PlanViolation {
                        position: Some(position),
                        kind: ViolationKind::PreconditionFailed,
                        description,
                    });
                    break;
                }
            }
        }

        let goal_reached = violations.is_empty()
            && states.last().is_some_and(|state| problem.goal().holds_in(state));

        if violations.is_empty() && !goal_reached {
            let missing: Vec<String> = states
                .last()
                .map(|state| {
                    problem
                        .goal()
                        .unsatisfied_in(state)
                        .map(|lit| problem.format_literal(lit))
                        .collect()
                })
                .unwrap_or_default();
            violations.push(PlanViolation {
                position: None,
                kind: ViolationKind::GoalNotReached,
                description: format!("goal not reached, missing: {}", missing.join(", ")),
            });
        }

        ValidationResult {
            is_valid: violations.is_empty(),
            states,
            violations,
            goal_reached,
            validation_time_ms: start_time.elapsed().as_millis() as u64,
        }
    }

    /// Quick validation, only the verdict
    pub fn quick_validate(&self, plan: &Plan) -> bool {
        self.validate(plan).is_valid
    }

    fn check_applicable(&self, action_id: ActionId, state: &State) -> Result<(), String> {
        let action = self.problem.action(action_id);
        let unmet: Vec<String> = action
            .precondition
            .unsatisfied_in(state)
            .map(|lit| self.problem.format_literal(lit))
            .collect();

        if unmet.is_empty() {
            Ok(())
        } else {
            Err(format!("'{}' is not applicable: {} does not hold", action.name, unmet.join(", ")))
        }
    }
}

impl ValidationResult {
    /// First violation, formatted
    pub fn error_message(&self) -> Option<String> {
        self.violations.first().map(|v| match v.position {
            Some(position) => format!("action {}: {}", position + 1, v.description),
            None => v.description.clone(),
        })
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Plan Validation Result:")?;
        writeln!(f, "  Valid: {}", self.is_valid)?;
        writeln!(f, "  States visited: {}", self.states.len())?;
        writeln!(f, "  Goal reached: {}", self.goal_reached)?;
        writeln!(f, "  Validation time: {}ms", self.validation_time_ms)?;

        if !self.violations.is_empty() {
            writeln!(f, "  Violations:")?;
            for violation in &self.violations {
                match violation.position {
                    Some(position) => writeln!(f, "    - action {}: {}", position + 1, violation.description)?,
                    None => writeln!(f, "    - {}", violation.description)?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::model::{delivery_problem, switch_problem};

    fn plan_of(problem: &PlanningProblem, names: &[&str]) -> Plan {
        let mut plan = Plan::new();
        for (step, name) in names.iter().enumerate() {
            let action = problem.action_by_name(name).unwrap();
            plan.push(step, action.id, problem);
        }
        plan
    }

    #[test]
    fn test_valid_delivery_plan() {
        let problem = delivery_problem();
        let plan = plan_of(&problem, &["drive-b-a", "load-a", "drive-a-b", "unload-b"]);

        let result = PlanValidator::new(&problem).validate(&plan);
        assert!(result.is_valid, "{}", result);
        assert!(result.goal_reached);
        assert_eq!(result.states.len(), 5);
    }

    #[test]
    fn test_precondition_failure_stops_replay() {
        let problem = delivery_problem();
        let plan = plan_of(&problem, &["load-a", "drive-b-a"]);

        let result = PlanValidator::new(&problem).validate(&plan);
        assert!(!result.is_valid);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].kind, ViolationKind::PreconditionFailed);
        assert_eq!(result.states.len(), 1);
        assert!(result.error_message().unwrap().contains("truck-at-a"));
    }

    #[test]
    fn test_goal_not_reached() {
        let problem = delivery_problem();
        let plan = plan_of(&problem, &["drive-b-a", "load-a"]);

        let result = PlanValidator::new(&problem).validate(&plan);
        assert!(!result.is_valid);
        assert_eq!(result.violations[0].kind, ViolationKind::GoalNotReached);
        assert!(result.violations[0].description.contains("pkg-at-b"));
    }

    #[test]
    fn test_empty_plan() {
        let problem = switch_problem();
        let validator = PlanValidator::new(&problem);
        assert!(!validator.quick_validate(&Plan::new()));
        assert!(validator.quick_validate(&plan_of(&problem, &["switch-on"])));
    }

    #[test]
    fn test_unknown_action_by_name() {
        let problem = switch_problem();
        let plan: Plan = serde_json::from_str(r#"{"steps":[{"step":0,"action":"switch-off"}]}"#).unwrap();

        let result = PlanValidator::new(&problem).validate(&plan);
        assert_eq!(result.violations[0].kind, ViolationKind::UnknownAction);
    }
}
