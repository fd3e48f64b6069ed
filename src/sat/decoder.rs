//! Projection of a satisfying model back onto states and actions

use super::{Model, VariableIndexer};
use crate::problem::{ActionId, PlanningProblem, State};
use serde::{Deserialize, Serialize};

/// One action of a plan and the step at which it fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step: usize,
    pub action: String,
    #[serde(skip)]
    pub action_id: Option<ActionId>,
}

/// Ordered action sequence; insertion order is execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: usize, action: ActionId, problem: &PlanningProblem) {
        debug_assert!(self.steps.last().map_or(true, |last| last.step < step));
        self.steps.push(PlanStep {
            step,
            action: problem.action(action).name.clone(),
            action_id: Some(action),
        });
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Action names in execution order
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.action.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolve action ids by name, e.g. after loading a plan from JSON
    pub fn resolve(&mut self, problem: &PlanningProblem) -> Result<(), String> {
        for step in &mut self.steps {
            let action = problem
                .action_by_name(&step.action)
                .ok_or_else(|| format!("Unknown action '{}' at step {}", step.action, step.step))?;
            step.action_id = Some(action.id);
        }
        Ok(())
    }
}

/// Fluent valuations at every step `0..=horizon`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrace {
    states: Vec<State>,
}

impl StateTrace {
    pub fn new(states: Vec<State>) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn at(&self, step: usize) -> Option<&State> {
        self.states.get(step)
    }

    pub fn final_state(&self) -> Option<&State> {
        self.states.last()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Reads a model through the indexer
pub struct ModelDecoder<'a> {
    problem: &'a PlanningProblem,
    indexer: VariableIndexer,
}

impl<'a> ModelDecoder<'a> {
    pub fn new(problem: &'a PlanningProblem, indexer: VariableIndexer) -> Self {
        Self { problem, indexer }
    }

    /// Decode the state trace and the plan
    pub fn decode(&self, model: &Model) -> (StateTrace, Plan) {
        let horizon = self.indexer.horizon();
        let mut states = Vec::with_capacity(horizon + 1);
        let mut plan = Plan::new();

        for step in 0..=horizon {
            states.push(self.state_at(model, step));

            if step < horizon {
                if let Some(action) = self.action_at(model, step) {
                    plan.push(step, action, self.problem);
                }
            }
        }

        (StateTrace::new(states), plan)
    }

    /// Fluent valuation at a step
    pub fn state_at(&self, model: &Model, step: usize) -> State {
        let mut state = State::all_false(self.problem.fluent_count());
        for fluent in self.problem.fluent_ids() {
            state.set(fluent, model.value(self.indexer.fluent_variable(fluent, step)));
        }
        state
    }

    /// First action, in index order, that fires at a step.
    ///
    /// Mutual exclusion leaves at most one candidate; should several be true
    /// anyway, the first is kept and the rest are reported.
    pub fn action_at(&self, model: &Model, step: usize) -> Option<ActionId> {
        let mut fired = (0..self.problem.action_count())
            .map(ActionId)
            .filter(|&a| model.value(self.indexer.action_variable(a, step)));

        let first = fired.next()?;
        let ignored: Vec<&str> = fired.map(|a| self.problem.action(a).name.as_str()).collect();
        if !ignored.is_empty() {
            tracing::warn!(
                step,
                chosen = %self.problem.action(first).name,
                ?ignored,
                "several actions fire in one step; keeping the first"
            );
        }
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::model::{delivery_problem, switch_problem};
    use crate::problem::FluentId;

    #[test]
    fn test_decode_switch_plan() {
        // on@0=1 switch-on@0=2 on@1=3 switch-on@1=4 on@2=5
        let problem = switch_problem();
        let vi = VariableIndexer::new(1, 1, 2);
        let model = Model::new(vec![-1, 2, 3, -4, 5]);

        let (trace, plan) = ModelDecoder::new(&problem, vi).decode(&model);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps()[0].step, 0);
        assert_eq!(plan.steps()[0].action, "switch-on");

        let on = FluentId(0);
        let values: Vec<bool> = trace.states().iter().map(|s| s.holds(on)).collect();
        assert_eq!(values, vec![false, true, true]);
    }

    #[test]
    fn test_steps_without_action_are_skipped() {
        let problem = switch_problem();
        let vi = VariableIndexer::new(1, 1, 2);
        let model = Model::new(vec![-1, -2, -3, 4, 5]);

        let (trace, plan) = ModelDecoder::new(&problem, vi).decode(&model);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps()[0].step, 1);
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn test_first_true_action_wins() {
        let problem = delivery_problem();
        let vi = VariableIndexer::new(problem.fluent_count(), problem.action_count(), 1);

        let mut values = vec![false; vi.variable_count()];
        for a in [1, 3] {
            values[vi.action_variable(ActionId(a), 0) as usize - 1] = true;
        }
        let model = Model::from_values(&values);

        let decoder = ModelDecoder::new(&problem, vi);
        assert_eq!(decoder.action_at(&model, 0), Some(ActionId(1)));
    }

    #[test]
    fn test_plan_resolve_by_name() {
        let problem = delivery_problem();
        let mut plan: Plan =
            serde_json::from_str(r#"{"steps":[{"step":0,"action":"drive-b-a"},{"step":1,"action":"load-a"}]}"#)
                .unwrap();
        plan.resolve(&problem).unwrap();
        assert_eq!(plan.steps()[1].action_id, Some(ActionId(2)));

        let mut bad: Plan = serde_json::from_str(r#"{"steps":[{"step":0,"action":"fly"}]}"#).unwrap();
        assert!(bad.resolve(&problem).is_err());
    }
}
