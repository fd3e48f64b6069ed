//! Variable indexing for the planning encoding
//!
//! Ids are laid out step by step; within a step all fluents come first, then
//! all actions. The final step has fluents only, since no transition leaves it:
//!
//! ```text
//! step 0: f0 .. fF-1  a0 .. aA-1
//! step 1: f0 .. fF-1  a0 .. aA-1
//! ...
//! step h: f0 .. fF-1
//! ```
//!
//! so `(id - 1) % (F + A)` names the same fluent or action at every step.

use crate::problem::{ActionId, FluentId, FluentLiteral};

/// Entity a SAT variable stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Truth of a fluent at step `step` (`0..=horizon`)
    Fluent { fluent: FluentId, step: usize },
    /// Firing of an action at step `step` (`0..horizon`)
    Action { action: ActionId, step: usize },
}

/// Maps (fluent, step) and (action, step) pairs to dense DIMACS ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableIndexer {
    fluents: usize,
    actions: usize,
    horizon: usize,
}

impl VariableIndexer {
    /// Create an indexer for `fluents` fluents and `actions` actions over `horizon` steps
    pub fn new(fluents: usize, actions: usize, horizon: usize) -> Self {
        debug_assert!(horizon >= 1, "horizon must be at least 1");
        Self {
            fluents,
            actions,
            horizon,
        }
    }

    pub fn fluent_count(&self) -> usize {
        self.fluents
    }

    pub fn action_count(&self) -> usize {
        self.actions
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Variables per full step, also the modulus identifying an entity across steps
    pub fn variables_per_step(&self) -> usize {
        self.fluents + self.actions
    }

    /// Total number of variables: `(F + A) * h + F`
    pub fn variable_count(&self) -> usize {
        self.variables_per_step() * self.horizon + self.fluents
    }

    /// Variable id of a fluent at a step in `0..=horizon`
    pub fn fluent_variable(&self, fluent: FluentId, step: usize) -> i32 {
        debug_assert!(fluent.0 < self.fluents, "fluent {} out of bounds ({} fluents)", fluent.0, self.fluents);
        debug_assert!(step <= self.horizon, "step {} out of bounds (horizon {})", step, self.horizon);
        (step * self.variables_per_step() + fluent.0 + 1) as i32
    }

    /// Variable id of an action at a step in `0..horizon`
    pub fn action_variable(&self, action: ActionId, step: usize) -> i32 {
        debug_assert!(action.0 < self.actions, "action {} out of bounds ({} actions)", action.0, self.actions);
        debug_assert!(step < self.horizon, "step {} out of bounds (horizon {})", step, self.horizon);
        (step * self.variables_per_step() + self.fluents + action.0 + 1) as i32
    }

    /// Signed DIMACS literal for a fluent literal at a step
    pub fn literal(&self, literal: FluentLiteral, step: usize) -> i32 {
        let var = self.fluent_variable(literal.fluent, step);
        if literal.positive { var } else { -var }
    }

    /// All fluent variables of a step, in fluent order
    pub fn fluent_variables_at(&self, step: usize) -> impl Iterator<Item = i32> + Clone + '_ {
        (0..self.fluents).map(move |f| self.fluent_variable(FluentId(f), step))
    }

    /// All action variables of a step, in action order
    pub fn action_variables_at(&self, step: usize) -> impl Iterator<Item = i32> + Clone + '_ {
        (0..self.actions).map(move |a| self.action_variable(ActionId(a), step))
    }

    /// Inverse mapping from a variable id (sign ignored) to its entity
    pub fn variable(&self, id: i32) -> Option<Variable> {
        let id = id.unsigned_abs() as usize;
        if id == 0 || id > self.variable_count() {
            return None;
        }

        let offset = id - 1;
        let step = offset / self.variables_per_step();
        let position = offset % self.variables_per_step();

        if position < self.fluents {
            Some(Variable::Fluent {
                fluent: FluentId(position),
                step,
            })
        } else {
            Some(Variable::Action {
                action: ActionId(position - self.fluents),
                step,
            })
        }
    }

    pub fn statistics(&self) -> VariableStatistics {
        VariableStatistics {
            total_variables: self.variable_count(),
            fluent_variables: self.fluents * (self.horizon + 1),
            action_variables: self.actions * self.horizon,
            variables_per_step: self.variables_per_step(),
        }
    }
}

/// Statistics about variable usage
#[derive(Debug, Clone)]
pub struct VariableStatistics {
    pub total_variables: usize,
    pub fluent_variables: usize,
    pub action_variables: usize,
    pub variables_per_step: usize,
}

impl std::fmt::Display for VariableStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Variable Statistics:")?;
        writeln!(f, "  Total variables: {}", self.total_variables)?;
        writeln!(f, "  Fluent variables: {}", self.fluent_variables)?;
        writeln!(f, "  Action variables: {}", self.action_variables)?;
        writeln!(f, "  Variables per step: {}", self.variables_per_step)?;
        Ok(())
    }
}
