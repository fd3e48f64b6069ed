//! Grounded planning problem: fluents, action schemas and states

use anyhow::Result;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;

/// Position of a fluent in the problem's ordered fluent list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FluentId(pub usize);

/// Position of an action in the problem's ordered action list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub usize);

impl FluentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ActionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Fixed-width bitmask over the fluents of a problem
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FluentMask {
    words: Vec<u64>,
    len: usize,
}

impl FluentMask {
    /// Create an empty mask able to hold `len` fluents
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Create a mask with the given fluents set
    pub fn from_ids<I: IntoIterator<Item = FluentId>>(len: usize, ids: I) -> Self {
        let mut mask = Self::new(len);
        for id in ids {
            mask.insert(id);
        }
        mask
    }

    /// Number of fluents this mask ranges over
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no fluent is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of fluents set
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn contains(&self, id: FluentId) -> bool {
        id.0 < self.len && self.words[id.0 / 64] & (1u64 << (id.0 % 64)) != 0
    }

    pub fn insert(&mut self, id: FluentId) {
        debug_assert!(id.0 < self.len, "fluent {} out of mask range {}", id.0, self.len);
        self.words[id.0 / 64] |= 1u64 << (id.0 % 64);
    }

    pub fn remove(&mut self, id: FluentId) {
        debug_assert!(id.0 < self.len, "fluent {} out of mask range {}", id.0, self.len);
        self.words[id.0 / 64] &= !(1u64 << (id.0 % 64));
    }

    /// Whether the two masks share a set fluent
    pub fn intersects(&self, other: &FluentMask) -> bool {
        self.words.iter().zip(&other.words).any(|(a, b)| a & b != 0)
    }

    /// Set fluents in ascending order
    pub fn iter(&self) -> impl Iterator<Item = FluentId> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(FluentId(w * 64 + bit))
            })
        })
    }
}

/// A signed reference to a fluent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FluentLiteral {
    pub fluent: FluentId,
    pub positive: bool,
}

impl FluentLiteral {
    /// The fluent must hold
    pub fn positive(fluent: FluentId) -> Self {
        Self { fluent, positive: true }
    }

    /// The fluent must not hold
    pub fn negative(fluent: FluentId) -> Self {
        Self { fluent, positive: false }
    }

    pub fn negated(self) -> Self {
        Self {
            fluent: self.fluent,
            positive: !self.positive,
        }
    }
}

/// A conjunction of fluent literals stored as positive/negative bitmasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSet {
    pub positive: FluentMask,
    pub negative: FluentMask,
}

impl LiteralSet {
    pub fn new(fluent_count: usize) -> Self {
        Self {
            positive: FluentMask::new(fluent_count),
            negative: FluentMask::new(fluent_count),
        }
    }

    pub fn from_literals<I: IntoIterator<Item = FluentLiteral>>(fluent_count: usize, literals: I) -> Self {
        let mut set = Self::new(fluent_count);
        for literal in literals {
            set.insert(literal);
        }
        set
    }

    pub fn insert(&mut self, literal: FluentLiteral) {
        if literal.positive {
            self.positive.insert(literal.fluent);
        } else {
            self.negative.insert(literal.fluent);
        }
    }

    /// The literal this set holds for a fluent, if any
    pub fn literal_for(&self, fluent: FluentId) -> Option<FluentLiteral> {
        if self.positive.contains(fluent) {
            Some(FluentLiteral::positive(fluent))
        } else if self.negative.contains(fluent) {
            Some(FluentLiteral::negative(fluent))
        } else {
            None
        }
    }

    /// Literals in fluent order
    pub fn literals(&self) -> impl Iterator<Item = FluentLiteral> + '_ {
        let positive = self.positive.iter().map(FluentLiteral::positive);
        let negative = self.negative.iter().map(FluentLiteral::negative);
        positive.merge_by(negative, |p: &FluentLiteral, n: &FluentLiteral| p.fluent <= n.fluent)
    }

    pub fn len(&self) -> usize {
        self.positive.count() + self.negative.count()
    }

    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    /// False when some fluent is required both true and false
    pub fn is_consistent(&self) -> bool {
        !self.positive.intersects(&self.negative)
    }

    /// Whether every literal holds in the state
    pub fn holds_in(&self, state: &State) -> bool {
        self.unsatisfied_in(state).next().is_none()
    }

    /// Literals that do not hold in the state
    pub fn unsatisfied_in<'a>(&'a self, state: &'a State) -> impl Iterator<Item = FluentLiteral> + 'a {
        self.literals().filter(move |lit| state.holds(lit.fluent) != lit.positive)
    }
}

/// A complete truth assignment to the fluents of a problem
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    values: FluentMask,
}

impl State {
    pub fn new(values: FluentMask) -> Self {
        Self { values }
    }

    /// The state where every fluent is false
    pub fn all_false(fluent_count: usize) -> Self {
        Self::new(FluentMask::new(fluent_count))
    }

    pub fn holds(&self, fluent: FluentId) -> bool {
        self.values.contains(fluent)
    }

    pub fn set(&mut self, fluent: FluentId, value: bool) {
        if value {
            self.values.insert(fluent);
        } else {
            self.values.remove(fluent);
        }
    }

    pub fn fluent_count(&self) -> usize {
        self.values.len()
    }

    /// Fluents that hold in this state
    pub fn true_fluents(&self) -> impl Iterator<Item = FluentId> + '_ {
        self.values.iter()
    }

    /// Apply an unconditional effect: delete negatives, then add positives
    pub fn apply(&self, effect: &LiteralSet) -> State {
        let mut next = self.clone();
        for fluent in effect.negative.iter() {
            next.values.remove(fluent);
        }
        for fluent in effect.positive.iter() {
            next.values.insert(fluent);
        }
        next
    }
}

/// A grounded action with a precondition and an unconditional effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSchema {
    pub id: ActionId,
    pub name: String,
    pub precondition: LiteralSet,
    pub effect: LiteralSet,
}

impl ActionSchema {
    pub fn is_applicable(&self, state: &State) -> bool {
        self.precondition.holds_in(state)
    }

    pub fn apply(&self, state: &State) -> State {
        state.apply(&self.effect)
    }
}

/// A grounded classical-planning problem
#[derive(Debug, Clone)]
pub struct PlanningProblem {
    name: String,
    fluents: Vec<String>,
    actions: Vec<ActionSchema>,
    initial_state: State,
    goal: LiteralSet,
}

impl PlanningProblem {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fluent_count(&self) -> usize {
        self.fluents.len()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Fluent ids in problem order
    pub fn fluent_ids(&self) -> impl Iterator<Item = FluentId> {
        (0..self.fluents.len()).map(FluentId)
    }

    pub fn fluent_names(&self) -> &[String] {
        &self.fluents
    }

    pub fn fluent_name(&self, id: FluentId) -> &str {
        &self.fluents[id.0]
    }

    pub fn fluent_id(&self, name: &str) -> Option<FluentId> {
        self.fluents.iter().position(|f| f == name).map(FluentId)
    }

    pub fn actions(&self) -> &[ActionSchema] {
        &self.actions
    }

    pub fn action(&self, id: ActionId) -> &ActionSchema {
        &self.actions[id.0]
    }

    pub fn action_by_name(&self, name: &str) -> Option<&ActionSchema> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    pub fn goal(&self) -> &LiteralSet {
        &self.goal
    }

    /// Render a literal with its fluent name
    pub fn format_literal(&self, literal: FluentLiteral) -> String {
        if literal.positive {
            self.fluent_name(literal.fluent).to_string()
        } else {
            format!("not {}", self.fluent_name(literal.fluent))
        }
    }

    pub fn statistics(&self) -> ProblemStatistics {
        let precondition_literals: usize = self.actions.iter().map(|a| a.precondition.len()).sum();
        let effect_literals: usize = self.actions.iter().map(|a| a.effect.len()).sum();

        ProblemStatistics {
            name: self.name.clone(),
            fluents: self.fluent_count(),
            actions: self.action_count(),
            initially_true: self.initial_state.true_fluents().count(),
            goal_literals: self.goal.len(),
            precondition_literals,
            effect_literals,
        }
    }
}

/// Incrementally assembles a [`PlanningProblem`], interning names to indices
#[derive(Debug, Default)]
pub struct ProblemBuilder {
    name: String,
    fluents: Vec<String>,
    fluent_index: HashMap<String, FluentId>,
    actions: Vec<(String, Vec<FluentLiteral>, Vec<FluentLiteral>)>,
    initially_true: Vec<FluentId>,
    goal: Vec<FluentLiteral>,
}

impl ProblemBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a fluent and get its index
    pub fn fluent(&mut self, name: &str) -> Result<FluentId> {
        if self.fluent_index.contains_key(name) {
            anyhow::bail!("Duplicate fluent '{}'", name);
        }
        let id = FluentId(self.fluents.len());
        self.fluents.push(name.to_string());
        self.fluent_index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a previously declared fluent
    pub fn fluent_id(&self, name: &str) -> Result<FluentId> {
        self.fluent_index
            .get(name)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown fluent '{}'", name))
    }

    pub fn action(
        &mut self,
        name: &str,
        precondition: &[FluentLiteral],
        effect: &[FluentLiteral],
    ) -> Result<ActionId> {
        if self.actions.iter().any(|(n, _, _)| n == name) {
            anyhow::bail!("Duplicate action '{}'", name);
        }
        let id = ActionId(self.actions.len());
        self.actions.push((name.to_string(), precondition.to_vec(), effect.to_vec()));
        Ok(id)
    }

    pub fn initially_true(&mut self, fluent: FluentId) -> &mut Self {
        self.initially_true.push(fluent);
        self
    }

    pub fn goal(&mut self, literal: FluentLiteral) -> &mut Self {
        self.goal.push(literal);
        self
    }

    pub fn build(self) -> Result<PlanningProblem> {
        let n = self.fluents.len();

        let mut actions = Vec::with_capacity(self.actions.len());
        for (index, (name, precondition, effect)) in self.actions.into_iter().enumerate() {
            let precondition = checked_literal_set(n, precondition, || format!("precondition of '{}'", name))?;
            let effect = checked_literal_set(n, effect, || format!("effect of '{}'", name))?;
            actions.push(ActionSchema {
                id: ActionId(index),
                name,
                precondition,
                effect,
            });
        }

        let goal = checked_literal_set(n, self.goal, || "goal".to_string())?;
        if let Some(bad) = self.initially_true.iter().find(|f| f.0 >= n) {
            anyhow::bail!("Fluent index {} in initial state out of range ({} fluents)", bad.0, n);
        }
        let initial_state = State::new(FluentMask::from_ids(n, self.initially_true));

        Ok(PlanningProblem {
            name: self.name,
            fluents: self.fluents,
            actions,
            initial_state,
            goal,
        })
    }
}

fn checked_literal_set(
    fluent_count: usize,
    literals: Vec<FluentLiteral>,
    what: impl Fn() -> String,
) -> Result<LiteralSet> {
    if let Some(bad) = literals.iter().find(|l| l.fluent.0 >= fluent_count) {
        anyhow::bail!("Fluent index {} in {} out of range ({} fluents)", bad.fluent.0, what(), fluent_count);
    }
    let set = LiteralSet::from_literals(fluent_count, literals);
    if !set.is_consistent() {
        anyhow::bail!("The {} requires a fluent to be both true and false", what());
    }
    Ok(set)
}

/// Summary sizes of a problem
#[derive(Debug, Clone)]
pub struct ProblemStatistics {
    pub name: String,
    pub fluents: usize,
    pub actions: usize,
    pub initially_true: usize,
    pub goal_literals: usize,
    pub precondition_literals: usize,
    pub effect_literals: usize,
}

impl fmt::Display for ProblemStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Problem Statistics ({}):", self.name)?;
        writeln!(f, "  Fluents: {} ({} initially true)", self.fluents, self.initially_true)?;
        writeln!(f, "  Actions: {}", self.actions)?;
        writeln!(f, "  Goal literals: {}", self.goal_literals)?;
        writeln!(f, "  Precondition literals: {}", self.precondition_literals)?;
        writeln!(f, "  Effect literals: {}", self.effect_literals)?;
        Ok(())
    }
}

/// Build the one-fluent problem used across the test suites:
/// fluent `on` starts false, action `switch-on` sets it, goal is `on`.
#[cfg(test)]
pub(crate) fn switch_problem() -> PlanningProblem {
    let mut b = ProblemBuilder::new("switch");
    let on = b.fluent("on").unwrap();
    b.action("switch-on", &[], &[FluentLiteral::positive(on)]).unwrap();
    b.goal(FluentLiteral::positive(on));
    b.build().unwrap()
}

/// A truck at `b` must fetch a package from `a` and bring it back to `b`.
/// The shortest plan has exactly four actions.
#[cfg(test)]
pub(crate) fn delivery_problem() -> PlanningProblem {
    use FluentLiteral as L;

    let mut b = ProblemBuilder::new("delivery");
    let truck_a = b.fluent("truck-at-a").unwrap();
    let truck_b = b.fluent("truck-at-b").unwrap();
    let pkg_a = b.fluent("pkg-at-a").unwrap();
    let pkg_b = b.fluent("pkg-at-b").unwrap();
    let pkg_truck = b.fluent("pkg-in-truck").unwrap();

    b.action("drive-a-b", &[L::positive(truck_a)], &[L::positive(truck_b), L::negative(truck_a)]).unwrap();
    b.action("drive-b-a", &[L::positive(truck_b)], &[L::positive(truck_a), L::negative(truck_b)]).unwrap();
    b.action("load-a", &[L::positive(truck_a), L::positive(pkg_a)], &[L::positive(pkg_truck), L::negative(pkg_a)]).unwrap();
    b.action("load-b", &[L::positive(truck_b), L::positive(pkg_b)], &[L::positive(pkg_truck), L::negative(pkg_b)]).unwrap();
    b.action("unload-a", &[L::positive(truck_a), L::positive(pkg_truck)], &[L::positive(pkg_a), L::negative(pkg_truck)]).unwrap();
    b.action("unload-b", &[L::positive(truck_b), L::positive(pkg_truck)], &[L::positive(pkg_b), L::negative(pkg_truck)]).unwrap();

    b.initially_true(truck_b).initially_true(pkg_a);
    b.goal(L::positive(pkg_b));
    b.build().unwrap()
}

/// Goal fluent `target` is never added by any action.
#[cfg(test)]
pub(crate) fn unreachable_problem() -> PlanningProblem {
    let mut b = ProblemBuilder::new("unreachable");
    let lamp = b.fluent("lamp").unwrap();
    let target = b.fluent("target").unwrap();
    b.action("toggle-lamp", &[], &[FluentLiteral::positive(lamp)]).unwrap();
    b.goal(FluentLiteral::positive(target));
    b.build().unwrap()
}
