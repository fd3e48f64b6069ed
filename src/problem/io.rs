//! File I/O for grounded planning problems
//!
//! Problems are stored as YAML (or JSON when the file extension is `.json`):
//!
//! ```yaml
//! name: switch
//! fluents: [on]
//! actions:
//!   - name: switch-on
//!     effect: { positive: [on] }
//! initial_state: []
//! goal: { positive: [on] }
//! ```

use super::{FluentLiteral, LiteralSet, PlanningProblem, ProblemBuilder};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialized form of a [`PlanningProblem`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemFile {
    #[serde(default)]
    pub name: String,
    pub fluents: Vec<String>,
    #[serde(default)]
    pub actions: Vec<ActionFile>,
    #[serde(default)]
    pub initial_state: Vec<String>,
    #[serde(default)]
    pub goal: LiteralsFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFile {
    pub name: String,
    #[serde(default)]
    pub precondition: LiteralsFile,
    #[serde(default)]
    pub effect: LiteralsFile,
}

/// Fluent names that must hold (`positive`) or must not hold (`negative`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiteralsFile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positive: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub negative: Vec<String>,
}

impl ProblemFile {
    /// Resolve names to indices and build the problem
    pub fn into_problem(self) -> Result<PlanningProblem> {
        let mut builder = ProblemBuilder::new(self.name);
        for fluent in &self.fluents {
            builder.fluent(fluent)?;
        }

        for action in &self.actions {
            let precondition = resolve_literals(&builder, &action.precondition)
                .with_context(|| format!("In precondition of action '{}'", action.name))?;
            let effect = resolve_literals(&builder, &action.effect)
                .with_context(|| format!("In effect of action '{}'", action.name))?;
            builder.action(&action.name, &precondition, &effect)?;
        }

        for name in &self.initial_state {
            let id = builder.fluent_id(name).context("In initial state")?;
            builder.initially_true(id);
        }

        for literal in resolve_literals(&builder, &self.goal).context("In goal")? {
            builder.goal(literal);
        }

        builder.build()
    }
}

impl From<&PlanningProblem> for ProblemFile {
    fn from(problem: &PlanningProblem) -> Self {
        let names = |set: &LiteralSet| LiteralsFile {
            positive: set.positive.iter().map(|f| problem.fluent_name(f).to_string()).collect(),
            negative: set.negative.iter().map(|f| problem.fluent_name(f).to_string()).collect(),
        };

        Self {
            name: problem.name().to_string(),
            fluents: problem.fluent_names().to_vec(),
            actions: problem
                .actions()
                .iter()
                .map(|a| ActionFile {
                    name: a.name.clone(),
                    precondition: names(&a.precondition),
                    effect: names(&a.effect),
                })
                .collect(),
            initial_state: problem
                .initial_state()
                .true_fluents()
                .map(|f| problem.fluent_name(f).to_string())
                .collect(),
            goal: names(problem.goal()),
        }
    }
}

fn resolve_literals(builder: &ProblemBuilder, literals: &LiteralsFile) -> Result<Vec<FluentLiteral>> {
    let positive = literals
        .positive
        .iter()
        .map(|name| builder.fluent_id(name).map(FluentLiteral::positive));
    let negative = literals
        .negative
        .iter()
        .map(|name| builder.fluent_id(name).map(FluentLiteral::negative));
    positive.chain(negative).collect()
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a problem from a YAML or JSON file
pub fn load_problem_from_file<P: AsRef<Path>>(path: P) -> Result<PlanningProblem> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read problem file: {}", path.display()))?;

    let file: ProblemFile = if is_json(path) {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse problem file: {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse problem file: {}", path.display()))?
    };

    file.into_problem()
        .with_context(|| format!("Invalid problem in {}", path.display()))
}

/// Parse a problem from YAML text
pub fn parse_problem_from_str(content: &str) -> Result<PlanningProblem> {
    let file: ProblemFile = serde_yaml::from_str(content).context("Failed to parse problem")?;
    file.into_problem()
}

/// Save a problem as YAML or JSON depending on the extension
pub fn save_problem_to_file<P: AsRef<Path>>(problem: &PlanningProblem, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = ProblemFile::from(problem);
    let content = if is_json(path) {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_yaml::to_string(&file)?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write problem to file: {}", path.display()))?;

    Ok(())
}

const SWITCH: &str = "\
name: switch
fluents: [on]
actions:
  - name: switch-on
    effect: { positive: [on] }
initial_state: []
goal: { positive: [on] }
";

const DELIVERY: &str = "\
name: delivery
fluents: [truck-at-a, truck-at-b, pkg-at-a, pkg-at-b, pkg-in-truck]
actions:
  - name: drive-a-b
    precondition: { positive: [truck-at-a] }
    effect: { positive: [truck-at-b], negative: [truck-at-a] }
  - name: drive-b-a
    precondition: { positive: [truck-at-b] }
    effect: { positive: [truck-at-a], negative: [truck-at-b] }
  - name: load-a
    precondition: { positive: [truck-at-a, pkg-at-a] }
    effect: { positive: [pkg-in-truck], negative: [pkg-at-a] }
  - name: load-b
    precondition: { positive: [truck-at-b, pkg-at-b] }
    effect: { positive: [pkg-in-truck], negative: [pkg-at-b] }
  - name: unload-a
    precondition: { positive: [truck-at-a, pkg-in-truck] }
    effect: { positive: [pkg-at-a], negative: [pkg-in-truck] }
  - name: unload-b
    precondition: { positive: [truck-at-b, pkg-in-truck] }
    effect: { positive: [pkg-at-b], negative: [pkg-in-truck] }
initial_state: [truck-at-b, pkg-at-a]
goal: { positive: [pkg-at-b] }
";

const BLOCKS: &str = "\
name: two-blocks
fluents: [a-on-table, b-on-table, a-on-b, b-on-a, a-clear, b-clear, holding-a, holding-b, hand-empty]
actions:
  - name: pick-up-a
    precondition: { positive: [a-on-table, a-clear, hand-empty] }
    effect: { positive: [holding-a], negative: [a-on-table, a-clear, hand-empty] }
  - name: pick-up-b
    precondition: { positive: [b-on-table, b-clear, hand-empty] }
    effect: { positive: [holding-b], negative: [b-on-table, b-clear, hand-empty] }
  - name: stack-a-on-b
    precondition: { positive: [holding-a, b-clear] }
    effect: { positive: [a-on-b, a-clear, hand-empty], negative: [holding-a, b-clear] }
  - name: stack-b-on-a
    precondition: { positive: [holding-b, a-clear] }
    effect: { positive: [b-on-a, b-clear, hand-empty], negative: [holding-b, a-clear] }
  - name: unstack-a-from-b
    precondition: { positive: [a-on-b, a-clear, hand-empty] }
    effect: { positive: [holding-a, b-clear], negative: [a-on-b, a-clear, hand-empty] }
  - name: unstack-b-from-a
    precondition: { positive: [b-on-a, b-clear, hand-empty] }
    effect: { positive: [holding-b, a-clear], negative: [b-on-a, b-clear, hand-empty] }
  - name: put-down-a
    precondition: { positive: [holding-a] }
    effect: { positive: [a-on-table, a-clear, hand-empty], negative: [holding-a] }
  - name: put-down-b
    precondition: { positive: [holding-b] }
    effect: { positive: [b-on-table, b-clear, hand-empty], negative: [holding-b] }
initial_state: [a-on-b, b-on-table, a-clear, hand-empty]
goal: { positive: [b-on-a] }
";

const UNREACHABLE: &str = "\
name: unreachable
fluents: [lamp, target]
actions:
  - name: toggle-lamp
    effect: { positive: [lamp] }
initial_state: []
goal: { positive: [target] }
";

/// Write the bundled example problems into a directory
pub fn create_example_problems<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    for (file, content) in [
        ("switch.yaml", SWITCH),
        ("delivery.yaml", DELIVERY),
        ("blocks.yaml", BLOCKS),
        ("unreachable.yaml", UNREACHABLE),
    ] {
        let path = dir.join(file);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write example problem: {}", path.display()))?;
    }

    Ok(())
}
