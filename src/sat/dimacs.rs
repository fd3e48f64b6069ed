//! DIMACS CNF formatting and parsing
//!
//! Standard format used in SAT competitions: optional `c` comment lines, a
//! `p cnf <variables> <clauses>` header, then clauses as whitespace separated
//! literals each terminated by `0`.

use super::constraints::{Clause, ClauseSet};
use crate::error::{PlannerError, PlannerResult};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;

/// A CNF formula ready to be handed to a solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnfInstance {
    pub variable_count: usize,
    pub clauses: ClauseSet,
    /// Informative lines written as `c ...` before the header
    pub comments: Vec<String>,
}

impl CnfInstance {
    pub fn new(variable_count: usize, clauses: ClauseSet) -> Self {
        Self {
            variable_count,
            clauses,
            comments: Vec::new(),
        }
    }

    pub fn with_comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Render the instance as DIMACS text
    pub fn to_dimacs(&self) -> String {
        let mut out = String::new();
        for comment in &self.comments {
            let _ = writeln!(out, "c {}", comment);
        }
        let _ = writeln!(out, "p cnf {} {}", self.variable_count, self.clause_count());
        for clause in &self.clauses {
            for lit in &clause.literals {
                let _ = write!(out, "{} ", lit);
            }
            out.push_str("0\n");
        }
        out
    }

    /// Write the DIMACS text to any writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_all(self.to_dimacs().as_bytes())?;
        writer.flush()
    }
}

/// A CNF formula as read back from DIMACS text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstance {
    pub variable_count: usize,
    pub clauses: Vec<Vec<i32>>,
    /// An empty clause or two complementary unit clauses were read
    pub trivially_unsat: bool,
}

impl ParsedInstance {
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Back to the in-memory clause representation
    pub fn to_clause_set(&self) -> ClauseSet {
        self.clauses.iter().cloned().map(Clause::new).collect::<Vec<_>>().into()
    }
}

/// Parse DIMACS CNF text.
///
/// Clauses may span lines. Every problem with the text is reported as
/// [`PlannerError::Format`] with the 1-based line where it was found.
pub fn parse_dimacs(text: &str) -> PlannerResult<ParsedInstance> {
    let mut header: Option<(usize, usize)> = None;
    let mut clauses = Vec::new();
    let mut current: Vec<i32> = Vec::new();
    // Sign of each unit clause seen so far, by variable
    let mut units: HashMap<u32, bool> = HashMap::new();
    let mut trivially_unsat = false;
    let mut last_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('c') {
            continue;
        }

        if line.starts_with('p') {
            if header.is_some() {
                return Err(PlannerError::format(line_no, "duplicate 'p cnf' header"));
            }
            header = Some(parse_header(line, line_no)?);
            continue;
        }

        let Some((variable_count, _)) = header else {
            return Err(PlannerError::format(line_no, "clause before 'p cnf' header"));
        };

        for token in line.split_whitespace() {
            let lit: i32 = token
                .parse()
                .map_err(|_| PlannerError::format(line_no, format!("invalid literal '{}'", token)))?;

            if lit == 0 {
                match current.as_slice() {
                    [] => trivially_unsat = true,
                    &[unit] => {
                        if units.insert(unit.unsigned_abs(), unit > 0) == Some(unit < 0) {
                            trivially_unsat = true;
                        }
                    }
                    _ => {}
                }
                clauses.push(std::mem::take(&mut current));
                continue;
            }

            if lit.unsigned_abs() as usize > variable_count {
                return Err(PlannerError::format(
                    line_no,
                    format!("literal {} exceeds declared variable count {}", lit, variable_count),
                ));
            }
            current.push(lit);
        }
    }

    let Some((variable_count, clause_count)) = header else {
        return Err(PlannerError::format(last_line, "missing 'p cnf' header"));
    };

    if !current.is_empty() {
        return Err(PlannerError::format(last_line, "last clause is not terminated by 0"));
    }

    if clauses.len() != clause_count {
        return Err(PlannerError::format(
            last_line,
            format!("header declares {} clauses but {} were read", clause_count, clauses.len()),
        ));
    }

    Ok(ParsedInstance {
        variable_count,
        clauses,
        trivially_unsat,
    })
}

fn parse_header(line: &str, line_no: usize) -> PlannerResult<(usize, usize)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["p", "cnf", vars, clauses] => {
            let vars: usize = vars
                .parse()
                .map_err(|_| PlannerError::format(line_no, format!("invalid variable count '{}'", vars)))?;
            // Literals are i32
            if vars > i32::MAX as usize {
                return Err(PlannerError::format(
                    line_no,
                    format!("variable count {} is more than {} addressable variables", vars, i32::MAX),
                ));
            }
            let clauses = clauses
                .parse()
                .map_err(|_| PlannerError::format(line_no, format!("invalid clause count '{}'", clauses)))?;
            Ok((vars, clauses))
        }
        _ => Err(PlannerError::format(line_no, format!("invalid header '{}'", line))),
    }
}
