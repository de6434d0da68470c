//! Accumulated predicates and the record of what was ignored or dropped

use sql2doc_ir::Value;
use std::fmt;

/// Comparison operator of a where-clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Ne,
    /// Accepted at configuration time, never translated
    Unsupported(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ne => "!=",
            Operator::Unsupported(op) => op,
        }
    }
}

impl From<&str> for Operator {
    fn from(op: &str) -> Self {
        match op {
            "=" => Operator::Eq,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            "!=" => Operator::Ne,
            other => Operator::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub op: Operator,
    pub value: Value,
}

/// `low <= field < high`; bounds are not checked against each other.
#[derive(Debug, Clone, PartialEq)]
pub struct BetweenClause {
    pub low: Value,
    pub high: Value,
}

/// A configuration call that left the state untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Ignored {
    /// A call that needs a field name got an empty one
    EmptyField { call: &'static str },
    /// `and_where` without a value
    MissingValue { field: String },
    /// `limit` with anything but a positive integer
    InvalidLimit { value: Value },
}

/// Which request shape a translation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Find,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The branch has no mapping for the operator
    UnsupportedOperator,
    /// A `between` on the same field replaced the predicate
    ShadowedByRange,
}

/// A where-clause that did not make it into the emitted filter.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedClause {
    pub field: String,
    pub op: Operator,
    pub branch: Branch,
    pub reason: DropReason,
}
