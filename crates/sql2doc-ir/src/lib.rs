//! sql2doc Intermediate Representation (IR)
//!
//! The request shapes a document store understands: filtered and projected
//! finds, counts, and grouped aggregations with a declarative accumulator.
//! All types serialize deterministically so a request can be fingerprinted.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod fields;
mod value;

pub use fields::{FieldMap, FieldSet};
pub use value::{Document, Value};

#[derive(Debug, Error)]
pub enum IrError {
    #[error("Invalid sort direction: {0}")]
    InvalidSortDirection(String),

    #[error("Failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Constraint on a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    Eq(Value),
    Gt(Value),
    Ne(Value),
    /// Half-open: `gte <= field < lt`
    Range { gte: Value, lt: Value },
}

/// Flat conjunction of per-field conditions. Empty matches everything.
pub type Filter = FieldMap<Condition>;

/// Fields to return or group over, each mapped to "include".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection(FieldSet);

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, field: impl Into<String>) {
        self.0.insert(field);
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `{field: 1, ...}`
    pub fn to_json(&self) -> serde_json::Value {
        self.0
            .iter()
            .map(|f| (f.to_string(), serde_json::Value::from(1)))
            .collect::<Document>()
            .into()
    }
}

impl<S: Into<String>> FromIterator<S> for Projection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// Store encoding: ascending = 1, descending = -1
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

impl FromStr for SortDirection {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(SortDirection::Ascending),
            "desc" | "descending" | "-1" => Ok(SortDirection::Descending),
            other => Err(IrError::InvalidSortDirection(other.to_string())),
        }
    }
}

impl TryFrom<i64> for SortDirection {
    type Error = IrError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(SortDirection::Ascending),
            -1 => Ok(SortDirection::Descending),
            other => Err(IrError::InvalidSortDirection(other.to_string())),
        }
    }
}

pub type SortSpec = FieldMap<SortDirection>;

/// Declarative per-document fold step of a grouped aggregation.
///
/// Adapters compile these into whatever the target store executes; the IR
/// never carries script text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Accumulator {
    /// `output += doc[field]`
    Sum { field: String, output: String },
    /// `output.push(doc[field])`
    CollectList { field: String, output: String },
}

impl Accumulator {
    pub fn field(&self) -> &str {
        match self {
            Accumulator::Sum { field, .. } | Accumulator::CollectList { field, .. } => field,
        }
    }

    pub fn output(&self) -> &str {
        match self {
            Accumulator::Sum { output, .. } | Accumulator::CollectList { output, .. } => output,
        }
    }

    pub fn initial_value(&self) -> serde_json::Value {
        match self {
            Accumulator::Sum { .. } => serde_json::Value::from(0),
            Accumulator::CollectList { .. } => serde_json::Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindRequest {
    pub collection: String,
    pub filter: Filter,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRequest {
    pub collection: String,
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRequest {
    pub collection: String,
    /// Fields group identity is computed over
    pub keys: Projection,
    /// Accumulator state every group starts from
    pub initial: Document,
    pub accumulators: Vec<Accumulator>,
    /// Applied before grouping
    pub condition: Filter,
}

/// Cursor post-processing, applied after the find request is issued.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CursorOptions {
    pub sort: SortSpec,
    pub limit: Option<u64>,
}

/// The single request a query resolves to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Plan {
    Group(GroupRequest),
    Find {
        request: FindRequest,
        options: CursorOptions,
    },
    Count(CountRequest),
    /// Neither grouping nor selection was requested
    Nothing,
}

impl Plan {
    pub fn collection(&self) -> Option<&str> {
        match self {
            Plan::Group(r) => Some(&r.collection),
            Plan::Find { request, .. } => Some(&request.collection),
            Plan::Count(r) => Some(&r.collection),
            Plan::Nothing => None,
        }
    }

    /// Short name of the branch, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Plan::Group(_) => "group",
            Plan::Find { .. } => "find",
            Plan::Count(_) => "count",
            Plan::Nothing => "nothing",
        }
    }

    /// Calculate fingerprint (SHA-256) of the canonical JSON form
    pub fn fingerprint(&self) -> Result<String, IrError> {
        let json = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.collection() {
            Some(c) => write!(f, "{} on {}", self.kind(), c),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Reply of a grouped aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedResult {
    /// One document per group: key fields plus accumulator outputs
    pub retval: Vec<Document>,
    /// Documents folded into any group
    pub count: u64,
    /// Number of distinct groups
    pub keys: u64,
}
