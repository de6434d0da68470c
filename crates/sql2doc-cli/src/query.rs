//! YAML query files and running them
//!
//! ```yaml
//! from: orders
//! fields: [category]
//! where:
//!   - [status, "=", shipped]
//! between:
//!   - [created, "2020-01-01", "2020-02-01"]
//! group: [category]
//! sum: [amount]
//! ```

use serde::Deserialize;
use serde_json::{json, Value as Json};
use sql2doc_builder::{DocumentStore, QueryBuilder, QueryError, QueryOutput, StoreError};
use sql2doc_ir::{IrError, SortDirection, Value};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryFileError {
    #[error("Failed to read query file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse query YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported value for {field}: nested YAML is not a scalar")]
    UnsupportedValue { field: String },

    #[error(transparent)]
    Ir(#[from] IrError),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to render result: {0}")]
    Json(#[from] serde_json::Error),
}

/// One builder call per entry; list order is call order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryFile {
    pub from: String,
    pub fields: Vec<String>,
    pub select: bool,
    pub count: bool,
    #[serde(rename = "where")]
    pub wheres: Vec<(String, String, serde_yaml::Value)>,
    pub between: Vec<(String, serde_yaml::Value, serde_yaml::Value)>,
    pub group: Vec<String>,
    pub sum: Vec<String>,
    /// `[field, asc|desc]`
    pub order: Vec<(String, String)>,
    pub limit: Option<serde_yaml::Value>,
}

impl QueryFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, QueryFileError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(yaml: &str) -> Result<Self, QueryFileError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Replay the file as builder calls.
    pub fn apply<'s, S: DocumentStore>(
        &self,
        mut builder: QueryBuilder<'s, S>,
    ) -> Result<QueryBuilder<'s, S>, QueryFileError> {
        builder = builder.from_fields(&self.from, self.fields.iter().cloned());

        if self.select {
            builder = builder.select();
        }
        if self.count {
            builder = builder.count();
        }
        for (field, op, value) in &self.wheres {
            builder = builder.and_where(field, op.as_str(), scalar(field, value)?);
        }
        for (field, low, high) in &self.between {
            builder = builder.between(field, scalar(field, low)?, scalar(field, high)?);
        }
        for key in &self.group {
            builder = builder.group(key);
        }
        for field in &self.sum {
            builder = builder.sum(field);
        }
        for (field, direction) in &self.order {
            builder = builder.order_by(field, direction.parse::<SortDirection>()?);
        }
        if let Some(limit) = &self.limit {
            builder = builder.limit(scalar("limit", limit)?);
        }

        Ok(builder)
    }
}

fn scalar(field: &str, value: &serde_yaml::Value) -> Result<Value, QueryFileError> {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(*b)),
        Yaml::Number(n) => Ok(match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Yaml::String(s) => Ok(Value::String(s.clone())),
        _ => Err(QueryFileError::UnsupportedValue {
            field: field.to_string(),
        }),
    }
}

/// Execute and render the output as JSON: documents as an array, the
/// grouped reply as-is, a count as a number, nothing as `null`.
pub fn run<S: DocumentStore>(builder: &QueryBuilder<'_, S>) -> Result<Json, RunError> {
    let rendered = match builder.execute()? {
        QueryOutput::Cursor(cursor) => {
            let docs = cursor
                .map(|doc| doc.map(Json::Object))
                .collect::<Result<Vec<_>, _>>()?;
            Json::Array(docs)
        }
        QueryOutput::Grouped(grouped) => serde_json::to_value(grouped)?,
        QueryOutput::Count(n) => json!(n),
        QueryOutput::Nothing => Json::Null,
    };
    Ok(rendered)
}
