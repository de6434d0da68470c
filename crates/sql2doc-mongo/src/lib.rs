//! MongoDB command encoder for sql2doc plans
//!
//! Converts a [`Plan`] into the command document a MongoDB server accepts:
//! `find`, `count`, or the legacy `group` command with a compiled
//! `$reduce` function. Values use extended JSON, so dates come out as
//! `{"$date": {"$numberLong": ...}}`.

use serde_json::{json, Map, Value as Json};
use sql2doc_ir::{Condition, CursorOptions, Filter, Plan, Projection, SortSpec};
use thiserror::Error;
use tracing::trace;

mod reduce;

pub use reduce::compile_reduce;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("Command serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct MongoEncoder;

impl MongoEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a plan as a command document. `Plan::Nothing` has none.
    pub fn encode(&self, plan: &Plan) -> Result<Option<Json>, EncodingError> {
        let command = match plan {
            Plan::Nothing => return Ok(None),
            Plan::Find { request, options } => {
                let mut cmd = Map::new();
                cmd.insert("find".into(), json!(request.collection));
                cmd.insert("filter".into(), self.encode_filter(&request.filter)?);
                if !request.projection.is_empty() {
                    cmd.insert("projection".into(), self.encode_projection(&request.projection)?);
                }
                self.encode_cursor_options(&mut cmd, options)?;
                Json::Object(cmd)
            }
            Plan::Count(request) => json!({
                "count": request.collection,
                "query": self.encode_filter(&request.filter)?,
            }),
            Plan::Group(request) => {
                for acc in &request.accumulators {
                    check_field(acc.field())?;
                    check_field(acc.output())?;
                }
                json!({
                    "group": {
                        "ns": request.collection,
                        "key": self.encode_projection(&request.keys)?,
                        "initial": request.initial,
                        "$reduce": compile_reduce(&request.accumulators),
                        "cond": self.encode_filter(&request.condition)?,
                    }
                })
            }
        };

        trace!(kind = plan.kind(), "encoded command");
        Ok(Some(command))
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_pretty(&self, plan: &Plan) -> Result<Option<String>, EncodingError> {
        match self.encode(plan)? {
            Some(cmd) => Ok(Some(serde_json::to_string_pretty(&cmd)?)),
            None => Ok(None),
        }
    }

    pub fn encode_filter(&self, filter: &Filter) -> Result<Json, EncodingError> {
        let mut doc = Map::new();
        for (field, condition) in filter.iter() {
            check_field(field)?;
            let encoded = match condition {
                Condition::Eq(v) => v.to_json(),
                Condition::Gt(v) => json!({ "$gt": v.to_json() }),
                Condition::Ne(v) => json!({ "$ne": v.to_json() }),
                Condition::Range { gte, lt } => json!({
                    "$gte": gte.to_json(),
                    "$lt": lt.to_json(),
                }),
            };
            doc.insert(field.to_string(), encoded);
        }
        Ok(Json::Object(doc))
    }

    fn encode_projection(&self, projection: &Projection) -> Result<Json, EncodingError> {
        for field in projection.fields() {
            check_field(field)?;
        }
        Ok(projection.to_json())
    }

    fn encode_sort(&self, sort: &SortSpec) -> Result<Json, EncodingError> {
        let mut doc = Map::new();
        for (field, direction) in sort.iter() {
            check_field(field)?;
            doc.insert(field.to_string(), json!(direction.as_i32()));
        }
        Ok(Json::Object(doc))
    }

    fn encode_cursor_options(
        &self,
        cmd: &mut Map<String, Json>,
        options: &CursorOptions,
    ) -> Result<(), EncodingError> {
        if !options.sort.is_empty() {
            cmd.insert("sort".into(), self.encode_sort(&options.sort)?);
        }
        if let Some(limit) = options.limit {
            cmd.insert("limit".into(), json!(limit));
        }
        Ok(())
    }
}

/// Operator-looking or empty names would change the meaning of a command.
fn check_field(field: &str) -> Result<(), EncodingError> {
    if field.is_empty() || field.starts_with('$') {
        return Err(EncodingError::InvalidFieldName(field.to_string()));
    }
    Ok(())
}
