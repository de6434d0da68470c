//! Translation of accumulated builder state into a single request
//!
//! Branch priority is fixed: grouping wins over selection, selection over
//! nothing. The two branches build their filters differently and the
//! differences are kept on purpose:
//!
//! | operator | find                          | group              |
//! |----------|-------------------------------|--------------------|
//! | `=`      | digit strings become integers | value as stored    |
//! | `>`      | dropped                       | `$gt`, int-coerced |
//! | `!=`     | dropped                       | `$ne`, int-coerced |
//! | `<`      | dropped                       | dropped            |
//!
//! In both branches ranges are folded after where-clauses and replace any
//! predicate on the same field.

use crate::clause::{BetweenClause, Branch, DropReason, DroppedClause, Operator, WhereClause};
use sha2::{Digest, Sha256};
use sql2doc_ir::{
    Accumulator, Condition, CountRequest, CursorOptions, Document, FieldMap, FieldSet, Filter,
    FindRequest, GroupRequest, Plan, Projection, SortSpec, Value,
};

/// Everything a builder has accumulated. Pure data; no store attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub collection: String,
    pub projected: FieldSet,
    pub wheres: FieldMap<WhereClause>,
    pub betweens: FieldMap<BetweenClause>,
    /// Kept in call order, duplicates included
    pub group_keys: Vec<String>,
    pub sums: FieldSet,
    pub sort: SortSpec,
    pub limit: Option<u64>,
    pub group: bool,
    pub select: bool,
    pub count: bool,
}

/// A plan plus the where-clauses it could not express.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub plan: Plan,
    pub dropped: Vec<DroppedClause>,
}

/// Output field collecting raw values of `key` when no sum is requested.
///
/// Derived from a SHA-256 of the key so arbitrary key text always yields an
/// identifier-safe name.
pub fn collect_output_name(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("items_{:x}", digest)
}

/// Output field of a sum over `field`.
pub fn sum_output_name(field: &str) -> String {
    format!("{}Total", field)
}

impl QueryState {
    pub fn translate(&self) -> Translation {
        if self.group {
            let (request, dropped) = self.group_request();
            return Translation {
                plan: Plan::Group(request),
                dropped,
            };
        }

        if self.select {
            let (filter, dropped) = self.find_filter();
            let collection = self.collection.clone();

            let plan = if self.count {
                Plan::Count(CountRequest { collection, filter })
            } else {
                Plan::Find {
                    request: FindRequest {
                        collection,
                        filter,
                        projection: self.projected.iter().collect(),
                    },
                    options: CursorOptions {
                        sort: self.sort.clone(),
                        limit: self.limit,
                    },
                }
            };
            return Translation { plan, dropped };
        }

        Translation {
            plan: Plan::Nothing,
            dropped: Vec::new(),
        }
    }

    fn group_request(&self) -> (GroupRequest, Vec<DroppedClause>) {
        let mut keys = Projection::new();
        for field in self.projected.iter() {
            keys.include(field);
        }
        for key in &self.group_keys {
            keys.include(key.as_str());
        }

        let accumulators: Vec<Accumulator> = if self.sums.is_empty() {
            self.group_keys
                .iter()
                .map(|key| Accumulator::CollectList {
                    field: key.clone(),
                    output: collect_output_name(key),
                })
                .collect()
        } else {
            self.sums
                .iter()
                .map(|field| Accumulator::Sum {
                    field: field.to_string(),
                    output: sum_output_name(field),
                })
                .collect()
        };

        let initial: Document = accumulators
            .iter()
            .map(|acc| (acc.output().to_string(), acc.initial_value()))
            .collect();

        let (condition, dropped) = self.fold_filter(Branch::Group, |op, value| match op {
            Operator::Eq => Some(Condition::Eq(value.clone())),
            Operator::Gt => Some(Condition::Gt(Value::Int(value.coerce_int()))),
            Operator::Ne => Some(Condition::Ne(Value::Int(value.coerce_int()))),
            Operator::Lt | Operator::Unsupported(_) => None,
        });

        let request = GroupRequest {
            collection: self.collection.clone(),
            keys,
            initial,
            accumulators,
            condition,
        };
        (request, dropped)
    }

    fn find_filter(&self) -> (Filter, Vec<DroppedClause>) {
        self.fold_filter(Branch::Find, |op, value| match op {
            Operator::Eq => Some(Condition::Eq(
                value
                    .as_digit_string_int()
                    .map_or_else(|| value.clone(), Value::Int),
            )),
            _ => None,
        })
    }

    /// Where-clauses through `map`, then ranges on top.
    fn fold_filter<F>(&self, branch: Branch, map: F) -> (Filter, Vec<DroppedClause>)
    where
        F: Fn(&Operator, &Value) -> Option<Condition>,
    {
        let mut filter = Filter::new();
        let mut dropped = Vec::new();

        for (field, clause) in self.wheres.iter() {
            match map(&clause.op, &clause.value) {
                Some(condition) => {
                    filter.insert(field, condition);
                }
                None => dropped.push(DroppedClause {
                    field: field.to_string(),
                    op: clause.op.clone(),
                    branch,
                    reason: DropReason::UnsupportedOperator,
                }),
            }
        }

        for (field, range) in self.betweens.iter() {
            let condition = Condition::Range {
                gte: range.low.clone(),
                lt: range.high.clone(),
            };
            if filter.insert(field, condition).is_some() {
                if let Some(clause) = self.wheres.get(field) {
                    dropped.push(DroppedClause {
                        field: field.to_string(),
                        op: clause.op.clone(),
                        branch,
                        reason: DropReason::ShadowedByRange,
                    });
                }
            }
        }

        (filter, dropped)
    }
}
