//! Grouped aggregation evaluated straight from accumulator descriptions

use crate::eval::{self, KeyPart};
use serde_json::Value as Json;
use sql2doc_ir::{Accumulator, Document, GroupRequest, GroupedResult};
use std::collections::HashMap;
use tracing::trace;

static NULL: Json = Json::Null;

pub fn group(docs: &[Document], request: &GroupRequest) -> GroupedResult {
    let mut groups: Vec<Document> = Vec::new();
    let mut index: HashMap<Vec<KeyPart>, usize> = HashMap::new();
    let mut folded = 0u64;

    for doc in docs.iter().filter(|doc| eval::matches(doc, &request.condition)) {
        let key: Vec<&Json> = request
            .keys
            .fields()
            .map(|field| doc.get(field).unwrap_or(&NULL))
            .collect();
        let identity: Vec<KeyPart> = key.iter().map(|v| eval::key_part(v)).collect();

        let slot = *index.entry(identity).or_insert_with(|| {
            let mut state: Document = request
                .keys
                .fields()
                .zip(&key)
                .map(|(field, value)| (field.to_string(), (*value).clone()))
                .collect();
            for (output, initial) in &request.initial {
                state.insert(output.clone(), initial.clone());
            }
            groups.push(state);
            groups.len() - 1
        });

        for acc in &request.accumulators {
            fold(&mut groups[slot], acc, doc);
        }
        folded += 1;
    }

    trace!(groups = groups.len(), folded, "grouped");
    GroupedResult {
        keys: groups.len() as u64,
        retval: groups,
        count: folded,
    }
}

fn fold(state: &mut Document, acc: &Accumulator, doc: &Document) {
    let current = doc.get(acc.field());
    match acc {
        Accumulator::Sum { output, .. } => {
            let total = state.entry(output.clone()).or_insert_with(|| Json::from(0));
            match current {
                Some(Json::Number(n)) => *total = add(total, n),
                other => trace!(field = acc.field(), ?other, "non-numeric value skipped in sum"),
            }
        }
        Accumulator::CollectList { output, .. } => {
            let list = state
                .entry(output.clone())
                .or_insert_with(|| Json::Array(Vec::new()));
            if let Json::Array(items) = list {
                items.push(current.cloned().unwrap_or(Json::Null));
            }
        }
    }
}

/// Integers stay integers until overflow or a float shows up.
fn add(total: &Json, n: &serde_json::Number) -> Json {
    if let (Some(a), Some(b)) = (total.as_i64(), n.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Json::from(sum);
        }
    }

    let a = total.as_f64().unwrap_or(0.0);
    let b = n.as_f64().unwrap_or(0.0);
    Json::from(a + b)
}
