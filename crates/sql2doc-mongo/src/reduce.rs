//! Compiles accumulator descriptions into a `$reduce` function
//!
//! Every property access is bracket notation over a JSON string literal,
//! so field names reach the script as data and never as code.

use sql2doc_ir::Accumulator;

pub fn compile_reduce(accumulators: &[Accumulator]) -> String {
    let mut body = String::from("function(curr, result) {");
    for acc in accumulators {
        let field = js_string(acc.field());
        let output = js_string(acc.output());
        match acc {
            Accumulator::Sum { .. } => {
                body.push_str(&format!(" result[{}] += curr[{}];", output, field));
            }
            Accumulator::CollectList { .. } => {
                body.push_str(&format!(" result[{}].push(curr[{}]);", output, field));
            }
        }
    }
    body.push_str(" }");
    body
}

fn js_string(s: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    serde_json::Value::from(s).to_string()
}
