//! QueryBuilder → MemStore, over a small orders collection

use serde_json::{json, Value as Json};
use sql2doc_builder::ir::{Document, SortDirection};
use sql2doc_builder::{collect_output_name, BuilderError, Cursor, DocumentStore, QueryBuilder};
use sql2doc_memstore::MemStore;
use std::io::Cursor as Input;

const ORDERS: &str = r#"
{"_id": 1, "category": "books", "amount": 12, "qty": "3", "status": "shipped", "created": 1578000000}
{"_id": 2, "category": "games", "amount": 40, "qty": "1", "status": "pending", "created": 1579000000}
{"_id": 3, "category": "books", "amount": 8, "qty": "30", "status": "shipped", "created": 1581000000}
{"_id": 4, "category": "music", "amount": 15, "qty": 30, "status": "shipped", "created": 1577000000}
{"_id": 5, "category": "games", "amount": 25, "qty": "7", "status": "shipped", "created": 1578500000}
"#;

fn store() -> MemStore {
    let mut store = MemStore::new();
    store
        .load_json_lines("orders", Input::new(ORDERS))
        .unwrap();
    store
}

fn ids(docs: &[Document]) -> Vec<i64> {
    docs.iter().filter_map(|d| d.get("_id").and_then(Json::as_i64)).collect()
}

#[test]
fn test_select_sorted_and_limited() {
    let store = store();
    let cursor = QueryBuilder::new(&store)
        .unwrap()
        .from_fields("orders", ["amount"])
        .select()
        .and_where("status", "=", "shipped")
        .order_by("amount", SortDirection::Ascending)
        .limit(2)
        .execute()
        .unwrap()
        .into_cursor()
        .unwrap();

    let docs: Vec<Document> = cursor.collect::<Result<_, _>>().unwrap();
    assert_eq!(ids(&docs), vec![3, 1]);
    assert_eq!(docs[0], Document::from_iter([
        ("_id".to_string(), json!(3)),
        ("amount".to_string(), json!(8)),
    ]));
}

#[test]
fn test_default_order_is_descending() {
    let store = store();
    let cursor = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .select()
        .order("amount")
        .execute()
        .unwrap()
        .into_cursor()
        .unwrap();

    let docs: Vec<Document> = cursor.collect::<Result<_, _>>().unwrap();
    assert_eq!(ids(&docs), vec![2, 5, 4, 1, 3]);
}

#[test]
fn test_digit_string_equality_only_coerced_in_find() {
    let store = store();

    // find: "30" becomes 30 and only the numeric qty matches
    let count = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .select()
        .count()
        .and_where("qty", "=", "30")
        .execute()
        .unwrap()
        .into_count();
    assert_eq!(count, Some(1));

    // group: "30" is passed through and only the string qty matches
    let grouped = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .group("category")
        .and_where("qty", "=", "30")
        .execute()
        .unwrap()
        .into_grouped()
        .unwrap();
    assert_eq!(grouped.count, 1);
    assert_eq!(grouped.retval[0]["category"], json!("books"));
}

#[test]
fn test_between_dates_against_epoch_fields() {
    let store = store();
    let count = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .select()
        .count()
        .between("created", "2020-01-01", "2020-02-01")
        .execute()
        .unwrap()
        .into_count();
    // 1577836800 <= created < 1580515200
    assert_eq!(count, Some(3));
}

#[test]
fn test_group_sum_with_condition() {
    let store = store();
    let grouped = QueryBuilder::new(&store)
        .unwrap()
        .from_fields("orders", ["category"])
        .group("category")
        .sum("amount")
        .and_where("status", "!=", "pending")
        .and_where("amount", ">", "9")
        .execute()
        .unwrap()
        .into_grouped()
        .unwrap();

    // "!=" coerces "pending" to 0, so no document is excluded by it
    assert_eq!(
        Json::from(grouped.retval),
        json!([
            {"category": "books", "amountTotal": 12},
            {"category": "games", "amountTotal": 65},
            {"category": "music", "amountTotal": 15},
        ])
    );
    assert_eq!(grouped.count, 4);
    assert_eq!(grouped.keys, 3);
}

#[test]
fn test_group_collects_key_values() {
    let store = store();
    let grouped = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .group("category")
        .and_where("status", "=", "shipped")
        .execute()
        .unwrap()
        .into_grouped()
        .unwrap();

    let items = collect_output_name("category");
    assert_eq!(grouped.retval[0]["category"], json!("books"));
    assert_eq!(grouped.retval[0][&items], json!(["books", "books"]));
    assert_eq!(grouped.retval.len(), 3);
}

#[test]
fn test_lt_is_dropped_in_group() {
    let store = store();
    let grouped = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .group("category")
        .sum("amount")
        .and_where("amount", "<", "10")
        .execute()
        .unwrap()
        .into_grouped()
        .unwrap();
    assert_eq!(grouped.count, 5);
}

#[test]
fn test_cursor_is_lazy_until_iterated() {
    let store = store();
    let mut cursor = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .select()
        .execute()
        .unwrap()
        .into_cursor()
        .unwrap();

    assert!(!cursor.is_started());
    cursor.limit(1);
    let first = cursor.next().unwrap().unwrap();
    assert_eq!(first["_id"], json!(1));
    assert!(cursor.is_started());

    // too late to widen the result
    cursor.limit(10);
    assert!(cursor.next().is_none());
}

#[test]
fn test_closed_store_rejects_builder() {
    let mut store = store();
    store.close();
    assert!(!store.is_available());
    assert!(matches!(
        QueryBuilder::new(&store),
        Err(BuilderError::Configuration(_))
    ));
}

#[test]
fn test_grouping_agrees_with_numeric_equality() {
    let mut store = MemStore::new();
    store
        .load_json_lines("t", Input::new("{\"k\": 1, \"a\": 2}\n{\"k\": 1.0, \"a\": 3}\n"))
        .unwrap();

    let matched = QueryBuilder::new(&store)
        .unwrap()
        .from("t")
        .select()
        .count()
        .and_where("k", "=", 1)
        .execute()
        .unwrap()
        .into_count();
    assert_eq!(matched, Some(2));

    let grouped = QueryBuilder::new(&store)
        .unwrap()
        .from("t")
        .group("k")
        .sum("a")
        .execute()
        .unwrap()
        .into_grouped()
        .unwrap();
    assert_eq!(grouped.keys, 1);
    assert_eq!(grouped.retval[0]["aTotal"], json!(5));
}
