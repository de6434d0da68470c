//! Builder → request → store dispatch, against a store that records calls

use serde_json::json;
use sql2doc_builder::ir::{
    Accumulator, Condition, CountRequest, Document, FindRequest, GroupRequest, GroupedResult,
    SortDirection, SortSpec, Value,
};
use sql2doc_builder::{
    collect_output_name, Branch, BuilderError, Cursor, DocumentStore, DropReason, Ignored,
    NeverDates, PermissiveDateParser, QueryBuilder, QueryError, QueryOutput, StoreError,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Find(FindRequest),
    Count(CountRequest),
    Group(GroupRequest),
    Sort(SortSpec),
    Limit(u64),
}

type Log = Rc<RefCell<Vec<Call>>>;

struct RecordingStore {
    log: Log,
    available: bool,
    docs: Vec<Document>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            available: true,
            docs: Vec::new(),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

struct RecordingCursor {
    log: Log,
    docs: std::vec::IntoIter<Document>,
}

impl Iterator for RecordingCursor {
    type Item = Result<Document, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.docs.next().map(Ok)
    }
}

impl Cursor for RecordingCursor {
    fn sort(&mut self, spec: &SortSpec) -> &mut Self {
        self.log.borrow_mut().push(Call::Sort(spec.clone()));
        self
    }

    fn limit(&mut self, n: u64) -> &mut Self {
        self.log.borrow_mut().push(Call::Limit(n));
        self
    }
}

impl DocumentStore for RecordingStore {
    type Cursor = RecordingCursor;

    fn is_available(&self) -> bool {
        self.available
    }

    fn find(&self, request: &FindRequest) -> Result<Self::Cursor, StoreError> {
        self.log.borrow_mut().push(Call::Find(request.clone()));
        Ok(RecordingCursor {
            log: Rc::clone(&self.log),
            docs: self.docs.clone().into_iter(),
        })
    }

    fn count(&self, request: &CountRequest) -> Result<u64, StoreError> {
        self.log.borrow_mut().push(Call::Count(request.clone()));
        Ok(7)
    }

    fn group(&self, request: &GroupRequest) -> Result<GroupedResult, StoreError> {
        self.log.borrow_mut().push(Call::Group(request.clone()));
        Ok(GroupedResult::default())
    }
}

struct FailingStore;

impl DocumentStore for FailingStore {
    type Cursor = RecordingCursor;

    fn find(&self, _request: &FindRequest) -> Result<Self::Cursor, StoreError> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    fn count(&self, _request: &CountRequest) -> Result<u64, StoreError> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    fn group(&self, _request: &GroupRequest) -> Result<GroupedResult, StoreError> {
        Err(StoreError::Backend("connection reset".to_string()))
    }
}

const JAN_1_2020: i64 = 1_577_836_800;
const FEB_1_2020: i64 = 1_580_515_200;

#[test]
fn test_unavailable_store_is_a_configuration_error() {
    let mut store = RecordingStore::new();
    store.available = false;

    let result = QueryBuilder::new(&store);
    assert!(matches!(result, Err(BuilderError::Configuration(_))));
}

#[test]
fn test_no_branch_issues_no_request() {
    let store = RecordingStore::new();
    let output = QueryBuilder::new(&store)
        .unwrap()
        .from("users")
        .and_where("age", "=", "30")
        .count()
        .limit(3)
        .execute()
        .unwrap();

    assert!(output.is_nothing());
    assert!(store.calls().is_empty());
}

#[test]
fn test_between_dates_in_find_mode() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .from("events")
        .select()
        .between("created", "2020-01-01", "2020-02-01")
        .execute()
        .unwrap();

    let Call::Find(request) = &store.calls()[0] else {
        panic!("expected find");
    };
    assert_eq!(
        request.filter.get("created"),
        Some(&Condition::Range {
            gte: Value::Date(JAN_1_2020),
            lt: Value::Date(FEB_1_2020),
        })
    );
}

#[test]
fn test_injected_parser_keeps_literals() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .with_date_parser(NeverDates)
        .from("events")
        .select()
        .between("created", "2020-01-01", 5)
        .execute()
        .unwrap();

    let Call::Find(request) = &store.calls()[0] else {
        panic!("expected find");
    };
    assert_eq!(
        request.filter.get("created"),
        Some(&Condition::Range {
            gte: Value::from("2020-01-01"),
            lt: Value::Int(5),
        })
    );
}

#[test]
fn test_second_where_on_field_wins() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .from("users")
        .select()
        .and_where("name", "=", "alice")
        .and_where("name", "=", "bob")
        .execute()
        .unwrap();

    let Call::Find(request) = &store.calls()[0] else {
        panic!("expected find");
    };
    assert_eq!(request.filter.len(), 1);
    assert_eq!(request.filter.get("name"), Some(&Condition::Eq(Value::from("bob"))));
}

#[test]
fn test_where_date_literal_is_coerced() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .from("events")
        .select()
        .and_where("day", "=", "2020-01-01")
        .execute()
        .unwrap();

    let Call::Find(request) = &store.calls()[0] else {
        panic!("expected find");
    };
    assert_eq!(request.filter.get("day"), Some(&Condition::Eq(Value::Date(JAN_1_2020))));
}

#[test]
fn test_group_collects_values_per_key() {
    let store = RecordingStore::new();
    let output = QueryBuilder::new(&store)
        .unwrap()
        .from_fields("t", ["category"])
        .group("category")
        .execute()
        .unwrap();
    assert!(output.into_grouped().is_some());

    let Call::Group(request) = &store.calls()[0] else {
        panic!("expected group");
    };
    let items = collect_output_name("category");
    assert_eq!(request.keys.to_json(), json!({"category": 1}));
    assert_eq!(Document::from_iter([(items.clone(), json!([]))]), request.initial);
    assert_eq!(
        request.accumulators,
        vec![Accumulator::CollectList {
            field: "category".to_string(),
            output: items,
        }]
    );
}

#[test]
fn test_group_with_sum_has_no_collect_fields() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .from_fields("t", ["category"])
        .group("category")
        .sum("amount")
        .sum("amount")
        .order("amount")
        .limit(2)
        .execute()
        .unwrap();

    let calls = store.calls();
    assert_eq!(calls.len(), 1, "group results are never sorted or limited");
    let Call::Group(request) = &calls[0] else {
        panic!("expected group");
    };
    assert_eq!(request.initial, Document::from_iter([("amountTotal".to_string(), json!(0))]));
    assert!(!request.initial.contains_key(&collect_output_name("category")));
    assert_eq!(
        request.accumulators,
        vec![Accumulator::Sum {
            field: "amount".to_string(),
            output: "amountTotal".to_string(),
        }]
    );
}

#[test]
fn test_unsupported_find_operator_sorted_and_limited() {
    let store = RecordingStore::new();
    let builder = QueryBuilder::new(&store)
        .unwrap()
        .from("users")
        .select()
        .and_where("age", ">", "30")
        .order_by("age", SortDirection::Ascending)
        .limit(5);

    assert_eq!(builder.plan().dropped.len(), 1);
    let output = builder.execute().unwrap();
    assert!(output.into_cursor().is_some());

    let calls = store.calls();
    let Call::Find(request) = &calls[0] else {
        panic!("expected find");
    };
    assert!(request.filter.is_empty());

    let mut sort = SortSpec::new();
    sort.insert("age", SortDirection::Ascending);
    assert_eq!(calls[1], Call::Sort(sort));
    assert_eq!(calls[2], Call::Limit(5));
}

#[test]
fn test_empty_sort_still_applied_without_limit() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .from("users")
        .select()
        .execute()
        .unwrap();

    assert_eq!(&store.calls()[1..], &[Call::Sort(SortSpec::new())]);
}

#[test]
fn test_count_bypasses_sort_and_limit() {
    let store = RecordingStore::new();
    let output = QueryBuilder::new(&store)
        .unwrap()
        .from_fields("users", ["name"])
        .select()
        .count()
        .and_where("age", "=", "30")
        .order("age")
        .limit(5)
        .execute()
        .unwrap();

    assert_eq!(output.into_count(), Some(7));
    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    let Call::Count(request) = &calls[0] else {
        panic!("expected count");
    };
    assert_eq!(request.filter.get("age"), Some(&Condition::Eq(Value::Int(30))));
}

#[test]
fn test_ignored_calls_are_recorded() {
    let store = RecordingStore::new();
    let builder = QueryBuilder::new(&store)
        .unwrap()
        .from("users")
        .limit(2.5)
        .limit(0)
        .and_where("", "=", 1)
        .and_where("age", "=", None::<i64>)
        .sum("")
        .order("");

    assert_eq!(builder.state().limit, None);
    assert!(builder.state().wheres.is_empty());
    assert_eq!(
        builder.ignored(),
        &[
            Ignored::InvalidLimit { value: Value::Float(2.5) },
            Ignored::InvalidLimit { value: Value::Int(0) },
            Ignored::EmptyField { call: "where" },
            Ignored::MissingValue { field: "age".to_string() },
            Ignored::EmptyField { call: "sum" },
            Ignored::EmptyField { call: "order" },
        ]
    );
}

#[test]
fn test_missing_collection() {
    let store = RecordingStore::new();
    let result = QueryBuilder::new(&store).unwrap().select().execute();
    assert!(matches!(result, Err(QueryError::MissingCollection)));
    assert!(store.calls().is_empty());
}

#[test]
fn test_store_errors_propagate() {
    let store = FailingStore;
    let result = QueryBuilder::new(&store).unwrap().from("t").group("k").execute();
    assert!(matches!(result, Err(QueryError::Store(StoreError::Backend(_)))));
}

#[test]
fn test_cursor_yields_documents() {
    let mut store = RecordingStore::new();
    let doc = Document::from_iter([("name".to_string(), json!("alice"))]);
    store.docs.push(doc.clone());

    let output = QueryBuilder::new(&store)
        .unwrap()
        .from("users")
        .select()
        .execute()
        .unwrap();

    let QueryOutput::Cursor(cursor) = output else {
        panic!("expected cursor");
    };
    let docs: Vec<Document> = cursor.collect::<Result<_, _>>().unwrap();
    assert_eq!(docs, vec![doc]);
}

#[test]
fn test_relative_range_resolves_against_anchor() {
    let store = RecordingStore::new();
    let now = chrono::DateTime::from_timestamp(FEB_1_2020, 0).unwrap();
    QueryBuilder::new(&store)
        .unwrap()
        .with_date_parser(PermissiveDateParser::new().anchored_at(now))
        .from("events")
        .select()
        .between("created", "-7 days", "now")
        .execute()
        .unwrap();

    let Call::Find(request) = &store.calls()[0] else {
        panic!("expected find");
    };
    assert_eq!(
        request.filter.get("created"),
        Some(&Condition::Range {
            gte: Value::Date(FEB_1_2020 - 7 * 86_400),
            lt: Value::Date(FEB_1_2020),
        })
    );
}

#[test]
fn test_second_between_on_field_wins() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .from("events")
        .select()
        .between("created", 1, 5)
        .between("created", 10, 20)
        .execute()
        .unwrap();

    let Call::Find(request) = &store.calls()[0] else {
        panic!("expected find");
    };
    assert_eq!(request.filter.len(), 1);
    assert_eq!(
        request.filter.get("created"),
        Some(&Condition::Range {
            gte: Value::Int(10),
            lt: Value::Int(20),
        })
    );
}

#[test]
fn test_second_order_on_field_wins() {
    let store = RecordingStore::new();
    QueryBuilder::new(&store)
        .unwrap()
        .from("users")
        .select()
        .order("age")
        .order_by("age", SortDirection::Ascending)
        .execute()
        .unwrap();

    let mut sort = SortSpec::new();
    sort.insert("age", SortDirection::Ascending);
    assert_eq!(store.calls()[1], Call::Sort(sort));
}

#[test]
fn test_range_shadows_where_in_group_mode() {
    let store = RecordingStore::new();
    let builder = QueryBuilder::new(&store)
        .unwrap()
        .from("orders")
        .group("category")
        .and_where("amount", ">", "9")
        .between("amount", 10, 20);

    let dropped = builder.plan().dropped;
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].field, "amount");
    assert_eq!(dropped[0].branch, Branch::Group);
    assert_eq!(dropped[0].reason, DropReason::ShadowedByRange);

    builder.execute().unwrap();
    let Call::Group(request) = &store.calls()[0] else {
        panic!("expected group");
    };
    assert_eq!(
        request.condition.get("amount"),
        Some(&Condition::Range {
            gte: Value::Int(10),
            lt: Value::Int(20),
        })
    );
}
