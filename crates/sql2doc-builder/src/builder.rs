//! Fluent configuration surface and `execute`

use crate::clause::{BetweenClause, Ignored, Operator, WhereClause};
use crate::date::{DateParser, PermissiveDateParser};
use crate::error::{BuilderError, QueryError};
use crate::store::{Cursor, DocumentStore};
use crate::translate::{QueryState, Translation};
use sql2doc_ir::{GroupedResult, Plan, SortDirection, Value};
use tracing::{debug, info_span};

/// What `execute` produced, by branch.
#[derive(Debug)]
pub enum QueryOutput<C> {
    /// Find without count: lazy, sorted and limited
    Cursor(C),
    Grouped(GroupedResult),
    Count(u64),
    /// Neither `select` nor `group` was called; no request was issued
    Nothing,
}

impl<C> QueryOutput<C> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, QueryOutput::Nothing)
    }

    pub fn into_count(self) -> Option<u64> {
        match self {
            QueryOutput::Count(n) => Some(n),
            _ => None,
        }
    }

    pub fn into_grouped(self) -> Option<GroupedResult> {
        match self {
            QueryOutput::Grouped(g) => Some(g),
            _ => None,
        }
    }

    pub fn into_cursor(self) -> Option<C> {
        match self {
            QueryOutput::Cursor(c) => Some(c),
            _ => None,
        }
    }
}

/// Accumulates SQL-like intent, then issues one document store request.
///
/// Configuration calls never fail: malformed input leaves the state as it
/// was and is recorded in [`QueryBuilder::ignored`].
///
/// ```ignore
/// let output = QueryBuilder::new(&store)?
///     .from_fields("orders", ["category"])
///     .and_where("status", "=", "shipped")
///     .group("category")
///     .sum("amount")
///     .execute()?;
/// ```
pub struct QueryBuilder<'s, S: DocumentStore> {
    store: &'s S,
    dates: Box<dyn DateParser + 's>,
    state: QueryState,
    ignored: Vec<Ignored>,
}

impl<'s, S: DocumentStore> QueryBuilder<'s, S> {
    pub fn new(store: &'s S) -> Result<Self, BuilderError> {
        if !store.is_available() {
            return Err(BuilderError::Configuration(
                "document store handle is not available".to_string(),
            ));
        }

        Ok(Self {
            store,
            dates: Box::new(PermissiveDateParser::new()),
            state: QueryState::default(),
            ignored: Vec::new(),
        })
    }

    /// Replace the date literal classifier used by `and_where` and `between`.
    pub fn with_date_parser(mut self, parser: impl DateParser + 's) -> Self {
        self.dates = Box::new(parser);
        self
    }

    pub fn from(mut self, collection: &str) -> Self {
        if collection.is_empty() {
            self.ignore(Ignored::EmptyField { call: "from" });
        } else {
            self.state.collection = collection.to_string();
        }
        self
    }

    /// `from` plus fields to project (find) or group over (group).
    pub fn from_fields<I, F>(mut self, collection: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self = self.from(collection);
        for field in fields {
            let field = field.into();
            if field.is_empty() {
                self.ignore(Ignored::EmptyField { call: "from" });
            } else {
                self.state.projected.insert(field);
            }
        }
        self
    }

    /// SQL `WHERE field op value`. A later call on the same field replaces
    /// the earlier one.
    pub fn and_where(
        mut self,
        field: &str,
        op: impl Into<Operator>,
        value: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        if field.is_empty() {
            self.ignore(Ignored::EmptyField { call: "where" });
            return self;
        }
        if value.is_null() {
            self.ignore(Ignored::MissingValue {
                field: field.to_string(),
            });
            return self;
        }

        let clause = WhereClause {
            op: op.into(),
            value: self.coerce_date(value),
        };
        if let Some(previous) = self.state.wheres.insert(field, clause) {
            debug!(field, ?previous, "where-clause replaced");
        }
        self
    }

    /// Accepts positive integers only.
    pub fn limit(mut self, n: impl Into<Value>) -> Self {
        match n.into() {
            Value::Int(n) if n >= 1 => self.state.limit = Some(n.unsigned_abs()),
            value => self.ignore(Ignored::InvalidLimit { value }),
        }
        self
    }

    pub fn select(mut self) -> Self {
        self.state.select = true;
        self
    }

    /// Only meaningful together with `select`.
    pub fn count(mut self) -> Self {
        self.state.count = true;
        self
    }

    /// `low <= field < high`. Replaces any earlier range on the field and
    /// wins over a where-clause on it at translation time.
    pub fn between(mut self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        if field.is_empty() {
            self.ignore(Ignored::EmptyField { call: "between" });
            return self;
        }

        let range = BetweenClause {
            low: self.coerce_date(low.into()),
            high: self.coerce_date(high.into()),
        };
        self.state.betweens.insert(field, range);
        self
    }

    /// Turns on grouping. A non-empty `field` is appended to the group keys;
    /// duplicates are kept.
    pub fn group(mut self, field: &str) -> Self {
        self.state.group = true;
        if !field.is_empty() {
            self.state.group_keys.push(field.to_string());
        }
        self
    }

    /// Sort descending on `field`.
    pub fn order(self, field: &str) -> Self {
        self.order_by(field, SortDirection::Descending)
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        if field.is_empty() {
            self.ignore(Ignored::EmptyField { call: "order" });
        } else {
            self.state.sort.insert(field, direction);
        }
        self
    }

    pub fn sum(mut self, field: &str) -> Self {
        if field.is_empty() {
            self.ignore(Ignored::EmptyField { call: "sum" });
        } else {
            self.state.sums.insert(field);
        }
        self
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Configuration calls that were ignored, in call order.
    pub fn ignored(&self) -> &[Ignored] {
        &self.ignored
    }

    /// Translate without touching the store.
    pub fn plan(&self) -> Translation {
        self.state.translate()
    }

    /// Issue the request the current state translates to.
    pub fn execute(&self) -> Result<QueryOutput<S::Cursor>, QueryError> {
        let Translation { plan, dropped } = self.plan();

        let span = info_span!("execute", branch = plan.kind(), collection = %self.state.collection);
        let _enter = span.enter();

        for clause in &dropped {
            debug!(
                field = %clause.field,
                op = %clause.op,
                reason = ?clause.reason,
                "predicate left out of filter"
            );
        }

        if matches!(plan.collection(), Some("")) {
            return Err(QueryError::MissingCollection);
        }

        if let Ok(fingerprint) = plan.fingerprint() {
            debug!(%fingerprint, "issuing request");
        }

        match plan {
            Plan::Nothing => Ok(QueryOutput::Nothing),
            Plan::Group(request) => Ok(QueryOutput::Grouped(self.store.group(&request)?)),
            Plan::Count(request) => Ok(QueryOutput::Count(self.store.count(&request)?)),
            Plan::Find { request, options } => {
                let mut cursor = self.store.find(&request)?;
                cursor.sort(&options.sort);
                if let Some(n) = options.limit {
                    cursor.limit(n);
                }
                Ok(QueryOutput::Cursor(cursor))
            }
        }
    }

    fn coerce_date(&self, value: Value) -> Value {
        match value.as_str().and_then(|s| self.dates.parse(s)) {
            Some(secs) => Value::Date(secs),
            None => value,
        }
    }

    fn ignore(&mut self, ignored: Ignored) {
        debug!(?ignored, "configuration call ignored");
        self.ignored.push(ignored);
    }
}
