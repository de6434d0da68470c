//! sql2doc query builder
//!
//! Accumulates SQL-like intent (`select`, `where`, `between`, `group`,
//! `order`, `limit`, `count`, `sum`) and translates it into exactly one
//! document store request: a filtered and projected find, a count, or a
//! grouped aggregation with a declarative accumulator.

mod builder;
mod clause;
mod date;
mod error;
mod store;
mod translate;

pub use builder::{QueryBuilder, QueryOutput};
pub use clause::{
    BetweenClause, Branch, DropReason, DroppedClause, Ignored, Operator, WhereClause,
};
pub use date::{DateParser, NeverDates, PermissiveDateParser};
pub use error::{BuilderError, QueryError, StoreError};
pub use store::{Cursor, DocumentStore};
pub use translate::{collect_output_name, sum_output_name, QueryState, Translation};

pub use sql2doc_ir as ir;
