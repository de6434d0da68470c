//! The document store collaborator
//!
//! The builder owns no connection. It borrows a [`DocumentStore`] for the
//! duration of `execute` and issues exactly one request through it.

use crate::error::StoreError;
use sql2doc_ir::{CountRequest, Document, FindRequest, GroupRequest, GroupedResult, SortSpec};

/// Lazy, once-iterable result of a find request.
///
/// `sort` and `limit` shape the request before the first document is
/// fetched.
pub trait Cursor: Iterator<Item = Result<Document, StoreError>> {
    fn sort(&mut self, spec: &SortSpec) -> &mut Self;

    fn limit(&mut self, n: u64) -> &mut Self;
}

pub trait DocumentStore {
    type Cursor: Cursor;

    /// Whether the handle can serve requests at all. Checked once when a
    /// builder is constructed.
    fn is_available(&self) -> bool {
        true
    }

    fn find(&self, request: &FindRequest) -> Result<Self::Cursor, StoreError>;

    fn count(&self, request: &CountRequest) -> Result<u64, StoreError>;

    fn group(&self, request: &GroupRequest) -> Result<GroupedResult, StoreError>;
}
