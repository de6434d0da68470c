//! Lazy cursor over an in-memory collection

use crate::eval;
use sql2doc_builder::{Cursor, StoreError};
use sql2doc_ir::{Document, Filter, Projection, SortSpec};
use std::sync::Arc;
use tracing::{trace, warn};

/// Nothing is evaluated until the first `next`; `sort` and `limit` only
/// take effect before that.
#[derive(Debug)]
pub struct MemCursor {
    state: CursorState,
}

#[derive(Debug)]
enum CursorState {
    Pending {
        docs: Arc<Vec<Document>>,
        filter: Filter,
        projection: Projection,
        sort: SortSpec,
        limit: Option<u64>,
    },
    Open(std::vec::IntoIter<Document>),
}

impl MemCursor {
    pub(crate) fn new(docs: Arc<Vec<Document>>, filter: Filter, projection: Projection) -> Self {
        Self {
            state: CursorState::Pending {
                docs,
                filter,
                projection,
                sort: SortSpec::new(),
                limit: None,
            },
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, CursorState::Open(_))
    }

    /// Evaluate the pending request; `None` once the cursor is open.
    fn materialize(&self) -> Option<Vec<Document>> {
        let CursorState::Pending {
            docs,
            filter,
            projection,
            sort,
            limit,
        } = &self.state
        else {
            return None;
        };

        let mut matched: Vec<&Document> =
            docs.iter().filter(|doc| eval::matches(doc, filter)).collect();

        if !sort.is_empty() {
            matched.sort_by(|a, b| eval::compare_docs(a, b, sort));
        }

        let limit = limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let results: Vec<Document> = matched
            .into_iter()
            .take(limit)
            .map(|doc| eval::project(doc, projection))
            .collect();

        trace!(results = results.len(), "cursor opened");
        Some(results)
    }
}

impl Iterator for MemCursor {
    type Item = Result<Document, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(results) = self.materialize() {
            self.state = CursorState::Open(results.into_iter());
        }

        match &mut self.state {
            CursorState::Open(iter) => iter.next().map(Ok),
            CursorState::Pending { .. } => None,
        }
    }
}

impl Cursor for MemCursor {
    fn sort(&mut self, spec: &SortSpec) -> &mut Self {
        match &mut self.state {
            CursorState::Pending { sort, .. } => *sort = spec.clone(),
            CursorState::Open(_) => warn!("cursor already iterated; sort ignored"),
        }
        self
    }

    fn limit(&mut self, n: u64) -> &mut Self {
        match &mut self.state {
            CursorState::Pending { limit, .. } => *limit = Some(n),
            CursorState::Open(_) => warn!("cursor already iterated; limit ignored"),
        }
        self
    }
}
