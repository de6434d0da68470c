//! In-memory document store
//!
//! Holds named collections of JSON documents and serves the three request
//! shapes directly: finds through a lazy [`MemCursor`], counts, and grouped
//! aggregation folded from the declarative accumulators.

use serde_json::Value as Json;
use sql2doc_builder::{DocumentStore, StoreError};
use sql2doc_ir::{CountRequest, Document, FindRequest, GroupRequest, GroupedResult};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

mod cursor;
mod eval;
mod group;

pub use cursor::MemCursor;

#[derive(Debug, Error)]
pub enum MemStoreError {
    #[error("Failed to read documents: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line} is not a JSON object")]
    NotAnObject { line: usize },
}

#[derive(Debug, Default)]
pub struct MemStore {
    collections: HashMap<String, Arc<Vec<Document>>>,
    closed: bool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, doc: Document) {
        let docs = self.collections.entry(collection.to_string()).or_default();
        Arc::make_mut(docs).push(doc);
    }

    pub fn insert_many<I>(&mut self, collection: &str, docs: I)
    where
        I: IntoIterator<Item = Document>,
    {
        let entry = self.collections.entry(collection.to_string()).or_default();
        Arc::make_mut(entry).extend(docs);
    }

    /// Append one JSON object per non-blank line. Returns the number loaded.
    pub fn load_json_lines<R: BufRead>(
        &mut self,
        collection: &str,
        reader: R,
    ) -> Result<usize, MemStoreError> {
        let mut docs = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Json = serde_json::from_str(&line)
                .map_err(|source| MemStoreError::Json { line: i + 1, source })?;
            match value {
                Json::Object(doc) => docs.push(doc),
                _ => return Err(MemStoreError::NotAnObject { line: i + 1 }),
            }
        }

        let loaded = docs.len();
        self.insert_many(collection, docs);
        debug!(collection, loaded, "loaded documents");
        Ok(loaded)
    }

    pub fn load_file<P: AsRef<Path>>(
        &mut self,
        collection: &str,
        path: P,
    ) -> Result<usize, MemStoreError> {
        let file = std::fs::File::open(path.as_ref())?;
        let loaded = self.load_json_lines(collection, std::io::BufReader::new(file))?;
        info!(collection, path = %path.as_ref().display(), loaded, "collection loaded");
        Ok(loaded)
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |docs| docs.len())
    }

    /// After closing, builders refuse to be constructed on this store.
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn docs(&self, collection: &str) -> Arc<Vec<Document>> {
        self.collections.get(collection).cloned().unwrap_or_default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        Ok(())
    }
}

impl DocumentStore for MemStore {
    type Cursor = MemCursor;

    fn is_available(&self) -> bool {
        !self.closed
    }

    fn find(&self, request: &FindRequest) -> Result<Self::Cursor, StoreError> {
        self.ensure_open()?;
        Ok(MemCursor::new(
            self.docs(&request.collection),
            request.filter.clone(),
            request.projection.clone(),
        ))
    }

    fn count(&self, request: &CountRequest) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let docs = self.docs(&request.collection);
        Ok(docs.iter().filter(|doc| eval::matches(doc, &request.filter)).count() as u64)
    }

    fn group(&self, request: &GroupRequest) -> Result<GroupedResult, StoreError> {
        self.ensure_open()?;
        Ok(group::group(&self.docs(&request.collection), request))
    }
}
