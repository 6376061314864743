//! Ad-hoc and saved query execution.

use crate::fetch::BatchedFetcher;
use tracing::debug;
use uuid::Uuid;
use witpatch_core::{QueryResult, Result, WorkItem, WorkItemStore};

/// Runs queries and resolves their id lists into full work items.
///
/// Query execution yields identities plus the declared column projection
/// only; [`QueryExecutor::resolve`] follows up through the batched fetcher,
/// respecting the per-call id cap.
#[derive(Debug)]
pub struct QueryExecutor<'a, S: WorkItemStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: WorkItemStore + ?Sized> QueryExecutor<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Submit query text literally; no client-side parsing or validation.
    ///
    /// # Errors
    /// `QuerySyntax` as reported by the store for malformed text.
    pub fn query_by_text(&self, wiql: &str) -> Result<QueryResult> {
        debug!(wiql, "Running ad-hoc query");
        self.store.query_by_wiql(wiql)
    }

    /// Run a saved query by identifier.
    ///
    /// Zero matches is an empty result, not an error; only a missing saved
    /// query is `NotFound`.
    ///
    /// # Errors
    /// `NotFound` when no saved query has this id.
    pub fn query_by_id(&self, query_id: Uuid) -> Result<QueryResult> {
        debug!(%query_id, "Running saved query");
        self.store.query_by_id(query_id)
    }

    /// Resolve a query result into full work items, optionally projected to
    /// `fields`. An empty result skips the fetch step entirely.
    ///
    /// # Errors
    /// `PartialBatchFailure` from the underlying chunked fetch.
    pub fn resolve(&self, result: &QueryResult, fields: Option<&[String]>) -> Result<Vec<WorkItem>> {
        if result.is_empty() {
            debug!("Query matched nothing; skipping fetch");
            return Ok(Vec::new());
        }
        BatchedFetcher::new(self.store).fetch(&result.ids(), fields)
    }
}
