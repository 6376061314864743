//! Query result types.
//!
//! A query resolves only identities plus the declared column projection;
//! callers follow up through the batched fetcher for full field data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a work item as returned by a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItemRef {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Result of a WIQL or saved-query execution.
///
/// An empty `work_items` list means the query ran and matched nothing, which
/// is distinct from the query itself being missing (`NotFound`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResult {
    /// Matched identities, in the order the store returned them.
    pub work_items: Vec<WorkItemRef>,

    /// Field reference names the originating query declared in its SELECT
    /// clause.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl QueryResult {
    /// The matched ids, in result order.
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.work_items.iter().map(|r| r.id).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.work_items.is_empty()
    }
}

/// A saved query on the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredQuery {
    pub id: Uuid,
    pub name: String,
    /// The query text executed when the saved query is run.
    pub wiql: String,
}
