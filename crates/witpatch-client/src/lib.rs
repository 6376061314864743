//! witpatch-client: The stateless work item mutation and query engine.
//!
//! Three components sit over any [`witpatch_core::WorkItemStore`]:
//! - [`BatchedFetcher`]: id-list retrieval chunked at the store's per-call cap
//! - [`MutationEngine`]: patch document submission, committing or validate-only
//! - [`QueryExecutor`]: ad-hoc and saved queries plus result resolution
//!
//! Every operation is an independent, uncached, blocking call; the engine
//! holds no state beyond a borrow of the store.

pub mod engine;
pub mod fetch;
pub mod query;

pub use engine::{MutationEngine, SubmitMode};
pub use fetch::BatchedFetcher;
pub use query::QueryExecutor;
