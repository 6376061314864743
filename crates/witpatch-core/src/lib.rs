//! witpatch-core: Domain models and patch documents for work item tracking.
//!
//! This crate provides:
//! - `WorkItem` / `Relation`: transient snapshots of remote work items
//! - `PatchBuilder` / `PatchDocument`: ordered partial-update documents
//! - `WorkItemStore`: the contract a transport backend implements
//! - `ClientError`: the classified error taxonomy shared by all operations

pub mod error;
pub mod item;
pub mod patch;
pub mod query;
pub mod store;

pub use error::{ClientError, Result};
pub use item::{Relation, RelationAttributes, RelationDelta, WorkItem, fields, relation_delta, rels};
pub use patch::{Op, PatchBuilder, PatchDocument, PatchOperation};
pub use query::{QueryResult, StoredQuery, WorkItemRef};
pub use store::{
    AttachmentReference, MAX_IDS_PER_CALL, WorkItemStore, WorkItemType, WorkItemTypeCategory,
    WorkItemTypeField,
};
