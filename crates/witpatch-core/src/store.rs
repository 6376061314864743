//! The store contract: what a work item backend must expose.
//!
//! Transport and authentication live behind this trait; the engine only
//! needs classified results. Every call is an independent, blocking
//! request/response round trip with no shared connection-level state, so a
//! store may be used concurrently from multiple logical callers.

use crate::error::{ClientError, Result};
use crate::item::WorkItem;
use crate::patch::PatchDocument;
use crate::query::{QueryResult, StoredQuery};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard per-call cardinality limit on id-based retrieval.
pub const MAX_IDS_PER_CALL: usize = 200;

/// A work item store reachable behind some transport.
pub trait WorkItemStore {
    /// Create a work item of `work_item_type` in `project` from a patch
    /// document. With `validate_only` the store validates without
    /// persisting and the returned snapshot keeps an unassigned id.
    ///
    /// # Errors
    /// `ValidationFailed` when required fields (notably `System.Title`) are
    /// missing or field content is rejected; `NotFound` for an unknown
    /// project or type.
    fn create_work_item(
        &self,
        project: &str,
        work_item_type: &str,
        document: &PatchDocument,
        validate_only: bool,
    ) -> Result<WorkItem>;

    /// Retrieve work items by id, optionally projected to `fields`.
    ///
    /// A single call must not request more than [`MAX_IDS_PER_CALL`] ids;
    /// result order within the call is whatever the store returns.
    ///
    /// # Errors
    /// `InvalidRequest` when the id list exceeds the cap; `NotFound` when an
    /// id does not exist.
    fn get_work_items(&self, ids: &[u64], fields: Option<&[String]>) -> Result<Vec<WorkItem>>;

    /// Apply a patch document to an existing work item. With `validate_only`
    /// nothing persists and the target's revision is untouched.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; `ValidationFailed` for rejected field
    /// content or a failed `test` precondition.
    fn update_work_item(
        &self,
        id: u64,
        document: &PatchDocument,
        validate_only: bool,
    ) -> Result<WorkItem>;

    /// Run ad-hoc query text. The text is submitted literally; syntax is the
    /// store's to judge.
    ///
    /// # Errors
    /// `QuerySyntax` when the store cannot parse the text.
    fn query_by_wiql(&self, wiql: &str) -> Result<QueryResult>;

    /// Run a saved query by identifier.
    ///
    /// # Errors
    /// `NotFound` when no saved query has this id. Zero matches is an empty
    /// result, not an error.
    fn query_by_id(&self, query_id: Uuid) -> Result<QueryResult>;

    /// List the saved queries of a project.
    fn list_queries(&self, project: &str) -> Result<Vec<StoredQuery>>;

    /// List the work item types a project defines.
    fn get_work_item_types(&self, project: &str) -> Result<Vec<WorkItemType>>;

    /// List the work item type categories of a project.
    fn get_type_categories(&self, project: &str) -> Result<Vec<WorkItemTypeCategory>>;

    /// List the field metadata of one work item type.
    ///
    /// # Errors
    /// `NotFound` for an unknown project or type.
    fn get_work_item_type_fields(
        &self,
        project: &str,
        work_item_type: &str,
    ) -> Result<Vec<WorkItemTypeField>>;

    /// Upload binary content, returning a reference that can be attached to
    /// a work item as an `AttachedFile` relation.
    fn create_attachment(&self, file_name: &str, content: &[u8]) -> Result<AttachmentReference>;

    /// Retrieve a single work item.
    ///
    /// # Errors
    /// `NotFound` when the id does not exist.
    fn get_work_item(&self, id: u64) -> Result<WorkItem> {
        self.get_work_items(&[id], None)?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("work item {id}")))
    }

    /// Look up a single work item type by name.
    ///
    /// # Errors
    /// `NotFound` when the project or the type does not exist.
    fn get_work_item_type(&self, project: &str, name: &str) -> Result<WorkItemType> {
        self.get_work_item_types(project)?
            .into_iter()
            .find(|ty| ty.name == name)
            .ok_or_else(|| {
                ClientError::NotFound(format!("work item type '{name}' in project '{project}'"))
            })
    }

    /// Look up a single type category by name.
    ///
    /// # Errors
    /// `NotFound` when the project or the category does not exist.
    fn get_type_category(&self, project: &str, name: &str) -> Result<WorkItemTypeCategory> {
        self.get_type_categories(project)?
            .into_iter()
            .find(|category| category.name == name)
            .ok_or_else(|| {
                ClientError::NotFound(format!("category '{name}' in project '{project}'"))
            })
    }

    /// Look up a single field of a work item type by reference name.
    ///
    /// # Errors
    /// `NotFound` when the project, the type or the field does not exist.
    fn get_work_item_type_field(
        &self,
        project: &str,
        work_item_type: &str,
        reference_name: &str,
    ) -> Result<WorkItemTypeField> {
        self.get_work_item_type_fields(project, work_item_type)?
            .into_iter()
            .find(|field| field.reference_name == reference_name)
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "field '{reference_name}' on work item type '{work_item_type}'"
                ))
            })
    }
}

/// Work item type metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItemType {
    pub name: String,
    pub reference_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Work item type category metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItemTypeCategory {
    pub name: String,
    pub reference_name: String,
    /// Names of the member types.
    pub work_item_types: Vec<String>,
}

/// Field metadata of a work item type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItemTypeField {
    pub name: String,
    pub reference_name: String,
    /// Whether the store requires the field on every item of the type.
    pub always_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

/// Reference returned by a binary attachment upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentReference {
    pub id: Uuid,
    pub url: String,
}
