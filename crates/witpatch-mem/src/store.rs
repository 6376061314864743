//! In-memory store implementation.

use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;
use witpatch_core::{
    AttachmentReference, ClientError, MAX_IDS_PER_CALL, Op, PatchDocument, QueryResult, Relation,
    Result, StoredQuery, WorkItem, WorkItemRef, WorkItemStore, WorkItemType, WorkItemTypeCategory,
    WorkItemTypeField, fields,
};

/// A single-project work item store held entirely in memory.
///
/// Interior mutability keeps the `WorkItemStore` methods `&self`, matching
/// the remote store's stateless call surface; calls are independently safe
/// from multiple logical callers.
#[derive(Debug)]
pub struct MemoryStore {
    base_url: String,
    project: String,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    items: BTreeMap<u64, WorkItem>,
    next_id: u64,
    queries: Vec<StoredQuery>,
    attachments: HashMap<Uuid, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store for one project, rooted at `base_url` for the
    /// resource URLs it hands out.
    #[must_use]
    pub fn new(base_url: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project: project.into(),
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Register a saved query and return its identifier.
    pub fn register_query(&self, name: impl Into<String>, wiql: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.locked().queries.push(StoredQuery {
            id,
            name: name.into(),
            wiql: wiql.into(),
        });
        id
    }

    /// Number of persisted work items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.locked().items.len()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store state poisoned")
    }

    fn item_url(&self, id: u64) -> String {
        format!("{}/{}/_apis/wit/workItems/{id}", self.base_url, self.project)
    }

    fn check_project(&self, project: &str) -> Result<()> {
        if project == self.project {
            Ok(())
        } else {
            Err(ClientError::NotFound(format!("project '{project}'")))
        }
    }

    fn validate_field(&self, reference: &str, value: &Value) -> Result<()> {
        match reference {
            fields::TITLE => match value.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                _ => Err(ClientError::validation(
                    fields::TITLE,
                    "title must be a non-empty string",
                )),
            },
            fields::AREA_PATH => {
                let path = value.as_str().unwrap_or_default();
                if path == self.project || path.starts_with(&format!("{}\\", self.project)) {
                    Ok(())
                } else {
                    Err(ClientError::validation(
                        fields::AREA_PATH,
                        format!("'{path}' is not a valid area path in project '{}'", self.project),
                    ))
                }
            }
            _ => Ok(()),
        }
    }

    /// Apply a document to a scratch snapshot. Preconditions fail before any
    /// `add` lands, and operations apply left to right.
    fn apply_document(&self, item: &mut WorkItem, document: &PatchDocument) -> Result<()> {
        for op in document.operations() {
            match op.op {
                Op::Test => {
                    if op.path != "/rev" {
                        return Err(ClientError::InvalidRequest(format!(
                            "unsupported test path '{}'",
                            op.path
                        )));
                    }
                    if op.value != Value::from(item.rev) {
                        return Err(ClientError::validation(
                            "rev",
                            format!("expected revision {}, item is at {}", op.value, item.rev),
                        ));
                    }
                }
                Op::Add => {
                    if let Some(reference) = op.path.strip_prefix("/fields/") {
                        self.validate_field(reference, &op.value)?;
                        item.fields.insert(reference.to_string(), op.value.clone());
                    } else if op.path == "/relations/-" {
                        let relation: Relation = serde_json::from_value(op.value.clone())
                            .map_err(|e| {
                                ClientError::validation("relations", format!("malformed relation: {e}"))
                            })?;
                        item.relations.push(relation);
                    } else {
                        return Err(ClientError::InvalidRequest(format!(
                            "unsupported patch path '{}'",
                            op.path
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn known_types() -> Vec<WorkItemType> {
        vec![
            WorkItemType {
                name: "Bug".into(),
                reference_name: "Microsoft.VSTS.WorkItemTypes.Bug".into(),
                description: Some("Describes a divergence from expected behavior".into()),
            },
            WorkItemType {
                name: "Task".into(),
                reference_name: "Microsoft.VSTS.WorkItemTypes.Task".into(),
                description: Some("Tracks a small unit of work".into()),
            },
            WorkItemType {
                name: "User Story".into(),
                reference_name: "Microsoft.VSTS.WorkItemTypes.UserStory".into(),
                description: Some("Tracks user-visible functionality".into()),
            },
        ]
    }

    /// Field metadata shared by every known type.
    fn known_type_fields() -> Vec<WorkItemTypeField> {
        vec![
            WorkItemTypeField {
                name: "Title".into(),
                reference_name: fields::TITLE.into(),
                always_required: true,
                help_text: Some("Short description of the work item".into()),
            },
            WorkItemTypeField {
                name: "State".into(),
                reference_name: fields::STATE.into(),
                always_required: true,
                help_text: Some("Workflow state of the work item".into()),
            },
            WorkItemTypeField {
                name: "Area Path".into(),
                reference_name: fields::AREA_PATH.into(),
                always_required: false,
                help_text: Some("The area of the product this work item belongs to".into()),
            },
            WorkItemTypeField {
                name: "Iteration Path".into(),
                reference_name: "System.IterationPath".into(),
                always_required: false,
                help_text: Some("The iteration the work is scheduled for".into()),
            },
            WorkItemTypeField {
                name: "History".into(),
                reference_name: fields::HISTORY.into(),
                always_required: false,
                help_text: None,
            },
        ]
    }

    fn matches_filter(filter: Option<&str>, item: &WorkItem) -> bool {
        filter.is_none_or(|ty| {
            item.field(fields::WORK_ITEM_TYPE).and_then(Value::as_str) == Some(ty)
        })
    }

    /// Pull the single `[System.WorkItemType] = '...'` literal out of the
    /// query text, when present. Anything more expressive than that is
    /// matched as "all items" here.
    fn extract_type_filter(wiql: &str) -> Option<String> {
        let marker = "[System.WorkItemType] = '";
        let start = wiql.find(marker)? + marker.len();
        let rest = &wiql[start..];
        let end = rest.find('\'')?;
        Some(rest[..end].to_string())
    }

    fn extract_columns(wiql: &str) -> Vec<String> {
        // ASCII lowercasing preserves byte offsets, so positions found here
        // are safe to slice the original text with.
        let lower = wiql.to_ascii_lowercase();
        let Some(select) = lower.find("select") else {
            return Vec::new();
        };
        let Some(from) = lower.find("from") else {
            return Vec::new();
        };
        wiql[select + "select".len()..from]
            .split(',')
            .map(|c| c.trim().trim_start_matches('[').trim_end_matches(']').to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    fn stamp(item: &mut WorkItem, reference: &str) {
        item.fields
            .insert(reference.to_string(), Value::String(Utc::now().to_rfc3339()));
    }
}

impl WorkItemStore for MemoryStore {
    fn create_work_item(
        &self,
        project: &str,
        work_item_type: &str,
        document: &PatchDocument,
        validate_only: bool,
    ) -> Result<WorkItem> {
        self.check_project(project)?;
        if !Self::known_types().iter().any(|t| t.name == work_item_type) {
            return Err(ClientError::NotFound(format!(
                "work item type '{work_item_type}' in project '{project}'"
            )));
        }

        let mut item = WorkItem {
            id: 0,
            rev: 0,
            fields: HashMap::new(),
            relations: Vec::new(),
            url: None,
        };
        self.apply_document(&mut item, document)?;

        if item.title().is_none() {
            return Err(ClientError::validation(
                fields::TITLE,
                "required field 'System.Title' is missing",
            ));
        }

        item.fields.insert(
            fields::WORK_ITEM_TYPE.to_string(),
            Value::String(work_item_type.to_string()),
        );
        item.fields
            .insert(fields::TEAM_PROJECT.to_string(), Value::String(project.to_string()));
        item.fields
            .entry(fields::STATE.to_string())
            .or_insert_with(|| Value::String("New".to_string()));
        Self::stamp(&mut item, fields::CREATED_DATE);
        Self::stamp(&mut item, fields::CHANGED_DATE);

        if validate_only {
            debug!(work_item_type, "Validated create document; nothing persisted");
            return Ok(item);
        }

        let mut inner = self.locked();
        item.id = inner.next_id;
        inner.next_id += 1;
        item.rev = 1;
        item.url = Some(self.item_url(item.id));
        inner.items.insert(item.id, item.clone());

        info!(id = item.id, work_item_type, "Created work item");
        Ok(item)
    }

    fn get_work_items(&self, ids: &[u64], fields: Option<&[String]>) -> Result<Vec<WorkItem>> {
        if ids.len() > MAX_IDS_PER_CALL {
            return Err(ClientError::InvalidRequest(format!(
                "requested {} ids in one call; the limit is {MAX_IDS_PER_CALL}",
                ids.len()
            )));
        }

        let inner = self.locked();
        let mut result = Vec::with_capacity(ids.len());
        for &id in ids {
            let item = inner
                .items
                .get(&id)
                .ok_or_else(|| ClientError::NotFound(format!("work item {id}")))?;

            // A projected read returns only the requested fields and omits
            // the relations collection.
            let item = if let Some(projection) = fields {
                WorkItem {
                    fields: item
                        .fields
                        .iter()
                        .filter(|(k, _)| projection.iter().any(|p| p == *k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                    relations: Vec::new(),
                    ..item.clone()
                }
            } else {
                item.clone()
            };
            result.push(item);
        }
        Ok(result)
    }

    fn update_work_item(
        &self,
        id: u64,
        document: &PatchDocument,
        validate_only: bool,
    ) -> Result<WorkItem> {
        let mut item = {
            let inner = self.locked();
            inner
                .items
                .get(&id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("work item {id}")))?
        };

        self.apply_document(&mut item, document)?;
        Self::stamp(&mut item, fields::CHANGED_DATE);

        if validate_only {
            debug!(id, "Validated update document; revision untouched");
            return Ok(item);
        }

        item.rev += 1;
        self.locked().items.insert(id, item.clone());

        info!(id, rev = item.rev, "Updated work item");
        Ok(item)
    }

    fn query_by_wiql(&self, wiql: &str) -> Result<QueryResult> {
        let trimmed = wiql.trim();
        if !trimmed.to_ascii_lowercase().starts_with("select") {
            return Err(ClientError::QuerySyntax(
                "query text must start with SELECT".to_string(),
            ));
        }

        // Token-wise so that any amount of whitespace (including line
        // breaks) between FROM and WorkItems is accepted.
        let tokens: Vec<String> = trimmed
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        if !tokens.windows(2).any(|w| w[0] == "from" && w[1] == "workitems") {
            return Err(ClientError::QuerySyntax(
                "query text is missing a FROM WorkItems clause".to_string(),
            ));
        }

        let columns = Self::extract_columns(trimmed);
        let filter = Self::extract_type_filter(trimmed);

        let inner = self.locked();
        let work_items = inner
            .items
            .values()
            .filter(|item| Self::matches_filter(filter.as_deref(), item))
            .map(|item| WorkItemRef {
                id: item.id,
                url: item.url.clone(),
            })
            .collect();

        Ok(QueryResult { work_items, columns })
    }

    fn query_by_id(&self, query_id: Uuid) -> Result<QueryResult> {
        let wiql = {
            let inner = self.locked();
            inner
                .queries
                .iter()
                .find(|q| q.id == query_id)
                .map(|q| q.wiql.clone())
                .ok_or_else(|| ClientError::NotFound(format!("saved query {query_id}")))?
        };
        self.query_by_wiql(&wiql)
    }

    fn list_queries(&self, project: &str) -> Result<Vec<StoredQuery>> {
        self.check_project(project)?;
        Ok(self.locked().queries.clone())
    }

    fn get_work_item_types(&self, project: &str) -> Result<Vec<WorkItemType>> {
        self.check_project(project)?;
        Ok(Self::known_types())
    }

    fn get_type_categories(&self, project: &str) -> Result<Vec<WorkItemTypeCategory>> {
        self.check_project(project)?;
        Ok(vec![
            WorkItemTypeCategory {
                name: "Requirement Category".into(),
                reference_name: "Microsoft.RequirementCategory".into(),
                work_item_types: vec!["User Story".into()],
            },
            WorkItemTypeCategory {
                name: "Bug Category".into(),
                reference_name: "Microsoft.BugCategory".into(),
                work_item_types: vec!["Bug".into()],
            },
            WorkItemTypeCategory {
                name: "Task Category".into(),
                reference_name: "Microsoft.TaskCategory".into(),
                work_item_types: vec!["Task".into()],
            },
        ])
    }

    fn get_work_item_type_fields(
        &self,
        project: &str,
        work_item_type: &str,
    ) -> Result<Vec<WorkItemTypeField>> {
        self.check_project(project)?;
        if !Self::known_types().iter().any(|t| t.name == work_item_type) {
            return Err(ClientError::NotFound(format!(
                "work item type '{work_item_type}' in project '{project}'"
            )));
        }
        Ok(Self::known_type_fields())
    }

    fn create_attachment(&self, file_name: &str, content: &[u8]) -> Result<AttachmentReference> {
        let id = Uuid::new_v4();
        let url = format!(
            "{}/_apis/wit/attachments/{id}?fileName={file_name}",
            self.base_url
        );
        self.locked().attachments.insert(id, content.to_vec());

        debug!(%id, file_name, bytes = content.len(), "Stored attachment");
        Ok(AttachmentReference { id, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use witpatch_core::PatchBuilder;

    const PROJECT: &str = "Fabrikam";

    fn store() -> MemoryStore {
        MemoryStore::new("https://dev.example.com/DefaultCollection", PROJECT)
    }

    fn create(store: &MemoryStore, title: &str, ty: &str) -> WorkItem {
        let doc = PatchBuilder::new().add_field(fields::TITLE, title).build().unwrap();
        store.create_work_item(PROJECT, ty, &doc, false).unwrap()
    }

    #[test]
    fn test_ids_are_sequential_and_store_assigned() {
        let store = store();
        let first = create(&store, "First", "Bug");
        let second = create(&store, "Second", "Task");

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.rev, 1);
        assert!(first.url.as_deref().unwrap().ends_with("/workItems/1"));
    }

    #[test]
    fn test_unknown_project_and_type_are_not_found() {
        let store = store();
        let doc = PatchBuilder::new().add_field(fields::TITLE, "x").build().unwrap();

        let err = store.create_work_item("Contoso", "Bug", &doc, false).unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));

        let err = store.create_work_item(PROJECT, "Epic", &doc, false).unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[test]
    fn test_empty_title_is_rejected() {
        let store = store();
        let doc = PatchBuilder::new().add_field(fields::TITLE, "   ").build().unwrap();

        let err = store.create_work_item(PROJECT, "Bug", &doc, false).unwrap_err();
        assert!(matches!(err, ClientError::ValidationFailed { .. }));
    }

    #[test]
    fn test_area_path_must_belong_to_project() {
        let store = store();
        let item = create(&store, "Target", "Bug");

        let bad = PatchBuilder::new()
            .add_field(fields::AREA_PATH, "Invalid area path")
            .build()
            .unwrap();
        let err = store.update_work_item(item.id, &bad, true).unwrap_err();
        match err {
            ClientError::ValidationFailed { field, .. } => assert_eq!(field, fields::AREA_PATH),
            other => panic!("expected ValidationFailed, got {other}"),
        }

        let good = PatchBuilder::new()
            .add_field(fields::AREA_PATH, format!("{PROJECT}\\Web"))
            .build()
            .unwrap();
        store.update_work_item(item.id, &good, false).unwrap();
    }

    #[test]
    fn test_revision_precondition_checked_before_adds() {
        let store = store();
        let item = create(&store, "Target", "Bug");

        let stale = PatchBuilder::new()
            .test_revision(item.rev + 5)
            .add_field(fields::TITLE, "never lands")
            .build()
            .unwrap();
        let err = store.update_work_item(item.id, &stale, false).unwrap_err();
        assert!(matches!(err, ClientError::ValidationFailed { .. }));

        // The failed precondition kept the add from applying.
        let unchanged = store.get_work_items(&[item.id], None).unwrap();
        assert_eq!(unchanged[0].title(), Some("Target"));
        assert_eq!(unchanged[0].rev, item.rev);
    }

    #[test]
    fn test_oversized_id_list_is_rejected() {
        let store = store();
        let ids: Vec<u64> = (1..=201).collect();

        let err = store.get_work_items(&ids, None).unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[test]
    fn test_projection_drops_relations_and_unrequested_fields() {
        let store = store();
        let item = create(&store, "Projected", "Bug");
        let link = PatchBuilder::new()
            .add_relation("Hyperlink", "https://example.com", None)
            .build()
            .unwrap();
        store.update_work_item(item.id, &link, false).unwrap();

        let projection = vec![fields::TITLE.to_string()];
        let fetched = store.get_work_items(&[item.id], Some(&projection)).unwrap();

        assert_eq!(fetched[0].fields.len(), 1);
        assert_eq!(fetched[0].title(), Some("Projected"));
        assert!(fetched[0].relations.is_empty());
    }

    #[test]
    fn test_wiql_filters_by_type_and_extracts_columns() {
        let store = store();
        create(&store, "A bug", "Bug");
        create(&store, "A task", "Task");

        let result = store
            .query_by_wiql(
                "Select [System.Id], [System.Title] From WorkItems \
                 Where [System.WorkItemType] = 'Bug'",
            )
            .unwrap();

        assert_eq!(result.work_items.len(), 1);
        assert_eq!(result.columns, vec!["System.Id", "System.Title"]);
    }

    #[test]
    fn test_wiql_without_select_is_syntax_error() {
        let store = store();
        let err = store.query_by_wiql("From WorkItems").unwrap_err();
        assert!(matches!(err, ClientError::QuerySyntax(_)));
    }

    #[test]
    fn test_wiql_columns_survive_non_ascii_names() {
        let store = store();
        let result = store
            .query_by_wiql("Select [Custom.İzmir], [System.Title] From WorkItems")
            .unwrap();

        assert_eq!(result.columns, vec!["Custom.İzmir", "System.Title"]);
    }

    #[test]
    fn test_wiql_accepts_line_breaks_between_clauses() {
        let store = store();
        create(&store, "Only item", "Bug");

        let result = store
            .query_by_wiql("Select [System.Id]\nFrom\n    WorkItems")
            .unwrap();

        assert_eq!(result.work_items.len(), 1);
    }

    #[test]
    fn test_saved_queries_round_trip() {
        let store = store();
        create(&store, "Only item", "Bug");
        let id = store.register_query("Everything", "Select [System.Id] From WorkItems");

        let listed = store.list_queries(PROJECT).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Everything");

        let result = store.query_by_id(id).unwrap();
        assert_eq!(result.work_items.len(), 1);
    }

    #[test]
    fn test_attachment_reference_carries_id_and_name() {
        let store = store();
        let reference = store.create_attachment("notes.txt", b"Sample attachment text").unwrap();

        assert!(reference.url.contains(&reference.id.to_string()));
        assert!(reference.url.ends_with("fileName=notes.txt"));
    }

    #[test]
    fn test_type_fields_carry_required_flags() {
        let store = store();
        let type_fields = store.get_work_item_type_fields(PROJECT, "Bug").unwrap();

        let title = type_fields
            .iter()
            .find(|f| f.reference_name == fields::TITLE)
            .unwrap();
        assert!(title.always_required);

        let history = type_fields
            .iter()
            .find(|f| f.reference_name == fields::HISTORY)
            .unwrap();
        assert!(!history.always_required);

        let err = store.get_work_item_type_fields(PROJECT, "Epic").unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[test]
    fn test_single_metadata_lookups() {
        let store = store();

        let ty = store.get_work_item_type(PROJECT, "Bug").unwrap();
        assert_eq!(ty.reference_name, "Microsoft.VSTS.WorkItemTypes.Bug");

        let category = store.get_type_category(PROJECT, "Requirement Category").unwrap();
        assert_eq!(category.work_item_types, vec!["User Story".to_string()]);

        let field = store
            .get_work_item_type_field(PROJECT, "Bug", "System.IterationPath")
            .unwrap();
        assert_eq!(field.name, "Iteration Path");

        let err = store.get_work_item_type_field(PROJECT, "Bug", "System.Nope").unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[test]
    fn test_validate_only_create_keeps_id_unassigned() {
        let store = store();
        let doc = PatchBuilder::new().add_field(fields::TITLE, "Ghost").build().unwrap();

        let snapshot = store.create_work_item(PROJECT, "Bug", &doc, true).unwrap();

        assert_eq!(snapshot.id, 0);
        assert_eq!(snapshot.rev, 0);
        assert_eq!(store.item_count(), 0);
    }
}
