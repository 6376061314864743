//! Patch document submission against single work items.

use tracing::{debug, info};
use witpatch_core::{
    PatchBuilder, PatchDocument, RelationDelta, Result, WorkItem, WorkItemStore, fields,
    relation_delta,
};

/// Whether a submission persists or only asks the store to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Persist the document; success returns the item at its new revision.
    Commit,
    /// Store-side validation only. Nothing persists, revisions never move,
    /// and a rejection is an expected outcome to report, not a transport
    /// error. Identical validate calls yield identical verdicts.
    Validate,
}

impl SubmitMode {
    const fn validate_only(self) -> bool {
        matches!(self, Self::Validate)
    }
}

/// Applies patch documents to single work items and classifies the remote
/// result.
///
/// Each call moves through Building → Submitted → one terminal outcome:
/// `Ok` (committed, or validated clean), `ValidationFailed` (the store's
/// verdict, surfaced verbatim) or `TransportFailed` (the only retryable
/// class, and only by the caller — the engine never retries).
///
/// Concurrent updates to the same id are not coordinated here; without a
/// caller-supplied `test_revision` precondition, last write wins.
#[derive(Debug)]
pub struct MutationEngine<'a, S: WorkItemStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: WorkItemStore + ?Sized> MutationEngine<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a work item of `work_item_type` in `project`.
    ///
    /// The store enforces that the document carries a `System.Title`
    /// operation; the engine does not pre-validate, it surfaces the store's
    /// verdict.
    ///
    /// # Errors
    /// `ValidationFailed` with field and reason when the store rejects the
    /// document; `NotFound` for an unknown project or type;
    /// `TransportFailed` for network-level failure.
    pub fn create(
        &self,
        project: &str,
        work_item_type: &str,
        document: &PatchDocument,
        mode: SubmitMode,
    ) -> Result<WorkItem> {
        debug!(project, work_item_type, ops = document.len(), ?mode, "Submitting create");

        let item =
            self.store
                .create_work_item(project, work_item_type, document, mode.validate_only())?;

        match mode {
            SubmitMode::Commit => info!(id = item.id, "Created work item"),
            SubmitMode::Validate => debug!("Create document validated clean"),
        }

        Ok(item)
    }

    /// Apply a patch document to the work item `id`.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; `ValidationFailed` for rejected content
    /// or a failed precondition; `TransportFailed` for network-level
    /// failure.
    pub fn update(&self, id: u64, document: &PatchDocument, mode: SubmitMode) -> Result<WorkItem> {
        debug!(id, ops = document.len(), ?mode, "Submitting update");

        let item = self.store.update_work_item(id, document, mode.validate_only())?;

        match mode {
            SubmitMode::Commit => info!(id, rev = item.rev, "Updated work item"),
            SubmitMode::Validate => debug!(id, "Update document validated clean"),
        }

        Ok(item)
    }

    /// Append one relation to the work item `id` and report the before/after
    /// count of that relation kind.
    ///
    /// # Errors
    /// Same classes as [`MutationEngine::update`].
    pub fn add_relation(
        &self,
        id: u64,
        rel: &str,
        url: &str,
        comment: Option<&str>,
    ) -> Result<(WorkItem, RelationDelta)> {
        let before = self.store.get_work_item(id)?;

        let document = PatchBuilder::new().add_relation(rel, url, comment).build()?;
        let updated = self.update(id, &document, SubmitMode::Commit)?;

        let delta = relation_delta(&before, &updated, rel);
        Ok((updated, delta))
    }

    /// Append a comment to the work item `id` via its `System.History`
    /// field.
    ///
    /// # Errors
    /// Same classes as [`MutationEngine::update`].
    pub fn add_comment(&self, id: u64, text: &str) -> Result<WorkItem> {
        let document = PatchBuilder::new().add_field(fields::HISTORY, text).build()?;
        self.update(id, &document, SubmitMode::Commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use witpatch_core::{ClientError, rels};
    use witpatch_mem::MemoryStore;

    const PROJECT: &str = "Fabrikam";

    fn store() -> MemoryStore {
        MemoryStore::new("https://dev.example.com/DefaultCollection", PROJECT)
    }

    fn titled(title: &str) -> PatchDocument {
        PatchBuilder::new().add_field(fields::TITLE, title).build().unwrap()
    }

    #[test]
    fn test_create_commit_assigns_id_and_revision() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let item = engine
            .create(PROJECT, "Bug", &titled("First bug"), SubmitMode::Commit)
            .unwrap();

        assert!(item.id > 0);
        assert_eq!(item.rev, 1);
        assert_eq!(item.title(), Some("First bug"));
    }

    #[test]
    fn test_validate_create_without_title_persists_nothing() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let existing = engine
            .create(PROJECT, "Bug", &titled("Existing"), SubmitMode::Commit)
            .unwrap();

        let history_only = PatchBuilder::new()
            .add_field(fields::HISTORY, "Modify system history")
            .build()
            .unwrap();
        let err = engine
            .create(PROJECT, "Bug", &history_only, SubmitMode::Validate)
            .unwrap_err();

        match err {
            ClientError::ValidationFailed { field, .. } => assert_eq!(field, fields::TITLE),
            other => panic!("expected ValidationFailed, got {other}"),
        }

        // No new id was persisted alongside the pre-existing one.
        let all = store.get_work_items(&[existing.id], None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_validate_update_never_moves_revision() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let item = engine
            .create(PROJECT, "Task", &titled("Stable"), SubmitMode::Commit)
            .unwrap();

        let validated = engine
            .update(item.id, &titled("Would-be title"), SubmitMode::Validate)
            .unwrap();
        assert_eq!(validated.rev, item.rev);

        let refetched = store.get_work_item(item.id).unwrap();
        assert_eq!(refetched.rev, item.rev);
        assert_eq!(refetched.title(), Some("Stable"));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let bad = PatchBuilder::new()
            .add_field(fields::AREA_PATH, "Invalid area path")
            .build()
            .unwrap();
        let item = engine
            .create(PROJECT, "Bug", &titled("Target"), SubmitMode::Commit)
            .unwrap();

        let first = engine.update(item.id, &bad, SubmitMode::Validate).unwrap_err();
        let second = engine.update(item.id, &bad, SubmitMode::Validate).unwrap_err();

        assert_eq!(first.to_string(), second.to_string());
        assert!(matches!(second, ClientError::ValidationFailed { .. }));
    }

    #[test]
    fn test_add_relation_reports_delta() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let item = engine
            .create(PROJECT, "Bug", &titled("Carrier"), SubmitMode::Commit)
            .unwrap();
        assert_eq!(item.count_relations(rels::ATTACHED_FILE), 0);

        let attachment = store.create_attachment("notes.txt", b"Sample attachment text").unwrap();
        let (updated, delta) = engine
            .add_relation(item.id, rels::ATTACHED_FILE, &attachment.url, None)
            .unwrap();

        assert_eq!(delta.before, 0);
        assert_eq!(delta.after, 1);
        assert_eq!(updated.count_relations(rels::ATTACHED_FILE), 1);
    }

    #[test]
    fn test_add_comment_bumps_revision() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let item = engine
            .create(PROJECT, "Bug", &titled("Commented"), SubmitMode::Commit)
            .unwrap();

        let updated = engine.add_comment(item.id, "Added a comment").unwrap();
        assert_eq!(updated.rev, item.rev + 1);
    }

    #[test]
    fn test_revision_precondition_rejects_stale_writer() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let item = engine
            .create(PROJECT, "Bug", &titled("Raced"), SubmitMode::Commit)
            .unwrap();
        engine.add_comment(item.id, "first writer").unwrap();

        let stale = PatchBuilder::new()
            .test_revision(item.rev)
            .add_field(fields::TITLE, "second writer")
            .build()
            .unwrap();
        let err = engine.update(item.id, &stale, SubmitMode::Commit).unwrap_err();

        assert!(matches!(err, ClientError::ValidationFailed { .. }));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let store = store();
        let engine = MutationEngine::new(&store);

        let err = engine
            .update(9999, &titled("nobody"), SubmitMode::Commit)
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }
}
