//! Work item model and relation counting.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Well-known field reference names.
pub mod fields {
    pub const TITLE: &str = "System.Title";
    pub const STATE: &str = "System.State";
    pub const HISTORY: &str = "System.History";
    pub const AREA_PATH: &str = "System.AreaPath";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const TEAM_PROJECT: &str = "System.TeamProject";
    pub const CREATED_DATE: &str = "System.CreatedDate";
    pub const CHANGED_DATE: &str = "System.ChangedDate";
}

/// Well-known relation kinds. Arbitrary link-type names are also valid.
pub mod rels {
    pub const HIERARCHY_REVERSE: &str = "System.LinkTypes.Hierarchy-Reverse";
    pub const HYPERLINK: &str = "Hyperlink";
    pub const ATTACHED_FILE: &str = "AttachedFile";
}

/// A transient snapshot of a remote work item.
///
/// Snapshots are materialized per call; there is no client-side cache or
/// identity map. Repeated fetches of the same id return independent
/// instances, possibly at a later revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    /// Store-assigned identifier; 0 until the store assigns one (e.g. in a
    /// validate-only snapshot that was never persisted).
    pub id: u64,

    /// Revision counter, bumped by the store on every committed update.
    pub rev: u64,

    /// Field reference name → value.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, Value>,

    /// Ordered relations. The store may omit the collection entirely when
    /// empty, so deserialization defaults to an empty list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,

    /// Resource URL of this work item on the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl WorkItem {
    /// Get a field value by reference name.
    #[must_use]
    pub fn field(&self, reference_name: &str) -> Option<&Value> {
        self.fields.get(reference_name)
    }

    /// The `System.Title` field, when present and a string.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.field(fields::TITLE).and_then(Value::as_str)
    }

    /// Count relations whose kind matches `rel` exactly.
    ///
    /// An item with no relations counts as zero; a missing relations
    /// collection is not an error.
    #[must_use]
    pub fn count_relations(&self, rel: &str) -> usize {
        self.relations.iter().filter(|r| r.rel == rel).count()
    }
}

/// A link, attachment or hyperlink attached to a work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    /// Relation kind tag (see [`rels`]).
    pub rel: String,
    /// Target URL.
    pub url: String,
    /// Optional attributes (comment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<RelationAttributes>,
}

impl Relation {
    /// Create a relation with an optional comment attribute.
    #[must_use]
    pub fn new(rel: impl Into<String>, url: impl Into<String>, comment: Option<&str>) -> Self {
        Self {
            rel: rel.into(),
            url: url.into(),
            attributes: comment.map(|c| RelationAttributes {
                comment: Some(c.to_string()),
            }),
        }
    }
}

/// Optional attributes carried by a relation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelationAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Before/after counts of relations matching one kind, reported around a
/// mutation. Computing a delta performs no mutation itself.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelationDelta {
    /// Relation kind that was counted.
    pub rel: String,
    /// Matching relations before the mutation.
    pub before: usize,
    /// Matching relations on the mutation's result.
    pub after: usize,
}

/// Compute the relation delta for `rel` between two snapshots.
#[must_use]
pub fn relation_delta(before: &WorkItem, after: &WorkItem, rel: &str) -> RelationDelta {
    RelationDelta {
        rel: rel.to_string(),
        before: before.count_relations(rel),
        after: after.count_relations(rel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn item_with_relations(relations: Vec<Relation>) -> WorkItem {
        WorkItem {
            id: 7,
            rev: 1,
            fields: HashMap::from([(fields::TITLE.to_string(), json!("Sample"))]),
            relations,
            url: None,
        }
    }

    #[test]
    fn test_count_relations_empty_is_zero() {
        let item = item_with_relations(Vec::new());
        assert_eq!(item.count_relations(rels::HYPERLINK), 0);
    }

    #[test]
    fn test_count_relations_matches_kind_exactly() {
        let item = item_with_relations(vec![
            Relation::new(rels::HYPERLINK, "https://example.com", Some("docs")),
            Relation::new(rels::ATTACHED_FILE, "https://store/att/1", None),
            Relation::new(rels::HYPERLINK, "https://example.org", None),
        ]);

        assert_eq!(item.count_relations(rels::HYPERLINK), 2);
        assert_eq!(item.count_relations(rels::ATTACHED_FILE), 1);
        assert_eq!(item.count_relations(rels::HIERARCHY_REVERSE), 0);
    }

    #[test]
    fn test_relation_delta() {
        let before = item_with_relations(Vec::new());
        let after = item_with_relations(vec![Relation::new(
            rels::ATTACHED_FILE,
            "https://store/att/1",
            None,
        )]);

        let delta = relation_delta(&before, &after, rels::ATTACHED_FILE);
        assert_eq!(delta.before, 0);
        assert_eq!(delta.after, 1);
    }

    #[test]
    fn test_relations_collection_may_be_omitted_on_the_wire() {
        let item: WorkItem = serde_json::from_value(json!({
            "id": 12,
            "rev": 3,
            "fields": { "System.Title": "No relations" }
        }))
        .unwrap();

        assert!(item.relations.is_empty());
        assert_eq!(item.count_relations(rels::HYPERLINK), 0);
        assert_eq!(item.title(), Some("No relations"));
    }
}
