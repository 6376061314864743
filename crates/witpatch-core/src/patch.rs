//! Patch documents: ordered partial-update operations for work items.
//!
//! Wire format is an ordered array of `{"op", "path", "value"}` objects. The
//! store applies operations left to right and evaluates `test` preconditions
//! before any `add` is applied, so order matters.

use crate::error::{ClientError, Result};
use crate::item::Relation;
use serde::Serialize;
use serde_json::Value;

/// Patch operation kind.
///
/// `Add` is the only kind the engine issues on its own; `Test` exists for
/// callers that opt into an optimistic-concurrency precondition on the
/// revision. Without one, last write wins.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Add,
    Test,
}

/// A single operation inside a patch document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatchOperation {
    pub op: Op,
    /// Path addressing `/fields/<ReferenceName>`, `/relations/-` (append) or
    /// `/rev` (test precondition).
    pub path: String,
    pub value: Value,
}

/// An immutable, ordered, non-empty sequence of patch operations.
///
/// Only [`PatchBuilder::build`] constructs one, which is what upholds the
/// at-least-one-operation invariant.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct PatchDocument {
    ops: Vec<PatchOperation>,
}

impl PatchDocument {
    /// The operations in submission order.
    #[must_use]
    pub fn operations(&self) -> &[PatchOperation] {
        &self.ops
    }

    /// Number of operations (always ≥ 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Accumulates operations for a [`PatchDocument`].
#[derive(Debug, Default)]
pub struct PatchBuilder {
    ops: Vec<PatchOperation>,
}

impl PatchBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an `add` operation setting the field at
    /// `/fields/<reference_name>`.
    #[must_use]
    pub fn add_field(mut self, reference_name: &str, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOperation {
            op: Op::Add,
            path: format!("/fields/{reference_name}"),
            value: value.into(),
        });
        self
    }

    /// Append an `add` operation appending a relation at `/relations/-`.
    #[must_use]
    pub fn add_relation(mut self, rel: &str, url: &str, comment: Option<&str>) -> Self {
        let relation = Relation::new(rel, url, comment);
        self.ops.push(PatchOperation {
            op: Op::Add,
            path: "/relations/-".to_string(),
            value: serde_json::to_value(relation).expect("relation serializes to a JSON object"),
        });
        self
    }

    /// Append a `test` precondition on the work item's revision.
    ///
    /// Callers that want optimistic concurrency opt in with this; the engine
    /// never issues one implicitly.
    #[must_use]
    pub fn test_revision(mut self, expected: u64) -> Self {
        self.ops.push(PatchOperation {
            op: Op::Test,
            path: "/rev".to_string(),
            value: Value::from(expected),
        });
        self
    }

    /// Finalize the document.
    ///
    /// # Errors
    /// Returns `ClientError::InvalidRequest` when no operation was added; an
    /// empty document is a caller bug the store would reject anyway.
    pub fn build(self) -> Result<PatchDocument> {
        if self.ops.is_empty() {
            return Err(ClientError::InvalidRequest(
                "patch document contains no operations".to_string(),
            ));
        }
        Ok(PatchDocument { ops: self.ops })
    }
}
