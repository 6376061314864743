//! Batched work item retrieval.

use tracing::debug;
use witpatch_core::{ClientError, MAX_IDS_PER_CALL, Result, WorkItem, WorkItemStore};

/// Retrieves work items by id list, transparently splitting the list into
/// store calls of at most [`MAX_IDS_PER_CALL`] ids.
///
/// Chunk calls run sequentially, never in parallel, which keeps load on the
/// store predictable and error attribution deterministic. Callers wanting
/// parallelism fan out themselves.
#[derive(Debug)]
pub struct BatchedFetcher<'a, S: WorkItemStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: WorkItemStore + ?Sized> BatchedFetcher<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Fetch `ids`, optionally projected to `fields`, as one logical
    /// sequence in chunk order (within a chunk, store order).
    ///
    /// All-or-nothing: if any chunk fails, results already fetched from
    /// earlier chunks are discarded and the whole call fails. Empty `ids`
    /// yields an empty sequence without issuing any call.
    ///
    /// # Errors
    /// `PartialBatchFailure` naming the failed chunk and the underlying
    /// cause.
    pub fn fetch(&self, ids: &[u64], fields: Option<&[String]>) -> Result<Vec<WorkItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let total = ids.len().div_ceil(MAX_IDS_PER_CALL);
        let mut items = Vec::with_capacity(ids.len());

        for (chunk, chunk_ids) in ids.chunks(MAX_IDS_PER_CALL).enumerate() {
            debug!(chunk, total, len = chunk_ids.len(), "Fetching chunk");

            let batch = self.store.get_work_items(chunk_ids, fields).map_err(|source| {
                ClientError::PartialBatchFailure {
                    chunk,
                    total,
                    source: Box::new(source),
                }
            })?;
            items.extend(batch);
        }

        Ok(items)
    }
}
