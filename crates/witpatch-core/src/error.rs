//! Error taxonomy for work item store operations.
//!
//! Callers pattern-match on the error kind instead of unwrapping nested
//! exception types; no operation swallows a failure or returns a silent
//! default.

use thiserror::Error;

/// Result type alias for witpatch operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Classified failures of work item store operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed local input (empty patch document, oversized id list,
    /// unsupported patch path). A caller bug; never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The store rejected field content. An expected, recoverable outcome
    /// surfaced verbatim to the user; never retried automatically.
    #[error("validation failed on '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// The store could not parse the submitted query text.
    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    /// A referenced entity (work item, saved query, project, type) does not
    /// exist. Distinct from a query that exists but matches nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// One chunk of a batched fetch failed. No partial data is returned;
    /// results from earlier chunks are discarded.
    #[error("batch chunk {chunk} of {total} failed: {source}")]
    PartialBatchFailure {
        /// Zero-based index of the failed chunk.
        chunk: usize,
        /// Total number of chunks the fetch was split into.
        total: usize,
        #[source]
        source: Box<ClientError>,
    },

    /// Network, auth or server-side failure. The only class eligible for
    /// caller-driven retry with backoff; the engine itself never retries.
    #[error("transport failed: {0}")]
    TransportFailed(String),
}

impl ClientError {
    /// Shorthand for a [`ClientError::ValidationFailed`].
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether a caller may reasonably retry the operation.
    ///
    /// Only transport failures qualify; validation and not-found outcomes are
    /// stable verdicts and retrying them is wasted work.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(ClientError::TransportFailed("503".into()).is_retryable());
        assert!(!ClientError::InvalidRequest("empty".into()).is_retryable());
        assert!(!ClientError::validation("System.Title", "required").is_retryable());
        assert!(!ClientError::NotFound("query".into()).is_retryable());
    }

    #[test]
    fn test_batch_failure_reports_chunk_and_cause() {
        let err = ClientError::PartialBatchFailure {
            chunk: 1,
            total: 3,
            source: Box::new(ClientError::TransportFailed("connection reset".into())),
        };
        assert_eq!(
            err.to_string(),
            "batch chunk 1 of 3 failed: transport failed: connection reset"
        );
    }
}
