//! Error types for the catalog crates.
//!
//! One enum covers the whole reconciliation taxonomy so that every layer
//! (store, rosters, orchestrator) speaks the same language:
//! - domain errors (`NotFound`, `Validation`, `Aggregate`) travel to the caller unchanged
//! - everything else is wrapped by the orchestrator into `UpdateFailed`

use thiserror::Error;

/// Errors raised while loading, reconciling or persisting catalog data
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A referenced movie, ceremony, person or ceremony award does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Reconciliation was attempted on a collection that was never fetched.
    ///
    /// This is a programming-contract violation, never a retryable condition.
    #[error("collection '{collection}' was used before being fetched")]
    UninitializedCollection { collection: String },

    /// A desired entry failed its structural checks
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// One or more entries of a batch failed; every failure is kept
    #[error("{} entries were rejected", .failures.len())]
    Aggregate { failures: Vec<EntryFailure> },

    /// A snapshot row points at an entity that isn't in the snapshot
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: &'static str, id: i64 },

    /// The backing store failed
    #[error("store error: {0}")]
    Store(String),

    /// I/O error while reading or writing a snapshot
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or desired-list JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Opaque failure returned to callers when an unexpected error aborted an update.
    ///
    /// The underlying cause is logged, not carried.
    #[error("failed to update {section} of movie {movie_id}")]
    UpdateFailed { movie_id: i64, section: String },
}

/// One rejected entry of a batch, identified by its position in the desired list
#[derive(Debug)]
pub struct EntryFailure {
    pub position: usize,
    pub error: CatalogError,
}

impl std::fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry #{}: {}", self.position, self.error)
    }
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CatalogError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn uninitialized(collection: impl Into<String>) -> Self {
        CatalogError::UninitializedCollection {
            collection: collection.into(),
        }
    }

    /// Collapse a list of failures into a single error.
    ///
    /// Returns `None` when there is nothing to report.
    pub fn aggregate(failures: Vec<EntryFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(CatalogError::Aggregate { failures })
        }
    }

    /// Whether this error is a known domain outcome the caller should see as-is.
    ///
    /// An aggregate counts only when every failure inside it is itself a domain error.
    pub fn is_domain(&self) -> bool {
        match self {
            CatalogError::NotFound { .. } | CatalogError::Validation { .. } => true,
            CatalogError::Aggregate { failures } => failures.iter().all(|f| f.error.is_domain()),
            _ => false,
        }
    }
}

/// Convenience type alias for Results in the catalog crates
pub type Result<T> = std::result::Result<T, CatalogError>;
