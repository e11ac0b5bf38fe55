//! Error types for the fleet store.

use thiserror::Error;

/// Result type alias for fleet store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading the job queue.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached at startup.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// A reader query failed mid-cycle.
    #[error("query `{query}` failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The in-memory backend was told to reject queries.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Name of the query that failed, if any.
    pub fn query(&self) -> Option<&'static str> {
        match self {
            Self::Query { query, .. } => Some(query),
            _ => None,
        }
    }
}
