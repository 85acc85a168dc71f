//! Error types for content-order configuration.
//!
//! The ordering core itself never fails; these errors come from turning
//! strings and JSON into queries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid sort key: '{0}' (expected 'order' or 'date')")]
    InvalidSortKey(String),

    #[error("Invalid sort direction: '{0}' (expected 'asc' or 'desc')")]
    InvalidSortDirection(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid collection: {0}")]
    InvalidCollection(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
