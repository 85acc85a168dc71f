//! # content-order
//!
//! Deterministic ordering and querying for content collections.
//!
//! Every listing on a content site (projects, timeline events, résumé
//! sections) answers the same two questions: which entries appear, and in
//! what sequence. This crate answers them with pure functions over in-memory
//! slices. Authors pin entries with a non-negative `order`, leave it unset to
//! flow chronologically, and push entries to the end with a negative `order`.
//!
//! ## Modules
//!
//! - [`date`] — `"YYYY-MM"` / `"YYYY"` / `"present"` tokens → timestamps and display strings
//! - [`item`] — the [`ContentItem`] adapter, JSON and [`Entry`] implementations
//! - [`order`] — the three-bucket stable sort
//! - [`query`] — filter → sort → limit pipelines and their JSON form
//! - [`error`] — Error types
//!
//! Nothing here reads the system clock. Callers pass the "now" anchor that
//! `"present"` resolves to.

pub mod date;
pub mod error;
pub mod item;
pub mod order;
pub mod query;

pub use date::{format_date, format_date_range, parse_date, YearMonth};
pub use error::QueryError;
pub use item::{ContentItem, Entry, FieldValue};
pub use order::{sort_by_order, sort_indices, Bucket, SortOptions};
pub use query::{
    apply_collection_query, parse_collection, CollectionQuery, QuerySpec, SortBy, SortDirection,
};
