//! Declarative filter → sort → limit queries over content collections.
//!
//! Page builders describe what a section shows ("featured projects, pinned
//! first, at most three") as a [`CollectionQuery`] and run it against the raw
//! collection with [`apply_collection_query`]. For JSON content the same
//! query can be written as a [`QuerySpec`] and loaded from configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::item::{json_order, json_str, ContentItem, FieldValue};
use crate::order::{permutation, DateAccessor, OrderAccessor, SortOptions};

/// Which key a query sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Three-bucket order with date fallback for unordered items.
    Order,
    /// Date only; every item is treated as unordered.
    Date,
}

impl FromStr for SortBy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "order" => Ok(SortBy::Order),
            "date" => Ok(SortBy::Date),
            _ => Err(QueryError::InvalidSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortBy::Order => "order",
            SortBy::Date => "date",
        })
    }
}

/// Direction of a date sort. Order sorts ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(QueryError::InvalidSortDirection(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

/// A filter, sort and limit applied to one collection.
pub struct CollectionQuery<T> {
    /// Instant that `"present"` dates resolve to.
    pub anchor: DateTime<Utc>,
    /// Every pair must match [`ContentItem::field`] for an item to survive.
    pub filter: BTreeMap<String, FieldValue>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortDirection>,
    /// Maximum output length. `0` means unlimited.
    pub limit: Option<usize>,
    order: Option<OrderAccessor<T>>,
    date: Option<DateAccessor<T>>,
}

impl<T> CollectionQuery<T> {
    /// A query with no filter, no sort and no accessors.
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            filter: BTreeMap::new(),
            sort_by: None,
            sort_order: None,
            limit: None,
            order: None,
            date: None,
        }
    }

    pub fn filter_eq(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn sort_order(mut self, direction: SortDirection) -> Self {
        self.sort_order = Some(direction);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order_by<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Option<i64> + Send + Sync + 'static,
    {
        self.order = Some(Arc::new(f));
        self
    }

    pub fn date_by<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        self.date = Some(Arc::new(f));
        self
    }

    /// The ordering options this query delegates to, if its sort applies.
    ///
    /// `Order` needs an order accessor and keeps the date accessor for the
    /// unordered fallback. `Date` needs a date accessor and drops the order
    /// accessor so every item shares one bucket.
    fn sort_options(&self) -> Option<SortOptions<T>> {
        match self.sort_by? {
            SortBy::Order => {
                let order = self.order.clone()?;
                Some(SortOptions::with_accessors(
                    self.anchor,
                    Some(order),
                    self.date.clone(),
                ))
            }
            SortBy::Date => {
                let date = self.date.clone()?;
                Some(SortOptions::with_accessors(self.anchor, None, Some(date)))
            }
        }
    }

    fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }
}

impl<T: ContentItem + Clone> CollectionQuery<T> {
    /// Shorthand for [`apply_collection_query`].
    pub fn apply(&self, items: &[T]) -> Vec<T> {
        apply_collection_query(items, self)
    }
}

impl<T: ContentItem + 'static> CollectionQuery<T> {
    /// A query whose accessors read [`ContentItem::order`] and [`ContentItem::date`].
    pub fn from_item(anchor: DateTime<Utc>) -> Self {
        Self::new(anchor)
            .order_by(|item: &T| item.order())
            .date_by(|item: &T| item.date().map(str::to_owned))
    }
}

impl<T> Clone for CollectionQuery<T> {
    fn clone(&self) -> Self {
        Self {
            anchor: self.anchor,
            filter: self.filter.clone(),
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            limit: self.limit,
            order: self.order.clone(),
            date: self.date.clone(),
        }
    }
}

impl<T> fmt::Debug for CollectionQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionQuery")
            .field("anchor", &self.anchor)
            .field("filter", &self.filter)
            .field("sort_by", &self.sort_by)
            .field("sort_order", &self.sort_order)
            .field("limit", &self.limit)
            .field("order", &self.order.is_some())
            .field("date", &self.date.is_some())
            .finish()
    }
}

fn matches_filter<T: ContentItem>(item: &T, filter: &BTreeMap<String, FieldValue>) -> bool {
    filter.iter().all(|(key, expected)| {
        item.field(key)
            .is_some_and(|actual| actual.matches(expected))
    })
}

/// Filter, sort and truncate a collection.
///
/// 1. Keep items whose fields equal every filter value.
/// 2. `SortBy::Order` runs the three-bucket sort. `SortBy::Date` sorts newest
///    first and reverses for `SortDirection::Asc`. Without a sort key, or
///    without the accessor the key needs, survivors keep their input order.
/// 3. Keep at most `limit` items.
///
/// `items` is never modified.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use content_order::query::{apply_collection_query, CollectionQuery, SortBy};
/// use serde_json::json;
///
/// let projects = vec![
///     json!({"title": "cli", "isFeatured": true, "date": "2023-04"}),
///     json!({"title": "blog", "isFeatured": false, "date": "2025-01"}),
///     json!({"title": "engine", "data": {"isFeatured": true, "order": 1}}),
/// ];
/// let featured = CollectionQuery::from_item(Utc::now())
///     .filter_eq("isFeatured", true)
///     .sort_by(SortBy::Order)
///     .limit(2);
///
/// let titles: Vec<_> = apply_collection_query(&projects, &featured)
///     .iter()
///     .map(|p| p["title"].as_str().unwrap().to_string())
///     .collect();
/// assert_eq!(titles, ["engine", "cli"]);
/// ```
pub fn apply_collection_query<T: ContentItem + Clone>(
    items: &[T],
    query: &CollectionQuery<T>,
) -> Vec<T> {
    let survivors: Vec<&T> = if query.filter.is_empty() {
        items.iter().collect()
    } else {
        items
            .iter()
            .filter(|item| matches_filter(*item, &query.filter))
            .collect()
    };

    let mut positions: Vec<usize> = match query.sort_options() {
        Some(options) => permutation(survivors.iter().copied(), &options),
        None => (0..survivors.len()).collect(),
    };

    if query.sort_by == Some(SortBy::Date)
        && query.sort_order == Some(SortDirection::Asc)
        && query.date.is_some()
    {
        positions.reverse();
    }

    if let Some(limit) = query.effective_limit() {
        positions.truncate(limit);
    }

    debug!(
        target: "content_order",
        input = items.len(),
        matched = survivors.len(),
        output = positions.len(),
        sort_by = ?query.sort_by,
        "Applied collection query"
    );

    positions.into_iter().map(|k| survivors[k].clone()).collect()
}

/// Serializable description of a query over JSON content.
///
/// ```json
/// { "filter": { "isFeatured": true }, "sortBy": "order", "limit": 3,
///   "dateField": "startDate" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuerySpec {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filter: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Key holding the order value. Defaults to `"order"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_field: Option<String>,
    /// Key holding the date token. Defaults to `"date"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_field: Option<String>,
}

impl QuerySpec {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| QueryError::InvalidQuery(e.to_string()))
    }

    /// Build a query whose accessors read the configured keys from each JSON
    /// item, falling back to its nested `data` object.
    pub fn into_query(self, anchor: DateTime<Utc>) -> CollectionQuery<Value> {
        let order_field = self.order_field.unwrap_or_else(|| "order".to_string());
        let date_field = self.date_field.unwrap_or_else(|| "date".to_string());

        let mut query = CollectionQuery::new(anchor)
            .order_by(move |item: &Value| json_order(item, &order_field))
            .date_by(move |item: &Value| json_str(item, &date_field).map(str::to_owned));
        query.filter = self.filter;
        query.sort_by = self.sort_by;
        query.sort_order = self.sort_order;
        query.limit = self.limit;
        query
    }
}

/// Parse a JSON collection. The document must be an array.
pub fn parse_collection(input: &str) -> Result<Vec<Value>> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| QueryError::InvalidCollection(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(QueryError::InvalidCollection(format!(
            "expected a JSON array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, 14, 30, 0).unwrap()
    }

    fn titles(items: &[Value]) -> Vec<String> {
        items
            .iter()
            .map(|i| i["title"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn timeline() -> Vec<Value> {
        vec![
            json!({"title": "A", "order": 1, "startDate": "2022"}),
            json!({"title": "B", "startDate": "2025-01"}),
            json!({"title": "C", "order": -1, "startDate": "2020"}),
            json!({"title": "D", "startDate": "2023-01"}),
        ]
    }

    fn projects() -> Vec<Value> {
        vec![
            json!({"title": "p1", "isFeatured": true, "date": "2021-05"}),
            json!({"title": "p2", "isFeatured": false, "date": "2024-02"}),
            json!({"id": "p3", "title": "p3", "data": {"isFeatured": true, "date": "2023-08"}}),
            json!({"title": "p4", "date": "2022-11"}),
            json!({"title": "p5", "isFeatured": true}),
        ]
    }

    // ── sort ────────────────────────────────────────────────────────────

    #[test]
    fn test_order_sort_with_start_date_fallback() {
        let query = CollectionQuery::new(anchor())
            .sort_by(SortBy::Order)
            .order_by(|i: &Value| i["order"].as_i64())
            .date_by(|i: &Value| i["startDate"].as_str().map(str::to_owned));
        assert_eq!(titles(&query.apply(&timeline())), ["A", "B", "D", "C"]);
    }

    #[test]
    fn test_order_sort_ignores_sort_order() {
        let query = CollectionQuery::new(anchor())
            .sort_by(SortBy::Order)
            .sort_order(SortDirection::Asc)
            .order_by(|i: &Value| i["order"].as_i64())
            .date_by(|i: &Value| i["startDate"].as_str().map(str::to_owned));
        assert_eq!(titles(&query.apply(&timeline())), ["A", "B", "D", "C"]);
    }

    #[test]
    fn test_date_sort_ignores_order_values() {
        let query = CollectionQuery::new(anchor())
            .sort_by(SortBy::Date)
            .order_by(|i: &Value| i["order"].as_i64())
            .date_by(|i: &Value| i["startDate"].as_str().map(str::to_owned));
        assert_eq!(titles(&query.apply(&timeline())), ["B", "D", "A", "C"]);
    }

    #[test]
    fn test_date_sort_ascending_reverses() {
        let query = CollectionQuery::new(anchor())
            .sort_by(SortBy::Date)
            .sort_order(SortDirection::Asc)
            .date_by(|i: &Value| i["startDate"].as_str().map(str::to_owned));
        assert_eq!(titles(&query.apply(&timeline())), ["C", "A", "D", "B"]);
    }

    #[test]
    fn test_sort_without_accessor_passes_through() {
        let order_only = CollectionQuery::new(anchor()).sort_by(SortBy::Order);
        assert_eq!(titles(&order_only.apply(&timeline())), ["A", "B", "C", "D"]);

        let date_only = CollectionQuery::<Value>::new(anchor())
            .sort_by(SortBy::Date)
            .sort_order(SortDirection::Asc)
            .order_by(|i: &Value| i["order"].as_i64());
        assert_eq!(titles(&date_only.apply(&timeline())), ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_no_sort_key_passes_through() {
        let query = CollectionQuery::from_item(anchor());
        assert_eq!(titles(&query.apply(&timeline())), ["A", "B", "C", "D"]);
    }

    // ── filter ──────────────────────────────────────────────────────────

    #[test]
    fn test_filter_checks_item_and_nested_data() {
        let query = CollectionQuery::from_item(anchor()).filter_eq("isFeatured", true);
        assert_eq!(titles(&query.apply(&projects())), ["p1", "p3", "p5"]);
    }

    #[test]
    fn test_filter_requires_every_pair() {
        let query = CollectionQuery::from_item(anchor())
            .filter_eq("isFeatured", true)
            .filter_eq("title", "p3");
        assert_eq!(titles(&query.apply(&projects())), ["p3"]);
    }

    #[test]
    fn test_filter_with_no_match_is_empty() {
        let query = CollectionQuery::from_item(anchor()).filter_eq("isFeatured", "yes");
        assert!(query.apply(&projects()).is_empty());
    }

    #[test]
    fn test_filter_then_sort_then_limit() {
        let query = CollectionQuery::from_item(anchor())
            .filter_eq("isFeatured", true)
            .sort_by(SortBy::Date)
            .limit(2);
        assert_eq!(titles(&query.apply(&projects())), ["p3", "p1"]);
    }

    // ── limit ───────────────────────────────────────────────────────────

    #[test]
    fn test_limit_truncates() {
        let query = CollectionQuery::from_item(anchor()).limit(2);
        assert_eq!(titles(&query.apply(&projects())), ["p1", "p2"]);
    }

    #[test]
    fn test_limit_larger_than_input_keeps_everything() {
        let query = CollectionQuery::from_item(anchor()).limit(50);
        assert_eq!(query.apply(&projects()).len(), 5);
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let query = CollectionQuery::from_item(anchor()).limit(0);
        assert_eq!(query.apply(&projects()).len(), 5);
    }

    #[test]
    fn test_empty_collection() {
        let query = CollectionQuery::<Value>::from_item(anchor())
            .filter_eq("isFeatured", true)
            .sort_by(SortBy::Order)
            .limit(3);
        assert!(query.apply(&[]).is_empty());
    }

    // ── QuerySpec ───────────────────────────────────────────────────────

    #[test]
    fn test_spec_from_json() {
        let spec = QuerySpec::from_json(
            r#"{"filter": {"isFeatured": true}, "sortBy": "date", "sortOrder": "asc", "limit": 2}"#,
        )
        .unwrap();
        assert_eq!(spec.sort_by, Some(SortBy::Date));
        assert_eq!(spec.sort_order, Some(SortDirection::Asc));
        assert_eq!(spec.limit, Some(2));
        assert_eq!(spec.filter.get("isFeatured"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_spec_rejects_unknown_keys() {
        let err = QuerySpec::from_json(r#"{"sortby": "order"}"#).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
    }

    #[test]
    fn test_spec_rejects_unknown_sort_key() {
        let err = QuerySpec::from_json(r#"{"sortBy": "title"}"#).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
    }

    #[test]
    fn test_spec_with_custom_date_field() {
        let spec = QuerySpec {
            sort_by: Some(SortBy::Order),
            date_field: Some("startDate".into()),
            ..Default::default()
        };
        let query = spec.into_query(anchor());
        assert_eq!(titles(&query.apply(&timeline())), ["A", "B", "D", "C"]);
    }

    #[test]
    fn test_spec_reads_nested_data_keys() {
        let items = vec![
            json!({"title": "x", "data": {"date": "2020-01"}}),
            json!({"title": "y", "data": {"date": "2024-01"}}),
        ];
        let query = QuerySpec {
            sort_by: Some(SortBy::Date),
            ..Default::default()
        }
        .into_query(anchor());
        assert_eq!(titles(&query.apply(&items)), ["y", "x"]);
    }

    // ── parsing ─────────────────────────────────────────────────────────

    #[test]
    fn test_sort_by_from_str() {
        assert_eq!("order".parse::<SortBy>().unwrap(), SortBy::Order);
        assert_eq!("DATE".parse::<SortBy>().unwrap(), SortBy::Date);
        assert_eq!(
            "title".parse::<SortBy>().unwrap_err(),
            QueryError::InvalidSortKey("title".into())
        );
    }

    #[test]
    fn test_sort_direction_from_str() {
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!("Desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!(matches!(
            "up".parse::<SortDirection>(),
            Err(QueryError::InvalidSortDirection(_))
        ));
    }

    #[test]
    fn test_parse_collection_requires_array() {
        assert_eq!(parse_collection("[1, 2]").unwrap().len(), 2);
        let err = parse_collection(r#"{"a": 1}"#).unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidCollection("expected a JSON array, found an object".into())
        );
        assert!(matches!(
            parse_collection("not json"),
            Err(QueryError::InvalidCollection(_))
        ));
    }
}
