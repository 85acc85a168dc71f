//! Three-bucket ordering for content collections.
//!
//! Authors control placement with an optional `order` value:
//!
//! | `order`   | bucket      | placement                                     |
//! |-----------|-------------|-----------------------------------------------|
//! | `>= 0`    | positive    | first, ascending by value                      |
//! | absent    | unordered   | middle, newest date first                      |
//! | `< 0`     | negative    | last, descending by value (`-1` before `-2`)   |
//!
//! Every tie falls back to the item's position in the input, so the sort is
//! stable and running it twice gives the same sequence.
//!
//! Inside the unordered bucket only items with a date take part in the date
//! comparison. Undated items keep the slots they occupied in the input and the
//! dated items are laid out newest first around them.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::date::parse_date;
use crate::item::ContentItem;

/// Reads the order value from an item.
pub type OrderAccessor<T> = Arc<dyn Fn(&T) -> Option<i64> + Send + Sync>;

/// Reads the date token from an item.
pub type DateAccessor<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// The partition an item is placed in by its order value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Positive,
    Unordered,
    Negative,
}

impl Bucket {
    pub fn classify(order: Option<i64>) -> Bucket {
        match order {
            None => Bucket::Unordered,
            Some(n) if n >= 0 => Bucket::Positive,
            Some(_) => Bucket::Negative,
        }
    }
}

/// Key accessors and the "now" anchor for [`sort_by_order`].
pub struct SortOptions<T> {
    /// Instant that `"present"` dates resolve to.
    pub anchor: DateTime<Utc>,
    order: Option<OrderAccessor<T>>,
    date: Option<DateAccessor<T>>,
}

impl<T> SortOptions<T> {
    /// Options with no accessors: every item is unordered and undated, so
    /// the output keeps the input order.
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            order: None,
            date: None,
        }
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

    pub fn without_order(mut self) -> Self {
        self.order = None;
        self
    }

    pub fn without_date(mut self) -> Self {
        self.date = None;
        self
    }

    pub(crate) fn with_accessors(
        anchor: DateTime<Utc>,
        order: Option<OrderAccessor<T>>,
        date: Option<DateAccessor<T>>,
    ) -> Self {
        Self {
            anchor,
            order,
            date,
        }
    }

    pub fn order_of(&self, item: &T) -> Option<i64> {
        self.order.as_ref().and_then(|f| f(item))
    }

    /// Parsed timestamp, or `None` when the item has no usable date token.
    /// A present but malformed token still resolves (to `0`).
    pub fn timestamp_of(&self, item: &T) -> Option<i64> {
        let token = self.date.as_ref().and_then(|f| f(item))?;
        if token.is_empty() {
            return None;
        }
        Some(parse_date(self.anchor, &token))
    }

    pub fn bucket_of(&self, item: &T) -> Bucket {
        Bucket::classify(self.order_of(item))
    }
}

impl<T: ContentItem + 'static> SortOptions<T> {
    /// Options that read [`ContentItem::order`] and [`ContentItem::date`].
    pub fn from_item(anchor: DateTime<Utc>) -> Self {
        Self::new(anchor)
            .order_by(|item: &T| item.order())
            .date_by(|item: &T| item.date().map(str::to_owned))
    }
}

impl<T> Clone for SortOptions<T> {
    fn clone(&self) -> Self {
        Self {
            anchor: self.anchor,
            order: self.order.clone(),
            date: self.date.clone(),
        }
    }
}

impl<T> fmt::Debug for SortOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortOptions")
            .field("anchor", &self.anchor)
            .field("order", &self.order.is_some())
            .field("date", &self.date.is_some())
            .finish()
    }
}

/// Sort a collection into positive, unordered and negative buckets.
///
/// Returns a new vector of the same length; `items` is left untouched.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use content_order::order::{sort_by_order, SortOptions};
///
/// #[derive(Clone)]
/// struct Post { title: &'static str, order: Option<i64>, date: &'static str }
///
/// let posts = vec![
///     Post { title: "archived", order: Some(-1), date: "2019" },
///     Post { title: "older", order: None, date: "2023-01" },
///     Post { title: "pinned", order: Some(1), date: "2020" },
///     Post { title: "newer", order: None, date: "2025-01" },
/// ];
/// let options = SortOptions::new(Utc::now())
///     .order_by(|p: &Post| p.order)
///     .date_by(|p: &Post| Some(p.date.to_string()));
///
/// let titles: Vec<_> = sort_by_order(&posts, &options).iter().map(|p| p.title).collect();
/// assert_eq!(titles, ["pinned", "newer", "older", "archived"]);
/// ```
pub fn sort_by_order<T: Clone>(items: &[T], options: &SortOptions<T>) -> Vec<T> {
    sort_indices(items, options)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

/// The permutation [`sort_by_order`] applies: `result[k]` is the input index
/// of the item that ends up at position `k`.
pub fn sort_indices<T>(items: &[T], options: &SortOptions<T>) -> Vec<usize> {
    permutation(items.iter(), options)
}

/// Core of the engine, shared with the collection query so it can sort
/// borrowed survivors of a filter without cloning them first.
pub(crate) fn permutation<'a, T: 'a>(
    items: impl Iterator<Item = &'a T>,
    options: &SortOptions<T>,
) -> Vec<usize> {
    let mut positive: Vec<(usize, i64)> = Vec::new();
    let mut negative: Vec<(usize, i64)> = Vec::new();
    let mut unordered: Vec<(usize, Option<i64>)> = Vec::new();
    let mut len = 0;

    for (index, item) in items.enumerate() {
        len += 1;
        match options.order_of(item) {
            Some(order) if order >= 0 => positive.push((index, order)),
            Some(order) => negative.push((index, order)),
            None => unordered.push((index, options.timestamp_of(item))),
        }
    }

    trace!(
        target: "content_order",
        positive = positive.len(),
        unordered = unordered.len(),
        negative = negative.len(),
        "Partitioned collection"
    );

    positive.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    negative.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut sorted = Vec::with_capacity(len);
    sorted.extend(positive.into_iter().map(|(index, _)| index));
    sorted.extend(order_unordered(unordered));
    sorted.extend(negative.into_iter().map(|(index, _)| index));
    sorted
}

/// Newest-first layout of the unordered bucket. Dated entries are sorted by
/// timestamp (index breaks ties) and poured back into the slots dated entries
/// held; undated entries stay where they were.
fn order_unordered(bucket: Vec<(usize, Option<i64>)>) -> Vec<usize> {
    let mut dated: Vec<(usize, i64)> = bucket
        .iter()
        .filter_map(|&(index, ts)| ts.map(|ts| (index, ts)))
        .collect();
    dated.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut dated = dated.into_iter().map(|(index, _)| index);
    bucket
        .into_iter()
        .filter_map(|(index, ts)| match ts {
            Some(_) => dated.next(),
            None => Some(index),
        })
        .collect()
}
