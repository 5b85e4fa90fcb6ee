/// Incremental sync deltas
///
/// Clients keep a local copy of each sync scope (their groups, a group's meals, one
/// meal's preferences) and ask for "what changed since T". The answer is always two
/// disjoint lists:
///
/// - `items`: live rows with `updated_at > T`
/// - `deletedIds`: ids of soft-deleted rows with `deleted_at >= T`
///
/// Without a watermark the answer is every live row and no tombstones.
///
/// The store query only narrows the candidate set; [`SyncDelta::partition`] decides what
/// goes where, and [`SyncDelta::apply_to`] is the merge a client performs with the result.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use mealplan_shared::sync::{SyncDelta, Versioned};
/// use std::collections::BTreeMap;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Row { id: u32, updated_at: chrono::DateTime<Utc>, deleted_at: Option<chrono::DateTime<Utc>> }
///
/// impl Versioned for Row {
///     type Id = u32;
///     fn id(&self) -> u32 { self.id }
///     fn updated_at(&self) -> chrono::DateTime<Utc> { self.updated_at }
///     fn deleted_at(&self) -> Option<chrono::DateTime<Utc>> { self.deleted_at }
/// }
///
/// let t = Utc::now();
/// let later = t + Duration::seconds(5);
/// let rows = vec![
///     Row { id: 1, updated_at: later, deleted_at: None },
///     Row { id: 2, updated_at: later, deleted_at: Some(later) },
/// ];
///
/// let delta = SyncDelta::partition(rows, Some(t));
/// assert_eq!(delta.items.len(), 1);
/// assert_eq!(delta.deleted_ids, vec![2]);
///
/// let mut local = BTreeMap::new();
/// delta.apply_to(&mut local);
/// assert!(local.contains_key(&1));
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A row that carries sync watermarks
pub trait Versioned {
    type Id: Clone + Ord;

    fn id(&self) -> Self::Id;
    fn updated_at(&self) -> DateTime<Utc>;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
}

/// How a row relates to a watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Live,
    Tombstone,
    Unchanged,
}

/// Classifies one row against the client's watermark
pub fn classify<T: Versioned>(row: &T, since: Option<DateTime<Utc>>) -> Change {
    match (row.deleted_at(), since) {
        (None, None) => Change::Live,
        (None, Some(t)) if row.updated_at() > t => Change::Live,
        (Some(deleted_at), Some(t)) if deleted_at >= t => Change::Tombstone,
        _ => Change::Unchanged,
    }
}

/// Sync response body: `{ "items": [...], "deletedIds": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "T: Serialize, T::Id: Serialize"))]
pub struct SyncDelta<T: Versioned> {
    pub items: Vec<T>,
    pub deleted_ids: Vec<T::Id>,
}

impl<T: Versioned> SyncDelta<T> {
    /// Splits candidate rows into live items and tombstone ids
    ///
    /// Rows that did not change since `since` are dropped, so passing a superset of
    /// the scope's changes is fine.
    pub fn partition(rows: Vec<T>, since: Option<DateTime<Utc>>) -> Self {
        let mut items = Vec::new();
        let mut deleted_ids = Vec::new();

        for row in rows {
            match classify(&row, since) {
                Change::Live => items.push(row),
                Change::Tombstone => deleted_ids.push(row.id()),
                Change::Unchanged => {}
            }
        }

        SyncDelta { items, deleted_ids }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.deleted_ids.is_empty()
    }

    /// Merges the delta into a client-side snapshot
    pub fn apply_to(self, snapshot: &mut BTreeMap<T::Id, T>) {
        for id in &self.deleted_ids {
            snapshot.remove(id);
        }
        for item in self.items {
            snapshot.insert(item.id(), item);
        }
    }
}
