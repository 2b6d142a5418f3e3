//! In-memory record tables.
//!
//! Every table hands out monotonically increasing ids starting at 1 and keeps
//! a per-row version that starts at 1 and grows by one on each update. Rows
//! that belong to a parent record (conditions of an SLA, comments of a case)
//! carry that parent as their scope and are invisible through any other one.

mod query;
mod records;

pub use query::{
    field_names, FieldMask, ListQuery, PageLimits, Pattern, SortKey, SortOrder, SortSpec, ToSortKey,
};
pub use records::Record;

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

/// Errors raised by [`Store`] operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No row with the given key exists in the requested scope.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind.
        kind: &'static str,
        /// Requested id.
        id: i64,
    },
    /// The caller's version is stale.
    #[error("{kind} {id} was modified: expected version {expected}, current version {actual}")]
    VersionMismatch {
        /// Record kind.
        kind: &'static str,
        /// Requested id.
        id: i64,
        /// Version the caller had.
        expected: i32,
        /// Version currently stored.
        actual: i32,
    },
    /// The `q` search expression could not be compiled.
    #[error("invalid search expression: {0}")]
    InvalidSearch(String),
}

/// A stored value together with its row version.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// Row version, starting at 1.
    pub ver: i32,
    /// Stored value.
    pub value: T,
}

/// Key of a row access: id, optional parent scope and optional expected version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRef {
    /// Row id.
    pub id: i64,
    /// Parent the row must belong to.
    pub scope: Option<i64>,
    /// Version the row must currently have.
    pub ver: Option<i32>,
}

impl RowRef {
    /// Reference a row by id only.
    #[must_use]
    pub const fn id(id: i64) -> Self {
        Self {
            id,
            scope: None,
            ver: None,
        }
    }

    /// Require the row to belong to `scope`.
    #[must_use]
    pub const fn in_scope(mut self, scope: i64) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Require the row to be at version `ver` when given.
    #[must_use]
    pub const fn at_version(mut self, ver: Option<i32>) -> Self {
        self.ver = ver;
        self
    }
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// One-based page number that was served.
    pub page: i32,
    /// Whether another page follows.
    pub next: bool,
    /// Rows of the page, already projected.
    pub items: Vec<Versioned<T>>,
}

impl<T> Page<T> {
    /// Drop row versions.
    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        self.items.into_iter().map(|row| row.value).collect()
    }
}

/// A thread-safe in-memory table of `T` records.
#[derive(Debug)]
pub struct Store<T> {
    rows: RwLock<BTreeMap<i64, Versioned<T>>>,
    seq: AtomicI64,
}

impl<T: Record> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Store<T> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            seq: AtomicI64::new(0),
        }
    }

    const fn not_found(id: i64) -> StoreError {
        StoreError::NotFound { kind: T::KIND, id }
    }

    fn check(key: RowRef, row: &Versioned<T>) -> Result<(), StoreError> {
        if key.scope.is_some_and(|scope| row.value.scope() != Some(scope)) {
            return Err(Self::not_found(key.id));
        }
        match key.ver {
            Some(expected) if expected != row.ver => Err(StoreError::VersionMismatch {
                kind: T::KIND,
                id: key.id,
                expected,
                actual: row.ver,
            }),
            _ => Ok(()),
        }
    }

    /// Insert a new record, assigning its id. The stored row is returned.
    pub fn insert(&self, mut value: T) -> Versioned<T> {
        let id = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        value.set_id(id);
        let row = Versioned { ver: 1, value };
        self.rows.write().insert(id, row.clone());
        row
    }

    /// Fetch a row. The version in `key` is checked when present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the row is missing or outside the
    /// requested scope, [`StoreError::VersionMismatch`] on a stale version.
    pub fn get(&self, key: RowRef) -> Result<Versioned<T>, StoreError> {
        let rows = self.rows.read();
        let row = rows.get(&key.id).ok_or_else(|| Self::not_found(key.id))?;
        Self::check(key, row)?;
        Ok(row.clone())
    }

    /// Whether a row with `id` exists.
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.rows.read().contains_key(&id)
    }

    /// Modify a row in place. The closure sees the current value; when it
    /// fails the row is left untouched. On success the version is bumped.
    ///
    /// # Errors
    ///
    /// Returns the store error converted into `E` if the row cannot be
    /// addressed, or whatever the closure returns.
    pub fn update<E, F>(&self, key: RowRef, f: F) -> Result<Versioned<T>, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let mut rows = self.rows.write();
        let row = rows.get_mut(&key.id).ok_or_else(|| Self::not_found(key.id))?;
        Self::check(key, row)?;

        let mut value = row.value.clone();
        f(&mut value)?;
        value.set_id(key.id);
        row.value = value;
        row.ver += 1;
        Ok(row.clone())
    }

    /// Remove a row after `check` approves the current value.
    ///
    /// # Errors
    ///
    /// Returns the store error converted into `E` if the row cannot be
    /// addressed, or whatever `check` returns.
    pub fn remove_with<E, F>(&self, key: RowRef, check: F) -> Result<Versioned<T>, E>
    where
        E: From<StoreError>,
        F: FnOnce(&T) -> Result<(), E>,
    {
        let mut rows = self.rows.write();
        let row = rows.get(&key.id).ok_or_else(|| Self::not_found(key.id))?;
        Self::check(key, row)?;
        check(&row.value)?;
        Ok(rows.remove(&key.id).ok_or_else(|| Self::not_found(key.id))?)
    }

    /// Remove a row.
    ///
    /// # Errors
    ///
    /// See [`Store::get`].
    pub fn remove(&self, key: RowRef) -> Result<Versioned<T>, StoreError> {
        self.remove_with(key, |_| Ok(()))
    }

    /// Remove every row of a scope, returning how many were removed.
    pub fn remove_scope(&self, scope: i64) -> usize {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, row| row.value.scope() != Some(scope));
        before - rows.len()
    }

    /// Apply `f` to every row of a scope; rows for which it returns `true`
    /// are considered changed and get their version bumped.
    pub fn modify_scope<F>(&self, scope: i64, f: F) -> usize
    where
        F: FnMut(&mut T) -> bool,
    {
        self.modify_where(|value| value.scope() == Some(scope), f)
    }

    /// Like [`Store::modify_scope`], over every row of the table.
    pub fn modify_all<F>(&self, f: F) -> usize
    where
        F: FnMut(&mut T) -> bool,
    {
        self.modify_where(|_| true, f)
    }

    fn modify_where<P, F>(&self, select: P, mut f: F) -> usize
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T) -> bool,
    {
        let mut rows = self.rows.write();
        let mut changed = 0;
        for row in rows.values_mut().filter(|row| select(&row.value)) {
            if f(&mut row.value) {
                row.ver += 1;
                changed += 1;
            }
        }
        changed
    }

    /// Snapshot of every row of a scope in id order.
    #[must_use]
    pub fn scope_rows(&self, scope: i64) -> Vec<Versioned<T>> {
        self.rows
            .read()
            .values()
            .filter(|row| row.value.scope() == Some(scope))
            .cloned()
            .collect()
    }

    /// List rows matching the query, optionally restricted to a scope.
    #[must_use]
    pub fn list(&self, scope: Option<i64>, query: &ListQuery) -> Page<T> {
        self.list_filtered(scope, query, |_| true)
    }

    /// List rows matching the query and an extra predicate.
    #[must_use]
    pub fn list_filtered<F>(&self, scope: Option<i64>, query: &ListQuery, filter: F) -> Page<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut matched: Vec<Versioned<T>> = self
            .rows
            .read()
            .values()
            .filter(|row| scope.is_none_or(|s| row.value.scope() == Some(s)))
            .filter(|row| query.accepts_id(row.value.id()))
            .filter(|row| query.accepts_text(row.value.search_text()))
            .filter(|row| filter(&row.value))
            .cloned()
            .collect();

        if !query.sort_specs().is_empty() {
            matched.sort_by(|a, b| {
                query.compare(a.value.id(), b.value.id(), |first, field| {
                    if first {
                        a.value.sort_key(field)
                    } else {
                        b.value.sort_key(field)
                    }
                })
            });
        }

        let total = matched.len();
        let offset = query.offset();
        let items: Vec<Versioned<T>> = matched
            .into_iter()
            .skip(offset)
            .take(query.size())
            .map(|row| Versioned {
                ver: row.ver,
                value: row.value.project(query.projection()),
            })
            .collect();
        let next = offset.saturating_add(items.len()) < total;

        Page {
            page: i32::try_from(query.page()).unwrap_or(i32::MAX),
            next,
            items,
        }
    }
}
