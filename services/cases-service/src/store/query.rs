//! List query options: paging, search, sorting, projection and field masks.

use super::StoreError;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

/// Paging limits applied to every list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default_size: usize,
    max_size: usize,
}

impl PageLimits {
    /// Create limits; both values are clamped to at least one.
    #[must_use]
    pub fn new(default_size: usize, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            default_size: default_size.clamp(1, max_size),
            max_size,
        }
    }

    /// Size used when a request does not ask for one.
    #[must_use]
    pub const fn default_size(&self) -> usize {
        self.default_size
    }

    /// Largest page a request may ask for.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(16, 1000)
    }
}

/// Comparable value of a record field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    /// Boolean flag.
    Flag(bool),
    /// Integer value.
    Int(i64),
    /// Case-folded text.
    Text(String),
}

/// Conversion of record field values into [`SortKey`]s.
pub trait ToSortKey {
    /// Sort key of the value.
    fn to_sort_key(&self) -> SortKey;
}

impl ToSortKey for i64 {
    fn to_sort_key(&self) -> SortKey {
        SortKey::Int(*self)
    }
}

impl ToSortKey for i32 {
    fn to_sort_key(&self) -> SortKey {
        SortKey::Int(i64::from(*self))
    }
}

impl ToSortKey for bool {
    fn to_sort_key(&self) -> SortKey {
        SortKey::Flag(*self)
    }
}

impl ToSortKey for String {
    fn to_sort_key(&self) -> SortKey {
        SortKey::Text(self.to_lowercase())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// One `sort` term, e.g. `-created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field name.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Parse a comma separated sort expression such as `name,-id`.
    ///
    /// A leading `-` sorts descending, a leading `+` or none ascending.
    /// Empty terms are skipped.
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .filter_map(|term| {
                let (order, field) = match term.as_bytes()[0] {
                    b'-' => (SortOrder::Desc, &term[1..]),
                    b'+' => (SortOrder::Asc, &term[1..]),
                    _ => (SortOrder::Asc, term),
                };
                let field = field.trim();
                (!field.is_empty()).then(|| Self {
                    field: field.to_lowercase(),
                    order,
                })
            })
            .collect()
    }
}

/// Search expression matched against a record's search text.
///
/// Plain text matches as a case-insensitive substring. Text containing `*`
/// (any run) or `?` (any single character) must match the whole value.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Build a pattern; blank input yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the compiled expression exceeds the regex size
    /// limit.
    pub fn parse(raw: &str) -> Result<Option<Self>, regex::Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let expr = if raw.contains(['*', '?']) {
            let mut expr = String::from("^");
            for c in raw.chars() {
                match c {
                    '*' => expr.push_str(".*"),
                    '?' => expr.push('.'),
                    _ => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
                }
            }
            expr.push('$');
            expr
        } else {
            regex::escape(raw)
        };

        let regex = RegexBuilder::new(&expr)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Some(Self { regex }))
    }

    /// Whether `text` satisfies the pattern.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
    }
}

impl Eq for Pattern {}

/// Normalize `fields` style inputs that may carry comma separated names.
pub fn field_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .flat_map(|name| name.split(','))
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Normalized options of a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    page: usize,
    size: usize,
    search: Option<Pattern>,
    sort: Vec<SortSpec>,
    fields: Vec<String>,
    ids: Vec<i64>,
}

impl ListQuery {
    /// Normalize raw paging input: non-positive pages become 1, non-positive
    /// sizes take the default, and sizes are capped at the maximum.
    #[must_use]
    pub fn new(page: i32, size: i32, limits: PageLimits) -> Self {
        let page = usize::try_from(page).ok().filter(|p| *p > 0).unwrap_or(1);
        let size = usize::try_from(size)
            .ok()
            .filter(|s| *s > 0)
            .map_or(limits.default_size(), |s| s.min(limits.max_size()));

        Self {
            page,
            size,
            search: None,
            sort: Vec::new(),
            fields: Vec::new(),
            ids: Vec::new(),
        }
    }

    /// Restrict results to records whose search text matches `q`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSearch`] if `q` cannot be compiled.
    pub fn search(mut self, q: &str) -> Result<Self, StoreError> {
        self.search = Pattern::parse(q).map_err(|e| StoreError::InvalidSearch(e.to_string()))?;
        Ok(self)
    }

    /// Sort by a comma separated expression.
    #[must_use]
    pub fn sort(mut self, sort: &str) -> Self {
        self.sort = SortSpec::parse_list(sort);
        self
    }

    /// Project results onto the given fields.
    #[must_use]
    pub fn fields(mut self, fields: &[String]) -> Self {
        self.fields = field_names(fields);
        self
    }

    /// Restrict results to the given ids.
    #[must_use]
    pub fn ids(mut self, ids: &[i64]) -> Self {
        self.ids = ids.to_vec();
        self
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Requested projection; empty means every field.
    #[must_use]
    pub fn projection(&self) -> &[String] {
        &self.fields
    }

    /// Requested sort terms.
    #[must_use]
    pub fn sort_specs(&self) -> &[SortSpec] {
        &self.sort
    }

    pub(crate) fn accepts_id(&self, id: i64) -> bool {
        self.ids.is_empty() || self.ids.contains(&id)
    }

    pub(crate) fn accepts_text(&self, text: &str) -> bool {
        self.search.as_ref().is_none_or(|p| p.matches(text))
    }

    /// Number of rows preceding the requested page.
    pub(crate) const fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.size)
    }

    /// Compare two rows by the sort terms, falling back to id order.
    pub(crate) fn compare<F>(&self, a_id: i64, b_id: i64, key: F) -> Ordering
    where
        F: Fn(bool, &str) -> Option<SortKey>,
    {
        for spec in &self.sort {
            let ordering = match (key(true, &spec.field), key(false, &spec.field)) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => continue,
            };
            let ordering = match spec.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a_id.cmp(&b_id)
    }
}

/// Field mask of an update request (`x_json_mask`).
///
/// An empty mask selects every field. Nested paths such as `calendar.id`
/// select their top-level field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    paths: Vec<String>,
}

impl FieldMask {
    /// Build a mask from raw request paths.
    #[must_use]
    pub fn new(paths: &[String]) -> Self {
        Self {
            paths: field_names(paths),
        }
    }

    /// Whether the mask selects every field.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `field` is selected.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.is_full()
            || self.paths.iter().any(|path| {
                path == field
                    || path
                        .strip_prefix(field)
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }
}
