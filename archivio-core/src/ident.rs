//! External and internal identifiers.
//!
//! An [`ExternalId`] names an entity in some third-party namespace (a
//! ticker, an ISIN, a vendor code). Several external ids that refer to the
//! same entity travel together as an [`ExternalIdBundle`]; each bundled id
//! may carry a validity window, since vendors recycle tickers over time.
//! [`ObjectId`] and [`UniqueId`] identify records inside a master.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An identifier namespace, e.g. `"TICKER"` or `"ISIN"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalScheme(Arc<str>);

impl ExternalScheme {
    /// Create a scheme from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The scheme name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `(scheme, value)` external identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalId {
    scheme: ExternalScheme,
    value: String,
}

impl ExternalId {
    /// Create an identifier from a scheme name and value.
    pub fn new(scheme: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self {
            scheme: ExternalScheme::new(scheme),
            value: value.into(),
        }
    }

    /// The identifier's scheme.
    #[must_use]
    pub fn scheme(&self) -> &ExternalScheme {
        &self.scheme
    }

    /// The identifier's value within its scheme.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.scheme, self.value)
    }
}

/// An external identifier annotated with an optional validity window.
///
/// Both bounds are inclusive; a missing bound is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalIdWithDates {
    id: ExternalId,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
}

impl ExternalIdWithDates {
    /// Wrap an identifier with no validity restriction.
    #[must_use]
    pub fn always(id: ExternalId) -> Self {
        Self {
            id,
            valid_from: None,
            valid_to: None,
        }
    }

    /// Wrap an identifier valid over `[valid_from, valid_to]`.
    #[must_use]
    pub fn between(id: ExternalId, valid_from: Option<NaiveDate>, valid_to: Option<NaiveDate>) -> Self {
        Self {
            id,
            valid_from,
            valid_to,
        }
    }

    /// The wrapped identifier.
    #[must_use]
    pub fn id(&self) -> &ExternalId {
        &self.id
    }

    /// Inclusive start of validity, if restricted.
    #[must_use]
    pub fn valid_from(&self) -> Option<NaiveDate> {
        self.valid_from
    }

    /// Inclusive end of validity, if restricted.
    #[must_use]
    pub fn valid_to(&self) -> Option<NaiveDate> {
        self.valid_to
    }

    /// Whether the identifier is valid on `date`. `None` means "no date
    /// constraint" and always matches.
    #[must_use]
    pub fn is_valid_on(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else { return true };
        self.valid_from.is_none_or(|from| from <= date)
            && self.valid_to.is_none_or(|to| date <= to)
    }
}

impl From<ExternalId> for ExternalIdWithDates {
    fn from(id: ExternalId) -> Self {
        Self::always(id)
    }
}

/// An immutable, unordered set of external identifiers that are considered
/// equivalent references to one entity.
///
/// Equality is set equality; internally ids are kept sorted so iteration is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalIdBundle {
    ids: BTreeSet<ExternalIdWithDates>,
}

impl ExternalIdBundle {
    /// The empty bundle.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a bundle from undated identifiers.
    pub fn of<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ExternalId>,
    {
        Self {
            ids: ids.into_iter().map(ExternalIdWithDates::always).collect(),
        }
    }

    /// Build a bundle from dated identifiers.
    pub fn of_dated<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ExternalIdWithDates>,
    {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Number of identifiers in the bundle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the bundle holds no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate the dated identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &ExternalIdWithDates> {
        self.ids.iter()
    }

    /// The identifiers valid on `date` (all of them when `date` is `None`).
    #[must_use]
    pub fn ids_valid_on(&self, date: Option<NaiveDate>) -> Vec<&ExternalId> {
        self.ids
            .iter()
            .filter(|d| d.is_valid_on(date))
            .map(ExternalIdWithDates::id)
            .collect()
    }

    /// Whether any identifier in this bundle, valid on `date`, also appears
    /// in `other` (ignoring `other`'s validity windows).
    #[must_use]
    pub fn intersects_on(&self, other: &ExternalIdBundle, date: Option<NaiveDate>) -> bool {
        self.ids
            .iter()
            .filter(|d| d.is_valid_on(date))
            .any(|d| other.ids.iter().any(|o| o.id() == d.id()))
    }

    /// Whether the bundle contains `id`, ignoring validity windows.
    #[must_use]
    pub fn contains(&self, id: &ExternalId) -> bool {
        self.ids.iter().any(|d| d.id() == id)
    }
}

impl FromIterator<ExternalId> for ExternalIdBundle {
    fn from_iter<I: IntoIterator<Item = ExternalId>>(iter: I) -> Self {
        Self::of(iter)
    }
}

/// Identity of a record inside a master, stable across versions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    scheme: String,
    value: String,
}

impl ObjectId {
    /// Create an object id from a scheme and value.
    pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            value: value.into(),
        }
    }

    /// The master scheme that issued this id.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The value within the scheme.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.scheme, self.value)
    }
}

/// A versioned record identity: an [`ObjectId`] plus a version number.
///
/// Version `0` means "latest" by convention; masters assign versions
/// starting at `1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniqueId {
    object_id: ObjectId,
    version: u64,
}

impl UniqueId {
    /// Version number that addresses the latest version of a record.
    pub const LATEST: u64 = 0;

    /// Create a unique id for a specific version.
    #[must_use]
    pub fn versioned(object_id: ObjectId, version: u64) -> Self {
        Self { object_id, version }
    }

    /// Create a unique id addressing the latest version of `object_id`.
    #[must_use]
    pub fn latest(object_id: ObjectId) -> Self {
        Self::versioned(object_id, Self::LATEST)
    }

    /// The stable record identity.
    #[must_use]
    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    /// The addressed version; [`Self::LATEST`] means latest.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether this id addresses the latest version.
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.version == Self::LATEST
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~v{}", self.object_id, self.version)
    }
}

impl From<ObjectId> for UniqueId {
    fn from(object_id: ObjectId) -> Self {
        Self::latest(object_id)
    }
}
