//! Index values: the per-dimension [`IndexEntry`] sum type and the
//! multi-dimensional, optionally labeled [`ComponentIndex`].
//!
//! A `ComponentIndex` is a pure value. It performs no bounds checking
//! and knows nothing about the domain it will be applied to; that is
//! the job of [`crate::domain::IndexDomain`] and the expansion
//! machinery built on top of it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use enum_as_inner::EnumAsInner;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ComponentError;

/// A single numeric coordinate. Discrete domains only accept
/// [`Scalar::Int`]; continuous domains accept both.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Scalar {
    Int(i64),
    Real(f64),
}

impl Scalar {
    /// The integral value, if this is an integer scalar.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Real(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::Int(v) => *v as f64,
            Scalar::Real(v) => *v,
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Scalar::Int(v) => *v < 0,
            Scalar::Real(v) => *v < 0.0,
        }
    }

    /// Numeric comparison across representations.
    pub(crate) fn total_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

// Equality is structural: `Int(1)` and `Real(1.0)` are different
// entries, and reals compare by bit pattern so that `Eq` and `Hash`
// stay consistent.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Real(a), Scalar::Real(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Scalar::Int(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Scalar::Real(v) => {
                1u8.hash(state);
                v.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            // `{:?}` keeps the decimal point on integral reals, so the
            // rendered form parses back as a real.
            Scalar::Real(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Real(v)
    }
}

/// A range of coordinates `start:stop:step`. Any part may be left
/// open. Unlike Rust ranges, a non-negative `stop` is *inclusive*,
/// matching the host's addressing.
///
/// Ranges are convertible from the inclusive native Rust ranges:
/// `2..=5`, `2..`, `..=5` and `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range(
    pub Option<Scalar>,
    pub Option<Scalar>,
    pub Option<Scalar>,
);

impl Range {
    /// The fully open range `:`.
    pub fn full() -> Self {
        Range(None, None, None)
    }

    /// The inclusive integer range `start:stop`.
    pub fn closed(start: i64, stop: i64) -> Self {
        Range(Some(Scalar::Int(start)), Some(Scalar::Int(stop)), None)
    }

    /// The same range with the given step.
    pub fn step_by<S: Into<Scalar>>(self, step: S) -> Self {
        Range(self.0, self.1, Some(step.into()))
    }

    pub fn start(&self) -> Option<Scalar> {
        self.0
    }

    pub fn stop(&self) -> Option<Scalar> {
        self.1
    }

    pub fn step(&self) -> Option<Scalar> {
        self.2
    }

    /// True when no part of the range is specified.
    pub fn is_full(&self) -> bool {
        self.0.is_none() && self.1.is_none() && self.2.is_none()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = &self.0 {
            write!(f, "{}", start)?;
        }
        write!(f, ":")?;
        if let Some(stop) = &self.1 {
            write!(f, "{}", stop)?;
        }
        if let Some(step) = &self.2 {
            write!(f, ":{}", step)?;
        }
        Ok(())
    }
}

impl From<std::ops::RangeInclusive<i64>> for Range {
    fn from(r: std::ops::RangeInclusive<i64>) -> Self {
        Range::closed(*r.start(), *r.end())
    }
}

impl From<std::ops::RangeFrom<i64>> for Range {
    fn from(r: std::ops::RangeFrom<i64>) -> Self {
        Range(Some(Scalar::Int(r.start)), None, None)
    }
}

impl From<std::ops::RangeToInclusive<i64>> for Range {
    fn from(r: std::ops::RangeToInclusive<i64>) -> Self {
        Range(None, Some(Scalar::Int(r.end)), None)
    }
}

impl From<std::ops::RangeFull> for Range {
    fn from(_: std::ops::RangeFull) -> Self {
        Range::full()
    }
}

/// One dimension of a [`ComponentIndex`].
///
/// The kind of an entry is decided once, at construction: a fully
/// open range always becomes [`IndexEntry::Wildcard`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumAsInner)]
pub enum IndexEntry {
    /// A single coordinate.
    Scalar(Scalar),

    /// A partially or fully bounded range of coordinates.
    Range(Range),

    /// Every coordinate along the dimension.
    Wildcard,

    /// A collection of alternatives for this dimension. Members must
    /// not themselves be nested.
    Nested(Vec<IndexEntry>),
}

impl IndexEntry {
    /// A nested collection of the given entries.
    pub fn nested<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<IndexEntry>,
    {
        IndexEntry::Nested(entries.into_iter().map(Into::into).collect())
    }

    /// The range covered by this entry: wildcards are the full
    /// range, scalars and collections have none.
    pub fn to_range(&self) -> Option<Range> {
        match self {
            IndexEntry::Range(range) => Some(range.clone()),
            IndexEntry::Wildcard => Some(Range::full()),
            _ => None,
        }
    }
}

impl fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexEntry::Scalar(v) => write!(f, "{}", v),
            IndexEntry::Range(r) => write!(f, "{}", r),
            IndexEntry::Wildcard => write!(f, "*"),
            IndexEntry::Nested(entries) => write!(f, "{}", entries.iter().join(",")),
        }
    }
}

impl From<Scalar> for IndexEntry {
    fn from(v: Scalar) -> Self {
        IndexEntry::Scalar(v)
    }
}

impl From<i64> for IndexEntry {
    fn from(v: i64) -> Self {
        IndexEntry::Scalar(Scalar::Int(v))
    }
}

impl From<f64> for IndexEntry {
    fn from(v: f64) -> Self {
        IndexEntry::Scalar(Scalar::Real(v))
    }
}

impl From<Range> for IndexEntry {
    fn from(r: Range) -> Self {
        if r.is_full() {
            IndexEntry::Wildcard
        } else {
            IndexEntry::Range(r)
        }
    }
}

impl From<std::ops::RangeInclusive<i64>> for IndexEntry {
    fn from(r: std::ops::RangeInclusive<i64>) -> Self {
        Range::from(r).into()
    }
}

impl From<std::ops::RangeFrom<i64>> for IndexEntry {
    fn from(r: std::ops::RangeFrom<i64>) -> Self {
        Range::from(r).into()
    }
}

impl From<std::ops::RangeToInclusive<i64>> for IndexEntry {
    fn from(r: std::ops::RangeToInclusive<i64>) -> Self {
        Range::from(r).into()
    }
}

impl From<std::ops::RangeFull> for IndexEntry {
    fn from(_: std::ops::RangeFull) -> Self {
        IndexEntry::Wildcard
    }
}

impl From<Vec<IndexEntry>> for IndexEntry {
    fn from(entries: Vec<IndexEntry>) -> Self {
        IndexEntry::Nested(entries)
    }
}

/// A multi-dimensional component index with an optional label.
///
/// If the index is shorter than the dimensionality of the domain it
/// is applied to, the remaining trailing dimensions are taken to be
/// complete (as if indexed by `*`).
///
/// The label is used by domains that can address the same geometry
/// under several names: an isoparm may be `u`, `v` or `uv`, a pivot
/// may be `rotatePivot` or `scalePivot`. Equality and hashing include
/// the label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentIndex {
    entries: Vec<IndexEntry>,
    label: Option<String>,
}

impl ComponentIndex {
    /// Creates a new, unlabeled index from the given entries.
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self {
            entries,
            label: None,
        }
    }

    /// The empty index with the given (optional) label.
    pub fn empty(label: Option<String>) -> Self {
        Self {
            entries: Vec::new(),
            label,
        }
    }

    /// An unlabeled, all-integer index.
    pub fn from_ints<I: IntoIterator<Item = i64>>(values: I) -> Self {
        Self::new(values.into_iter().map(IndexEntry::from).collect())
    }

    /// The same index, carrying `label`.
    pub fn with_label<L: Into<String>>(self, label: L) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }

    pub(crate) fn with_label_opt(self, label: Option<String>) -> Self {
        Self { label, ..self }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Orders two concrete indices by their coordinates, dimension by
    /// dimension, with shorter indices first on a shared prefix.
    /// Entries that are not scalars compare equal.
    pub(crate) fn coordinate_cmp(&self, other: &ComponentIndex) -> Ordering {
        self.entries
            .iter()
            .zip(&other.entries)
            .map(|pair| match pair {
                (IndexEntry::Scalar(a), IndexEntry::Scalar(b)) => a.total_cmp(b),
                _ => Ordering::Equal,
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.len().cmp(&other.len()))
    }

    /// The entry at dimension `dim`, if specified.
    pub fn get(&self, dim: usize) -> Option<&IndexEntry> {
        self.entries.get(dim)
    }

    /// Concatenates two indices. A missing label adopts the other
    /// side's label; two different labels conflict.
    ///
    /// ```
    /// use compslice::ComponentIndex;
    ///
    /// let u = ComponentIndex::from_ints([3]).with_label("u");
    /// let tail = ComponentIndex::from_ints([4]);
    /// assert_eq!(
    ///     u.concat(&tail).unwrap(),
    ///     ComponentIndex::from_ints([3, 4]).with_label("u")
    /// );
    /// ```
    pub fn concat(&self, other: &ComponentIndex) -> Result<ComponentIndex, ComponentError> {
        let label = match (&self.label, &other.label) {
            (Some(lhs), Some(rhs)) if lhs != rhs => {
                return Err(ComponentError::LabelConflict {
                    lhs: lhs.clone(),
                    rhs: rhs.clone(),
                });
            }
            (Some(label), _) | (None, Some(label)) => Some(label.clone()),
            (None, None) => None,
        };
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().cloned());
        Ok(ComponentIndex { entries, label })
    }

    /// A copy of this index with `entry` appended.
    pub fn pushed<E: Into<IndexEntry>>(&self, entry: E) -> ComponentIndex {
        let mut entries = self.entries.clone();
        entries.push(entry.into());
        ComponentIndex {
            entries,
            label: self.label.clone(),
        }
    }

    pub(crate) fn extended(&self, rest: &[IndexEntry]) -> ComponentIndex {
        let mut entries = self.entries.clone();
        entries.extend(rest.iter().cloned());
        ComponentIndex {
            entries,
            label: self.label.clone(),
        }
    }

    /// A copy padded on the right with wildcards up to `dims`
    /// entries.
    pub fn padded(&self, dims: usize) -> ComponentIndex {
        let mut entries = self.entries.clone();
        while entries.len() < dims {
            entries.push(IndexEntry::Wildcard);
        }
        ComponentIndex {
            entries,
            label: self.label.clone(),
        }
    }

    /// True when every entry is a single scalar.
    pub fn is_concrete(&self) -> bool {
        self.entries.iter().all(IndexEntry::is_scalar)
    }

    /// The integer coordinates, if every entry is an integer scalar.
    pub fn to_ints(&self) -> Option<Vec<i64>> {
        self.entries
            .iter()
            .map(|entry| entry.as_scalar().and_then(Scalar::as_int))
            .collect()
    }
}

impl fmt::Display for ComponentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}", label)?;
        }
        for entry in &self.entries {
            write!(f, "[{}]", entry)?;
        }
        Ok(())
    }
}

/// Construct a [`ComponentIndex`] from a list of entries, optionally
/// labeled.
///
/// ```
/// let i = compslice::index![3, 1..=4];
/// assert_eq!(i.to_string(), "[3][1:4]");
///
/// let u = compslice::index![label = "u"; 2.5];
/// assert_eq!(u.to_string(), "u[2.5]");
/// ```
#[macro_export]
macro_rules! index {
    () => {
        $crate::ComponentIndex::default()
    };

    (label = $label:expr; $($entry:expr),* $(,)?) => {
        $crate::ComponentIndex::new(vec![$($crate::IndexEntry::from($entry)),*]).with_label($label)
    };

    ($($entry:expr),+ $(,)?) => {
        $crate::ComponentIndex::new(vec![$($crate::IndexEntry::from($entry)),+])
    };
}
