//! Translation between component indices and host address strings.
//!
//! An address names an object, a component label, and one bracket
//! group per indexed dimension:
//!
//! ```text
//! pPlane1.vtx[0:4]
//! nurbsPlane1.cv[0:2,5][1]
//! nurbsPlane1.u[0.5][*]
//! ```
//!
//! Encoding compacts a set of indices into as few addresses as it
//! can: indices sharing their leading dimensions are grouped, and
//! ascending runs with a common step are written as `start:stop` or
//! `start:stop:step` with an inclusive stop. Decoding is the inverse,
//! so that for any set `S` of indices sharing a label, decoding the
//! encoding of `S` yields the elements of `S` again.
//!
//! ```
//! use compslice::ComponentIndex;
//! use compslice::address;
//! use compslice::config::Config;
//!
//! let indices: Vec<_> = [0, 1, 2, 3, 7, 9, 11]
//!     .into_iter()
//!     .map(|i| ComponentIndex::from_ints([i]).with_label("vtx"))
//!     .collect();
//! let strings = address::encode("pPlane1", "vtx", &indices, &Config::default());
//! assert_eq!(strings, vec!["pPlane1.vtx[0:3,7:11:2]"]);
//! assert_eq!(address::decode(&strings).unwrap(), indices);
//! ```

/// The nom grammar for address strings.
pub mod parse;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

use crate::config::Config;
use crate::error::ComponentError;
use crate::index::ComponentIndex;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;

/// A parsed address string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    object: String,
    label: String,
    /// One entry per bracket group; a comma list is a nested entry.
    groups: Vec<IndexEntry>,
}

impl Address {
    pub fn new<O: Into<String>, L: Into<String>>(
        object: O,
        label: L,
        groups: Vec<IndexEntry>,
    ) -> Self {
        Self {
            object: object.into(),
            label: label.into(),
            groups,
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn groups(&self) -> &[IndexEntry] {
        &self.groups
    }

    /// The address as a single, possibly nested, labeled index.
    pub fn index(&self) -> ComponentIndex {
        ComponentIndex::new(self.groups.clone()).with_label(self.label.clone())
    }

    /// The indices named by this address. Comma lists and closed
    /// integer ranges are enumerated; wildcards, open ranges and real
    /// ranges are kept as single entries.
    pub fn indices(&self) -> Result<Vec<ComponentIndex>, ComponentError> {
        if self.groups.is_empty() {
            return Ok(vec![ComponentIndex::empty(Some(self.label.clone()))]);
        }
        let items = self
            .groups
            .iter()
            .map(group_items)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items
            .into_iter()
            .multi_cartesian_product()
            .map(|entries| ComponentIndex::new(entries).with_label(self.label.clone()))
            .collect())
    }

    /// The number of elements named by this address. Every group must
    /// be closed.
    pub fn element_count(&self) -> Result<usize, ComponentError> {
        let mut count = 1;
        for group in &self.groups {
            count *= group_count(group).ok_or_else(|| ComponentError::UnboundedAddress {
                address: self.to_string(),
            })?;
        }
        Ok(count)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.label)?;
        for group in &self.groups {
            write!(f, "[{}]", group)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = ComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_address(s)
    }
}

// The closed integer bounds and step of a range, if it has them.
fn closed_bounds(range: &Range) -> Result<Option<(i64, i64, i64)>, ComponentError> {
    let (Some(Scalar::Int(start)), Some(Scalar::Int(stop))) = (range.start(), range.stop()) else {
        return Ok(None);
    };
    match range.step() {
        None => Ok(Some((start, stop, 1))),
        Some(Scalar::Int(step)) if step < 0 => Err(ComponentError::NegativeStep {
            range: range.clone(),
        }),
        Some(Scalar::Int(0)) => Err(ComponentError::ZeroStep {
            range: range.clone(),
        }),
        Some(Scalar::Int(step)) => Ok(Some((start, stop, step))),
        Some(Scalar::Real(_)) => Ok(None),
    }
}

fn group_items(group: &IndexEntry) -> Result<Vec<IndexEntry>, ComponentError> {
    match group {
        IndexEntry::Range(range) => match closed_bounds(range)? {
            Some((start, stop, step)) => Ok((start..=stop)
                .step_by(step as usize)
                .map(IndexEntry::from)
                .collect()),
            None => Ok(vec![group.clone()]),
        },
        IndexEntry::Nested(items) => Ok(items
            .iter()
            .map(group_items)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect()),
        IndexEntry::Scalar(_) | IndexEntry::Wildcard => Ok(vec![group.clone()]),
    }
}

fn group_count(group: &IndexEntry) -> Option<usize> {
    match group {
        IndexEntry::Scalar(_) => Some(1),
        IndexEntry::Range(range) => match closed_bounds(range).ok()?? {
            (start, stop, _) if stop < start => Some(0),
            (start, stop, step) => Some(((stop - start) / step + 1) as usize),
        },
        IndexEntry::Nested(items) => items.iter().map(group_count).sum(),
        IndexEntry::Wildcard => None,
    }
}

/// Encodes `indices` as address strings on `object`. Indices without
/// a label are addressed with `label`.
///
/// With [`Config::compact_runs`] unset, each index is written as its
/// own address, in order. Otherwise indices are grouped by label and
/// dimensionality, and within a group by shared leading entries;
/// entries whose trailing addresses coincide share a bracket group.
pub fn encode(
    object: &str,
    label: &str,
    indices: &[ComponentIndex],
    config: &Config,
) -> Vec<String> {
    if !config.compact_runs {
        return indices
            .iter()
            .map(|index| {
                Address::new(
                    object,
                    index.label().unwrap_or(label),
                    index.entries().to_vec(),
                )
                .to_string()
            })
            .collect();
    }

    let mut groups: Vec<((&str, usize), Vec<&[IndexEntry]>)> = Vec::new();
    let mut positions: HashMap<(&str, usize), usize> = HashMap::new();
    for index in indices {
        let key = (index.label().unwrap_or(label), index.len());
        let at = *positions.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[at].1.push(index.entries());
    }

    groups
        .into_iter()
        .flat_map(|((label, _), rows)| {
            encode_rows(&rows)
                .into_iter()
                .map(move |entries| Address::new(object, label, entries).to_string())
        })
        .collect()
}

// Encodes rows of equal length into bracket-group lists.
fn encode_rows(rows: &[&[IndexEntry]]) -> Vec<Vec<IndexEntry>> {
    match rows.first() {
        None => return Vec::new(),
        Some(row) if row.is_empty() => return vec![Vec::new()],
        Some(_) => (),
    }

    let mut heads: Vec<(&IndexEntry, Vec<&[IndexEntry]>)> = Vec::new();
    let mut positions: HashMap<&IndexEntry, usize> = HashMap::new();
    for row in rows {
        let at = *positions.entry(&row[0]).or_insert_with(|| {
            heads.push((&row[0], Vec::new()));
            heads.len() - 1
        });
        heads[at].1.push(&row[1..]);
    }

    // Heads whose tails encode identically share a bracket group.
    let mut shared: Vec<(Vec<Vec<IndexEntry>>, Vec<IndexEntry>)> = Vec::new();
    let mut positions: HashMap<Vec<Vec<IndexEntry>>, usize> = HashMap::new();
    for (head, tails) in heads {
        let tails = encode_rows(&tails);
        let at = match positions.get(&tails) {
            Some(at) => *at,
            None => {
                positions.insert(tails.clone(), shared.len());
                shared.push((tails, Vec::new()));
                shared.len() - 1
            }
        };
        shared[at].1.push(head.clone());
    }

    let mut encoded = Vec::new();
    for (tails, heads) in shared {
        let head = compact(&heads);
        for tail in tails {
            let mut entries = Vec::with_capacity(tail.len() + 1);
            entries.push(head.clone());
            entries.extend(tail);
            encoded.push(entries);
        }
    }
    encoded
}

/// Compacts a sequence of entries into a single bracket group,
/// writing ascending integer runs with a common step as ranges. A run
/// of two is only written as a range when its step is 1.
pub fn compact(entries: &[IndexEntry]) -> IndexEntry {
    let ints: Vec<Option<i64>> = entries
        .iter()
        .map(|entry| entry.as_scalar().and_then(Scalar::as_int))
        .collect();

    let mut runs = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let (Some(start), Some(Some(next))) = (ints[i], ints.get(i + 1)) else {
            runs.push(entries[i].clone());
            i += 1;
            continue;
        };
        let step = next - start;
        let mut end = i + 1;
        if step > 0 {
            while let Some(Some(v)) = ints.get(end + 1) {
                if v - ints[end].unwrap_or(*v) != step {
                    break;
                }
                end += 1;
            }
        }
        let len = end - i + 1;
        if step > 0 && (len >= 3 || step == 1) {
            let range = Range::closed(start, start + step * (len as i64 - 1));
            runs.push(IndexEntry::Range(if step == 1 {
                range
            } else {
                range.step_by(step)
            }));
            i = end + 1;
        } else {
            runs.push(entries[i].clone());
            i += 1;
        }
    }

    if runs.len() == 1 {
        runs.remove(0)
    } else {
        IndexEntry::Nested(runs)
    }
}

/// Decodes address strings into the indices they name, in order.
pub fn decode<S: AsRef<str>>(strings: &[S]) -> Result<Vec<ComponentIndex>, ComponentError> {
    let mut indices = Vec::new();
    for s in strings {
        let address: Address = s.as_ref().parse()?;
        indices.extend(address.indices()?);
    }
    Ok(indices)
}

/// Counts the elements named by address strings without resolving
/// them. Every group must be closed.
pub fn count_elements<S: AsRef<str>>(strings: &[S]) -> Result<usize, ComponentError> {
    let mut count = 0;
    for s in strings {
        let address: Address = s.as_ref().parse()?;
        count += address.element_count()?;
    }
    Ok(count)
}
