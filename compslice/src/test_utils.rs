//! An in-memory host for tests.

use std::cell::Cell;
use std::collections::HashMap;

use crate::address;
use crate::address::Address;
use crate::config::Config;
use crate::domain::ComponentKind;
use crate::host::Host;
use crate::host::HostError;
use crate::index::ComponentIndex;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;

/// Objects with fixed per-dimension lengths or parameter ranges.
/// Resolving an address clamps it to those bounds, the way the real
/// host normalizes selections, and counts as one round trip.
#[derive(Debug, Default)]
pub(crate) struct MockHost {
    kinds: HashMap<String, Vec<ComponentKind>>,
    lengths: HashMap<(String, ComponentKind), Vec<usize>>,
    ranges: HashMap<(String, ComponentKind), Vec<(f64, f64)>>,
    members: HashMap<(String, i64), Vec<i64>>,
    round_trips: Cell<usize>,
    length_queries: Cell<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockHandle {
    pub object: String,
    pub label: String,
    pub indices: Vec<ComponentIndex>,
    pub complete: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, object: &str, kind: ComponentKind) {
        let kinds = self.kinds.entry(object.to_string()).or_default();
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    /// Per-dimension lengths; a sparse dimension's entry is unused.
    pub fn with_lengths(mut self, object: &str, kind: ComponentKind, lengths: &[usize]) -> Self {
        self.register(object, kind);
        self.lengths
            .insert((object.to_string(), kind), lengths.to_vec());
        self
    }

    /// The same parameter range along every dimension.
    pub fn with_range(mut self, object: &str, kind: ComponentKind, range: (f64, f64)) -> Self {
        self.register(object, kind);
        self.ranges.insert((object.to_string(), kind), vec![range]);
        self
    }

    /// Distinct `u` and `v` parameter ranges for a surface.
    pub fn with_uv_ranges(
        mut self,
        object: &str,
        kind: ComponentKind,
        u: (f64, f64),
        v: (f64, f64),
    ) -> Self {
        self.register(object, kind);
        self.ranges.insert((object.to_string(), kind), vec![u, v]);
        self
    }

    /// The faces connected to a mesh vertex.
    pub fn with_members(mut self, object: &str, vertex: i64, faces: &[i64]) -> Self {
        self.register(object, ComponentKind::MeshVertexFace);
        self.members
            .insert((object.to_string(), vertex), faces.to_vec());
        self
    }

    /// The number of addresses resolved so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.get()
    }

    /// The number of native length queries answered so far.
    pub fn length_queries(&self) -> usize {
        self.length_queries.get()
    }

    fn length(&self, object: &str, kind: ComponentKind, dim: usize) -> usize {
        self.lengths
            .get(&(object.to_string(), kind))
            .and_then(|lengths| lengths.get(dim))
            .copied()
            .unwrap_or(0)
    }

    fn faces(&self, object: &str, vertex: i64) -> Vec<i64> {
        self.members
            .get(&(object.to_string(), vertex))
            .cloned()
            .unwrap_or_default()
    }

    fn kind_for(&self, object: &str, label: &str) -> Result<ComponentKind, HostError> {
        let kinds = self
            .kinds
            .get(object)
            .ok_or_else(|| HostError::NoSuchObject(object.to_string()))?;
        kinds
            .iter()
            .copied()
            .find(|kind| kind.spec().labels.contains(&label))
            .ok_or_else(|| HostError::InvalidAddress(format!("{}.{}", object, label)))
    }

    // Every concrete value a group denotes along one dimension, clamped
    // to the valid values.
    fn clamp(group: &IndexEntry, valid: &[i64]) -> Vec<i64> {
        match group {
            IndexEntry::Wildcard => valid.to_vec(),
            IndexEntry::Scalar(Scalar::Int(v)) => {
                valid.iter().copied().filter(|x| x == v).collect()
            }
            IndexEntry::Range(Range(start, stop, step)) => {
                let start = start.and_then(|s| s.as_int()).unwrap_or(0);
                let stop = stop.and_then(|s| s.as_int()).unwrap_or(i64::MAX);
                let step = step.and_then(|s| s.as_int()).unwrap_or(1).max(1);
                valid
                    .iter()
                    .copied()
                    .filter(|x| *x >= start && *x <= stop && (x - start) % step == 0)
                    .collect()
            }
            IndexEntry::Nested(items) => {
                let mut values: Vec<i64> = items
                    .iter()
                    .flat_map(|item| Self::clamp(item, valid))
                    .collect();
                values.sort();
                values.dedup();
                values
            }
            IndexEntry::Scalar(Scalar::Real(_)) => Vec::new(),
        }
    }

    fn expand(&self, object: &str, kind: ComponentKind, address: &Address) -> Vec<ComponentIndex> {
        let label = address.label().to_string();
        if kind.is_continuous() {
            return vec![address.index().padded(kind.dimensions())];
        }
        let mut prefixes = vec![ComponentIndex::empty(Some(label))];
        for dim in 0..kind.dimensions() {
            let group = address
                .groups()
                .get(dim)
                .cloned()
                .unwrap_or(IndexEntry::Wildcard);
            let mut next = Vec::new();
            for prefix in prefixes {
                let valid: Vec<i64> = if kind.spec().sparse_dims.contains(&dim) {
                    let vertex = prefix.to_ints().and_then(|v| v.first().copied());
                    vertex.map(|v| self.faces(object, v)).unwrap_or_default()
                } else {
                    (0..self.length(object, kind, dim) as i64).collect()
                };
                for value in Self::clamp(&group, &valid) {
                    next.push(prefix.pushed(value));
                }
            }
            prefixes = next;
        }
        prefixes
    }
}

impl Host for MockHost {
    type Handle = MockHandle;

    fn dimension_length(
        &self,
        object: &str,
        kind: ComponentKind,
        partial: &ComponentIndex,
    ) -> Result<usize, HostError> {
        self.length_queries.set(self.length_queries.get() + 1);
        if !self.kinds.contains_key(object) {
            return Err(HostError::NoSuchObject(object.to_string()));
        }
        Ok(self.length(object, kind, partial.len()))
    }

    fn dimension_range(
        &self,
        object: &str,
        kind: ComponentKind,
        partial: &ComponentIndex,
    ) -> Result<(f64, f64), HostError> {
        let ranges = self
            .ranges
            .get(&(object.to_string(), kind))
            .ok_or_else(|| HostError::NoSuchObject(object.to_string()))?;
        if ranges.len() == 1 {
            return Ok(ranges[0]);
        }
        // A `v` isoparm fixes v first.
        let first_is_v = partial.label() == Some("v");
        let is_v = partial.is_empty() == first_is_v;
        Ok(if is_v { ranges[1] } else { ranges[0] })
    }

    fn dimension_members(
        &self,
        object: &str,
        _kind: ComponentKind,
        partial: &ComponentIndex,
    ) -> Result<Vec<i64>, HostError> {
        let vertex = partial
            .to_ints()
            .and_then(|v| v.first().copied())
            .ok_or_else(|| HostError::Other(format!("no vertex in {}", partial)))?;
        Ok(self.faces(object, vertex))
    }

    fn resolve_address(&self, address: &str) -> Result<MockHandle, HostError> {
        self.round_trips.set(self.round_trips.get() + 1);
        let parsed: Address = address
            .parse()
            .map_err(|_| HostError::InvalidAddress(address.to_string()))?;
        let kind = self.kind_for(parsed.object(), parsed.label())?;
        let indices = self.expand(parsed.object(), kind, &parsed);
        let everything = Address::new(parsed.object(), parsed.label(), Vec::new());
        let complete = !kind.is_continuous()
            && indices.len() == self.expand(parsed.object(), kind, &everything).len();
        Ok(MockHandle {
            object: parsed.object().to_string(),
            label: parsed.label().to_string(),
            indices,
            complete,
        })
    }

    fn address_strings(&self, handle: &MockHandle) -> Result<Vec<String>, HostError> {
        Ok(address::encode(
            &handle.object,
            &handle.label,
            &handle.indices,
            &Config::default(),
        ))
    }

    fn element_count(&self, handle: &MockHandle) -> Result<usize, HostError> {
        Ok(handle.indices.len())
    }

    fn element_at(&self, handle: &MockHandle, flat_index: usize) -> Result<ComponentIndex, HostError> {
        handle
            .indices
            .get(flat_index)
            .cloned()
            .ok_or_else(|| HostError::Other(format!("no element {}", flat_index)))
    }

    fn is_complete(&self, handle: &MockHandle) -> Result<bool, HostError> {
        Ok(handle.complete)
    }
}
