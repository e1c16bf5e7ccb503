//! Components: an object, a kind, and the index narrowing it.
//!
//! A [`ProgressiveComponent`] is built up one dimension at a time by
//! chained indexing. Each step validates the new entry against the
//! bounds at the current prefix and returns a new component, so a
//! failed step leaves nothing behind. Once resolved, a component may
//! also carry host handles, which back flat iteration.
//!
//! A [`MaterializedComponent`] is the concrete set of indices a
//! component denotes.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::address;
use crate::address::Address;
use crate::domain::Bounds;
use crate::domain::ComponentKind;
use crate::domain::IndexDomain;
use crate::error::ComponentError;
use crate::flatten::flatten;
use crate::flatten::flatten_prefix;
use crate::host::Host;
use crate::index::ComponentIndex;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;
use crate::iter::ComponentIterator;
use crate::label;

/// A component under construction by chained indexing.
pub struct ProgressiveComponent<H: Host> {
    domain: Rc<IndexDomain<H>>,
    index: ComponentIndex,
    indexable: bool,
    handles: Vec<H::Handle>,
}

impl<H: Host> Clone for ProgressiveComponent<H> {
    fn clone(&self) -> Self {
        Self {
            domain: Rc::clone(&self.domain),
            index: self.index.clone(),
            indexable: self.indexable,
            handles: self.handles.clone(),
        }
    }
}

impl<H: Host> fmt::Debug for ProgressiveComponent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressiveComponent")
            .field("domain", &self.domain)
            .field("index", &self.index)
            .field("indexable", &self.indexable)
            .field("handles", &self.handles)
            .finish()
    }
}

fn is_range_like(entry: &IndexEntry) -> bool {
    matches!(entry, IndexEntry::Range(_) | IndexEntry::Wildcard)
}

// The concrete prefix a handle's address stands for, if its leading
// groups are non-negative integers and every group after them spans
// its whole dimension. Hosts spell `cv[2]` back as `cv[2][0:5]`.
fn handle_prefix<H: Host>(
    domain: &IndexDomain<H>,
    index: &ComponentIndex,
) -> Result<Option<ComponentIndex>, ComponentError> {
    if domain.is_continuous() {
        return Ok(None);
    }
    let mut prefix = ComponentIndex::empty(index.label().map(String::from));
    for entry in index.entries() {
        match entry {
            IndexEntry::Scalar(Scalar::Int(v)) if *v >= 0 => prefix = prefix.pushed(*v),
            _ => break,
        }
    }
    if prefix.is_empty() || prefix.len() >= domain.dimensions() {
        return Ok(None);
    }

    let mut partial = prefix.clone();
    for entry in &index.entries()[prefix.len()..] {
        let spans = match entry {
            IndexEntry::Wildcard => true,
            IndexEntry::Range(Range(Some(Scalar::Int(0)), Some(Scalar::Int(stop)), step))
                if matches!(step, None | Some(Scalar::Int(1))) =>
            {
                domain.length(&partial)? as i64 == stop + 1
            }
            _ => false,
        };
        if !spans {
            return Ok(None);
        }
        partial = partial.pushed(0i64);
    }
    Ok(Some(prefix))
}

impl<H: Host> ProgressiveComponent<H> {
    /// Every element of `kind` on `object`.
    pub fn new<S: Into<String>>(host: Rc<H>, object: S, kind: ComponentKind) -> Self {
        Self::from_domain(Rc::new(IndexDomain::new(host, object, kind)))
    }

    /// Every element of a domain.
    pub fn from_domain(domain: Rc<IndexDomain<H>>) -> Self {
        Self {
            domain,
            index: ComponentIndex::default(),
            indexable: true,
            handles: Vec::new(),
        }
    }

    /// The same component addressed by `label`. Equivalent labels are
    /// folded into their canonical form; a different label than the
    /// one already carried is a conflict.
    pub fn with_label<L: AsRef<str>>(self, label: L) -> Result<Self, ComponentError> {
        let kind = self.domain.kind();
        let canonical = label::canonical_label(kind, label.as_ref())?;
        let index = label::merge(
            kind,
            self.index.clone(),
            ComponentIndex::empty(Some(canonical.to_string())),
        )?;
        Ok(Self { index, ..self })
    }

    /// Builds a component by indexing a domain with each entry of
    /// `index` in turn.
    pub fn from_index(
        domain: Rc<IndexDomain<H>>,
        index: ComponentIndex,
    ) -> Result<Self, ComponentError> {
        let index = label::canonicalize(domain.kind(), index)?;
        let mut component = Self::from_domain(domain);
        component.index = ComponentIndex::empty(index.label().map(String::from));
        for entry in index.entries() {
            component = component.get(entry.clone())?;
        }
        Ok(component)
    }

    /// Builds a component of `kind` from an address string.
    pub fn from_address(
        host: Rc<H>,
        kind: ComponentKind,
        address: &str,
    ) -> Result<Self, ComponentError> {
        let address: Address = address.parse()?;
        let domain = Rc::new(IndexDomain::new(host, address.object(), kind));
        Self::from_index(domain, address.index())
    }

    /// Wraps an already resolved handle. The result cannot be indexed
    /// further, unless the handle names a single prefix with fewer
    /// dimensions than the domain, such as one row of a surface's
    /// control points.
    pub fn from_handle(
        domain: Rc<IndexDomain<H>>,
        handle: H::Handle,
    ) -> Result<Self, ComponentError> {
        let host = Rc::clone(domain.host());
        let kind = domain.kind();
        let complete = host.is_complete(&handle)?;
        let addresses = host
            .address_strings(&handle)?
            .iter()
            .map(|s| s.parse::<Address>())
            .collect::<Result<Vec<_>, _>>()?;

        let (index, indexable) = match addresses.as_slice() {
            [address] if !complete => {
                let index = label::canonicalize(kind, address.index())?;
                match handle_prefix(&domain, &index)? {
                    Some(prefix) => (prefix, true),
                    None => (index, false),
                }
            }
            [first, ..] => {
                let label = label::canonical_label(kind, first.label())?;
                (ComponentIndex::empty(Some(label.to_string())), false)
            }
            [] => (ComponentIndex::default(), false),
        };

        Ok(Self {
            domain,
            index,
            indexable,
            handles: vec![handle],
        })
    }

    pub fn domain(&self) -> &Rc<IndexDomain<H>> {
        &self.domain
    }

    pub fn kind(&self) -> ComponentKind {
        self.domain.kind()
    }

    pub fn object(&self) -> &str {
        self.domain.object()
    }

    /// The partial index fixed so far.
    pub fn index(&self) -> &ComponentIndex {
        &self.index
    }

    pub fn handles(&self) -> &[H::Handle] {
        &self.handles
    }

    /// The dimension the next [`get`](Self::get) fixes, or `None` once
    /// the component is fully specified or otherwise not indexable.
    pub fn current_dimension(&self) -> Option<usize> {
        (self.indexable && self.index.len() < self.domain.dimensions()).then_some(self.index.len())
    }

    /// Narrows the component along its current dimension.
    pub fn get<E: Into<IndexEntry>>(&self, entry: E) -> Result<Self, ComponentError> {
        let entry = entry.into();
        let Some(dim) = self.current_dimension() else {
            return Err(ComponentError::NotIndexable {
                component: self.to_string(),
            });
        };
        self.validate(&entry, dim)?;

        let index = self.index.pushed(entry);
        // A surface range stays a range only while every entry is one.
        let domain = if self.domain.kind() == ComponentKind::SurfaceRange
            && !index.entries().iter().all(is_range_like)
        {
            Rc::new(IndexDomain::with_config(
                Rc::clone(self.domain.host()),
                self.domain.object(),
                ComponentKind::SurfaceIsoparm,
                self.domain.config().clone(),
            ))
        } else {
            Rc::clone(&self.domain)
        };

        Ok(Self {
            domain,
            index,
            indexable: true,
            handles: Vec::new(),
        })
    }

    fn validate(&self, entry: &IndexEntry, dim: usize) -> Result<(), ComponentError> {
        let kind = self.domain.kind();
        let continuous = self.domain.is_continuous();
        match entry {
            IndexEntry::Wildcard => Ok(()),
            IndexEntry::Nested(members) => {
                if continuous {
                    return Err(ComponentError::InvalidEntry {
                        entry: entry.clone(),
                        kind,
                    });
                }
                for member in members {
                    if member.is_nested() {
                        return Err(ComponentError::NestedIterable {
                            entry: member.clone(),
                            dim,
                        });
                    }
                    self.validate(member, dim)?;
                }
                Ok(())
            }
            IndexEntry::Scalar(value) => {
                if !continuous && value.as_int().is_none() {
                    return Err(ComponentError::InvalidEntry {
                        entry: entry.clone(),
                        kind,
                    });
                }
                self.check_bounds(*value, *value, dim)
            }
            IndexEntry::Range(range) => {
                if range.step().is_some_and(|s| s.is_negative()) {
                    return Err(ComponentError::NegativeStep {
                        range: range.clone(),
                    });
                }
                if continuous && range.step().is_some() {
                    return Err(ComponentError::SliceStepUnsupported {
                        range: range.clone(),
                        kind,
                    });
                }
                if !continuous {
                    let parts = [range.start(), range.stop(), range.step()];
                    if parts.iter().flatten().any(|s| s.as_int().is_none()) {
                        return Err(ComponentError::InvalidEntry {
                            entry: entry.clone(),
                            kind,
                        });
                    }
                    if range.step() == Some(Scalar::Int(0)) {
                        return Err(ComponentError::ZeroStep {
                            range: range.clone(),
                        });
                    }
                }
                if range.start().is_none() && range.stop().is_none() {
                    return Ok(());
                }
                if self.domain.is_sparse(dim) {
                    return Err(ComponentError::SparseSlice {
                        range: range.clone(),
                        dim,
                    });
                }
                let (min, max) = match (range.start(), range.stop()) {
                    (Some(a), Some(b)) if a.total_cmp(&b) == Ordering::Greater => (b, a),
                    (Some(a), Some(b)) => (a, b),
                    (Some(end), None) | (None, Some(end)) => (end, end),
                    (None, None) => return Ok(()),
                };
                self.check_bounds(min, max, dim)
            }
        }
    }

    // Checks `[min, max]` against the bounds at every concrete prefix
    // the current index denotes.
    fn check_bounds(&self, min: Scalar, max: Scalar, dim: usize) -> Result<(), ComponentError> {
        let prefixes = if self.domain.is_continuous() {
            vec![self.index.clone()]
        } else {
            flatten_prefix(&self.domain, &self.index)?
        };

        for prefix in &prefixes {
            if self.domain.is_sparse(dim) {
                let members = self.domain.members(prefix)?;
                let found = match min.as_int() {
                    Some(v) if v < 0 => v.unsigned_abs() as usize <= members.len(),
                    Some(v) => members.contains(&v),
                    None => false,
                };
                if !found {
                    return Err(self.domain.sparse_out_of_range(min, dim, &members));
                }
                continue;
            }

            let (lo, hi) = self.domain.range(prefix)?;
            let value = if min.total_cmp(&lo) == Ordering::Less {
                min
            } else if max.total_cmp(&hi) == Ordering::Greater {
                max
            } else {
                continue;
            };
            return Err(ComponentError::IndexOutOfRange {
                value,
                dim,
                min: lo,
                max: hi,
            });
        }
        Ok(())
    }

    // The index carrying its canonical label, so that every element
    // derived from it is labeled the way the host labels its own.
    fn labeled_index(&self) -> Result<ComponentIndex, ComponentError> {
        let label = self.domain.label_for(&self.index)?;
        Ok(self.index.clone().with_label(label))
    }

    // Flat iteration walks handles only once the component denotes
    // everything its handles do.
    fn uses_handles(&self) -> bool {
        !self.handles.is_empty() && (self.index.is_empty() || self.current_dimension().is_none())
    }

    fn handle_strings(&self) -> Result<Vec<String>, ComponentError> {
        let host = self.domain.host();
        let mut strings = Vec::new();
        for handle in &self.handles {
            strings.extend(host.address_strings(handle)?);
        }
        Ok(strings)
    }

    /// A new cursor over the component's elements.
    ///
    /// Components backed by handles are walked through the host by
    /// flat position, except for kinds without native bounds, whose
    /// handles are decoded from their address strings. All other
    /// components are flattened dimension by dimension without
    /// resolving anything.
    pub fn iter(&self) -> Result<ComponentIterator<H>, ComponentError> {
        if self.domain.is_continuous() {
            return Err(ComponentError::NotIterable { kind: self.kind() });
        }
        if !self.uses_handles() {
            tracing::trace!("{}: iterating by dimension", self);
            let index = self.labeled_index()?;
            return ComponentIterator::by_dimension(Rc::clone(&self.domain), &index);
        }
        if self.domain.spec().bounds == Bounds::AddressFallback {
            tracing::trace!("{}: iterating decoded handle addresses", self);
            let mut indices = Vec::new();
            for index in address::decode(&self.handle_strings()?)? {
                let index = label::canonicalize(self.kind(), index)?;
                let label = self.domain.label_for(&index)?;
                indices.extend(flatten(&self.domain, &index.with_label(label))?);
            }
            return Ok(ComponentIterator::from_indices(indices));
        }
        tracing::trace!("{}: iterating handles", self);
        ComponentIterator::from_handles(Rc::clone(self.domain.host()), self.handles.clone())
    }

    /// The number of elements in the component.
    pub fn count(&self) -> Result<usize, ComponentError> {
        if self.domain.is_continuous() {
            return Err(ComponentError::NotIterable { kind: self.kind() });
        }
        if !self.uses_handles() {
            return self.iter()?.len();
        }
        if self.domain.spec().bounds == Bounds::AddressFallback {
            return match address::count_elements(&self.handle_strings()?) {
                Ok(count) => Ok(count),
                Err(ComponentError::UnboundedAddress { .. }) => self.iter()?.len(),
                Err(err) => Err(err),
            };
        }
        let host = self.domain.host();
        self.handles
            .iter()
            .map(|handle| host.element_count(handle).map_err(ComponentError::from))
            .sum()
    }

    /// The concrete indices the component denotes.
    pub fn materialize(&self) -> Result<MaterializedComponent<H>, ComponentError> {
        let indices = if self.domain.is_continuous() {
            flatten(&self.domain, &self.index)?
        } else {
            self.iter()?.collect::<Result<Vec<_>, _>>()?
        };
        MaterializedComponent::new(Rc::clone(&self.domain), indices)
    }

    /// Address strings naming the component: the host's own strings
    /// once resolved, otherwise the strings used to resolve it.
    pub fn addresses(&self) -> Result<Vec<String>, ComponentError> {
        if self.handles.is_empty() {
            self.request_addresses()
        } else {
            self.handle_strings()
        }
    }

    fn request_addresses(&self) -> Result<Vec<String>, ComponentError> {
        let label = self.domain.label_for(&self.index)?;
        if self.index.is_empty() {
            return Ok(vec![self.domain.complete_address(label)?]);
        }
        match self.direct_groups()? {
            Some(groups) => Ok(vec![
                Address::new(self.domain.object(), label, groups).to_string(),
            ]),
            None => self.materialize()?.addresses(),
        }
    }

    // The index as bracket groups the host accepts verbatim, padded
    // with wildcards. `None` if any entry needs flattening first.
    fn direct_groups(&self) -> Result<Option<Vec<IndexEntry>>, ComponentError> {
        let continuous = self.domain.is_continuous();
        let padded = self.index.padded(self.domain.dimensions());
        let mut groups = Vec::with_capacity(padded.len());
        for (dim, entry) in padded.entries().iter().enumerate() {
            let group = match entry {
                IndexEntry::Wildcard => IndexEntry::Wildcard,
                IndexEntry::Scalar(v) if continuous || !v.is_negative() => entry.clone(),
                IndexEntry::Range(range) if continuous => {
                    // Open ends are the parameter bounds.
                    let partial = ComponentIndex::new(vec![IndexEntry::Wildcard; dim])
                        .with_label_opt(self.index.label().map(String::from));
                    let (min, max) = self.domain.range(&partial)?;
                    IndexEntry::Range(Range(
                        Some(range.start().unwrap_or(min)),
                        Some(range.stop().unwrap_or(max)),
                        None,
                    ))
                }
                IndexEntry::Range(Range(Some(Scalar::Int(a)), Some(Scalar::Int(b)), None))
                    if *a >= 0 && *b >= 0 =>
                {
                    entry.clone()
                }
                _ => return Ok(None),
            };
            groups.push(group);
        }
        Ok(Some(groups))
    }

    /// Resolves the component through the host. The result carries
    /// one handle per address; resolving an already resolved
    /// component is a no-op.
    pub fn resolve(&self) -> Result<Self, ComponentError> {
        if !self.handles.is_empty() {
            return Ok(self.clone());
        }
        let host = self.domain.host();
        let mut handles = Vec::new();
        for address in self.request_addresses()? {
            tracing::debug!("resolving {}", address);
            let handle =
                host.resolve_address(&address)
                    .map_err(|source| ComponentError::UnresolvedAddress {
                        address: address.clone(),
                        source,
                    })?;
            handles.push(handle);
        }
        Ok(Self {
            handles,
            ..self.clone()
        })
    }
}

impl<H: Host> fmt::Display for ProgressiveComponent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.domain.object())?;
        if let Ok(label) = self.domain.label_for(&self.index) {
            write!(f, ".{}", label)?;
        }
        for entry in self.index.entries() {
            write!(f, "[{}]", entry)?;
        }
        Ok(())
    }
}

/// A concrete selection: an object, a kind, and the set of indices
/// selected on it, each carrying its canonical label.
pub struct MaterializedComponent<H: Host> {
    domain: Rc<IndexDomain<H>>,
    indices: Vec<ComponentIndex>,
}

impl<H: Host> Clone for MaterializedComponent<H> {
    fn clone(&self) -> Self {
        Self {
            domain: Rc::clone(&self.domain),
            indices: self.indices.clone(),
        }
    }
}

impl<H: Host> fmt::Debug for MaterializedComponent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedComponent")
            .field("domain", &self.domain)
            .field("indices", &self.indices)
            .finish()
    }
}

impl<H: Host> MaterializedComponent<H> {
    pub fn new(
        domain: Rc<IndexDomain<H>>,
        indices: Vec<ComponentIndex>,
    ) -> Result<Self, ComponentError> {
        let indices = indices
            .into_iter()
            .map(|index| {
                let label = domain.label_for(&index)?;
                Ok(index.with_label(label))
            })
            .collect::<Result<Vec<_>, ComponentError>>()?;
        Ok(Self { domain, indices })
    }

    pub fn domain(&self) -> &Rc<IndexDomain<H>> {
        &self.domain
    }

    pub fn kind(&self) -> ComponentKind {
        self.domain.kind()
    }

    pub fn object(&self) -> &str {
        self.domain.object()
    }

    pub fn indices(&self) -> &[ComponentIndex] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The indices of both selections, in order, without duplicates.
    pub fn union(&self, other: &Self) -> Result<Self, ComponentError> {
        if self.object() != other.object() || self.kind() != other.kind() {
            return Err(ComponentError::ComponentMismatch {
                lhs: format!("{} {}", self.object(), self.kind()),
                rhs: format!("{} {}", other.object(), other.kind()),
            });
        }
        Ok(Self {
            domain: Rc::clone(&self.domain),
            indices: self
                .indices
                .iter()
                .chain(&other.indices)
                .cloned()
                .unique()
                .collect(),
        })
    }

    /// The compacted address strings naming the selection, in
    /// ascending index order.
    pub fn addresses(&self) -> Result<Vec<String>, ComponentError> {
        // Every index is labeled on construction.
        let label = self.domain.spec().default_label.unwrap_or_default();
        let mut sorted = self.indices.clone();
        sorted.sort_by(|a, b| a.label().cmp(&b.label()).then_with(|| a.coordinate_cmp(b)));
        sorted.dedup();
        Ok(address::encode(
            self.domain.object(),
            label,
            &sorted,
            self.domain.config(),
        ))
    }

    /// A new cursor over the selection.
    pub fn iter(&self) -> Result<ComponentIterator<H>, ComponentError> {
        if self.domain.is_continuous() {
            return Err(ComponentError::NotIterable { kind: self.kind() });
        }
        Ok(ComponentIterator::from_indices(self.indices.clone()))
    }
}
