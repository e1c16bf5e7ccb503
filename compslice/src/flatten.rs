//! Flattening partial, sliced and nested indices into concrete ones.

use std::collections::HashSet;

use crate::domain::IndexDomain;
use crate::error::ComponentError;
use crate::expand::expand_range;
use crate::host::Host;
use crate::index::ComponentIndex;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;

/// Flattens `index` into the concrete indices it denotes in `domain`.
///
/// The index is padded with wildcards up to the domain's
/// dimensionality and expanded left to right: every prefix produced
/// for one dimension is expanded against the next dimension's entry,
/// so results are ordered by prefix first and then by ascending
/// expansion order. Negative scalars are translated against the
/// length at their own prefix. Continuous ranges are not enumerable
/// and are kept as ranges.
///
/// A nested entry denotes a collection of alternatives. Each member
/// is substituted in turn and the resulting indices are unioned,
/// keeping first occurrences. Members may not be nested, and no entry
/// following a nested one may be nested either.
pub fn flatten<H: Host>(
    domain: &IndexDomain<H>,
    index: &ComponentIndex,
) -> Result<Vec<ComponentIndex>, ComponentError> {
    DimensionWalk::new(domain, index)?.collect(domain)
}

/// Like [`flatten`], but without padding: produces the concrete
/// prefixes spelled by `index` alone.
pub fn flatten_prefix<H: Host>(
    domain: &IndexDomain<H>,
    index: &ComponentIndex,
) -> Result<Vec<ComponentIndex>, ComponentError> {
    DimensionWalk::unpadded(domain, index)?.collect(domain)
}

#[derive(Debug, Clone)]
struct Level {
    items: Vec<ComponentIndex>,
    at: usize,
}

/// A depth-first walk over the concrete indices an index denotes, in
/// [`flatten`] order. A dimension is expanded only when the walk
/// first reaches its prefix, so the first element costs one bound
/// query per dimension rather than one per prefix.
///
/// The walk does not own its domain; every step takes the domain it
/// was created for.
#[derive(Debug, Clone)]
pub struct DimensionWalk {
    index: ComponentIndex,
    levels: Vec<Level>,
    // Elements yielded so far, when a nested entry can repeat them.
    seen: Option<HashSet<ComponentIndex>>,
    started: bool,
}

impl DimensionWalk {
    /// A walk over `index` padded to the domain's dimensionality.
    pub fn new<H: Host>(
        domain: &IndexDomain<H>,
        index: &ComponentIndex,
    ) -> Result<Self, ComponentError> {
        let walk = Self::unpadded(domain, index)?;
        Ok(Self {
            index: walk.index.padded(domain.dimensions()),
            ..walk
        })
    }

    /// A walk over the prefixes spelled by `index` alone.
    pub fn unpadded<H: Host>(
        domain: &IndexDomain<H>,
        index: &ComponentIndex,
    ) -> Result<Self, ComponentError> {
        let num_dim = domain.dimensions();
        if index.len() > num_dim {
            return Err(ComponentError::TooDeep {
                index: index.clone(),
                num_dim,
            });
        }
        check_nesting(domain, index)?;
        let nested = index.entries().iter().any(IndexEntry::is_nested);
        Ok(Self {
            index: index.clone(),
            levels: Vec::new(),
            seen: nested.then(HashSet::new),
            started: false,
        })
    }

    /// Rewinds to the first element.
    pub fn restart(&mut self) {
        self.levels.clear();
        if let Some(seen) = &mut self.seen {
            seen.clear();
        }
        self.started = false;
    }

    /// The next concrete index, or `None` once the walk is exhausted.
    /// A failed expansion ends the walk.
    pub fn next_index<H: Host>(
        &mut self,
        domain: &IndexDomain<H>,
    ) -> Option<Result<ComponentIndex, ComponentError>> {
        loop {
            match self.step(domain) {
                Ok(Some(index)) => {
                    if let Some(seen) = &mut self.seen {
                        if !seen.insert(index.clone()) {
                            continue;
                        }
                    }
                    return Some(Ok(index));
                }
                Ok(None) => return None,
                Err(err) => {
                    self.levels.clear();
                    self.started = true;
                    return Some(Err(err));
                }
            }
        }
    }

    /// Drains the rest of the walk.
    pub fn collect<H: Host>(
        mut self,
        domain: &IndexDomain<H>,
    ) -> Result<Vec<ComponentIndex>, ComponentError> {
        let mut flat = Vec::new();
        while let Some(index) = self.next_index(domain) {
            flat.push(index?);
        }
        Ok(flat)
    }

    /// The number of elements left in the walk.
    pub fn count_remaining<H: Host>(
        &mut self,
        domain: &IndexDomain<H>,
    ) -> Result<usize, ComponentError> {
        let mut count = 0;
        while let Some(index) = self.next_index(domain) {
            index?;
            count += 1;
        }
        Ok(count)
    }

    fn step<H: Host>(
        &mut self,
        domain: &IndexDomain<H>,
    ) -> Result<Option<ComponentIndex>, ComponentError> {
        let num_dim = self.index.len();
        if !self.started {
            self.started = true;
            let root = ComponentIndex::empty(self.index.label().map(String::from));
            if num_dim == 0 {
                return Ok(Some(root));
            }
            let items = expand_at(domain, &self.index.entries()[0], &root)?;
            self.levels.push(Level { items, at: 0 });
        }

        loop {
            let depth = self.levels.len();
            let Some(level) = self.levels.last_mut() else {
                return Ok(None);
            };
            let Some(item) = level.items.get(level.at).cloned() else {
                self.levels.pop();
                if let Some(parent) = self.levels.last_mut() {
                    parent.at += 1;
                }
                continue;
            };
            if depth == num_dim {
                level.at += 1;
                return Ok(Some(item));
            }
            let items = expand_at(domain, &self.index.entries()[depth], &item)?;
            self.levels.push(Level { items, at: 0 });
        }
    }
}

// At most one entry may be nested, with non-nested members, and only
// on discrete domains.
fn check_nesting<H: Host>(
    domain: &IndexDomain<H>,
    index: &ComponentIndex,
) -> Result<(), ComponentError> {
    let mut seen_nested = false;
    for (dim, entry) in index.entries().iter().enumerate() {
        let IndexEntry::Nested(members) = entry else {
            continue;
        };
        if seen_nested {
            return Err(ComponentError::NestedIterable {
                entry: entry.clone(),
                dim,
            });
        }
        if domain.is_continuous() {
            return Err(ComponentError::InvalidEntry {
                entry: entry.clone(),
                kind: domain.kind(),
            });
        }
        if let Some(member) = members.iter().find(|m| m.is_nested()) {
            return Err(ComponentError::NestedIterable {
                entry: member.clone(),
                dim,
            });
        }
        seen_nested = true;
    }
    Ok(())
}

// Expands one entry after `prefix`; a nested entry expands to its
// members' expansions, in order.
fn expand_at<H: Host>(
    domain: &IndexDomain<H>,
    entry: &IndexEntry,
    prefix: &ComponentIndex,
) -> Result<Vec<ComponentIndex>, ComponentError> {
    match entry {
        IndexEntry::Nested(members) => {
            let mut items = Vec::new();
            for member in members {
                items.extend(expand_entry(domain, member, prefix)?);
            }
            Ok(items)
        }
        _ => expand_entry(domain, entry, prefix),
    }
}

// Expands a single non-nested entry after `prefix`.
fn expand_entry<H: Host>(
    domain: &IndexDomain<H>,
    entry: &IndexEntry,
    prefix: &ComponentIndex,
) -> Result<Vec<ComponentIndex>, ComponentError> {
    match entry {
        IndexEntry::Scalar(value) => {
            if !domain.is_continuous() && matches!(value, Scalar::Real(_)) {
                return Err(ComponentError::InvalidEntry {
                    entry: entry.clone(),
                    kind: domain.kind(),
                });
            }
            let value = domain.translate_negative(*value, prefix)?;
            Ok(vec![prefix.pushed(value)])
        }
        IndexEntry::Range(range) => expand_range(domain, range, prefix),
        IndexEntry::Wildcard => expand_range(domain, &Range::full(), prefix),
        IndexEntry::Nested(_) => Err(ComponentError::NestedIterable {
            entry: entry.clone(),
            dim: prefix.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::domain::ComponentKind;
    use crate::index;
    use crate::test_utils::MockHost;

    fn surface_cvs(lengths: &[usize]) -> IndexDomain<MockHost> {
        let host = MockHost::new().with_lengths("surf1", ComponentKind::SurfaceCv, lengths);
        IndexDomain::new(Rc::new(host), "surf1", ComponentKind::SurfaceCv)
    }

    fn vertex_faces() -> IndexDomain<MockHost> {
        let host = MockHost::new()
            .with_lengths("pCube1", ComponentKind::MeshVertexFace, &[3])
            .with_members("pCube1", 0, &[1, 2])
            .with_members("pCube1", 1, &[5])
            .with_members("pCube1", 2, &[0, 4, 7]);
        IndexDomain::new(Rc::new(host), "pCube1", ComponentKind::MeshVertexFace)
    }

    #[test]
    fn test_ordering() {
        let domain = surface_cvs(&[5, 1]);
        let flat = flatten(&domain, &index![Range::closed(0, 2), Range::closed(0, 1)]).unwrap();
        assert_eq!(flat, vec![index![0, 0], index![1, 0], index![2, 0]]);
    }

    #[test]
    fn test_padding() {
        let domain = surface_cvs(&[2, 3]);
        let flat = flatten(&domain, &index![label = "cv"; 1]).unwrap();
        assert_eq!(
            flat,
            vec![
                index![label = "cv"; 1, 0],
                index![label = "cv"; 1, 1],
                index![label = "cv"; 1, 2],
            ]
        );
        assert_eq!(flatten(&domain, &index![]).unwrap().len(), 6);
        assert_eq!(flatten_prefix(&domain, &index![..]).unwrap(), vec![index![0], index![1]]);
    }

    #[test]
    fn test_wildcard_matches_length() {
        let domain = surface_cvs(&[4, 7]);
        for prefix in [index![], index![0], index![3]] {
            let expanded = flatten_prefix(&domain, &prefix.pushed(IndexEntry::Wildcard)).unwrap();
            assert_eq!(expanded.len(), domain.length(&prefix).unwrap(), "{}", prefix);
        }
    }

    #[test]
    fn test_negative_translation_is_per_prefix() {
        let domain = vertex_faces();
        let flat = flatten(&domain, &index![IndexEntry::nested([0, 1, 2]), -1]).unwrap();
        assert_eq!(flat, vec![index![0, 2], index![1, 5], index![2, 7]]);

        let flat = flatten(&domain, &index![.., -1]).unwrap();
        assert_eq!(flat, vec![index![0, 2], index![1, 5], index![2, 7]]);
    }

    #[test]
    fn test_negative_translation_out_of_range() {
        let domain = vertex_faces();
        // Vertex 1 has a single face.
        assert!(matches!(
            flatten(&domain, &index![.., -2]),
            Err(ComponentError::IndexOutOfRange { dim: 1, .. })
        ));
        assert_eq!(
            flatten(&domain, &index![IndexEntry::nested([0, 2]), -2]).unwrap(),
            vec![index![0, 1], index![2, 4]]
        );
    }

    #[test]
    fn test_nested() {
        let domain = surface_cvs(&[5, 2]);
        let flat = flatten(&domain, &index![IndexEntry::nested([1, 3, 1]), 0]).unwrap();
        assert_eq!(flat, vec![index![1, 0], index![3, 0]]);

        let flat = flatten(
            &domain,
            &index![IndexEntry::nested([IndexEntry::from(-1), IndexEntry::from(0..=1)]), 1],
        )
        .unwrap();
        assert_eq!(flat, vec![index![4, 1], index![0, 1], index![1, 1]]);

        assert!(matches!(
            flatten(&domain, &index![IndexEntry::nested([1, 2]), IndexEntry::nested([0, 1])]),
            Err(ComponentError::NestedIterable { dim: 1, .. })
        ));
        assert!(matches!(
            flatten(
                &domain,
                &index![IndexEntry::nested([IndexEntry::nested([1, 2])])]
            ),
            Err(ComponentError::NestedIterable { dim: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_entries() {
        let domain = surface_cvs(&[5, 2]);
        assert!(matches!(
            flatten(&domain, &index![1, 0, 0]),
            Err(ComponentError::TooDeep { num_dim: 2, .. })
        ));
        assert!(matches!(
            flatten(&domain, &index![0.5]),
            Err(ComponentError::InvalidEntry { .. })
        ));

        let host = MockHost::new().with_range("surf1", ComponentKind::SurfaceIsoparm, (0.0, 1.0));
        let isoparms = IndexDomain::new(Rc::new(host), "surf1", ComponentKind::SurfaceIsoparm);
        assert!(matches!(
            flatten(&isoparms, &index![IndexEntry::nested([0.25, 0.5])]),
            Err(ComponentError::InvalidEntry { .. })
        ));
        assert_eq!(
            flatten(&isoparms, &index![label = "u"; -0.5]).unwrap(),
            vec![index![label = "u"; -0.5, ..]]
        );
    }
}
