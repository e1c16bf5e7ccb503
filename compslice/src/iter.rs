//! Restartable cursors over a component's elements.
//!
//! A cursor walks a component dimension by dimension, walks a list of
//! already known indices, or walks one or more host handles by flat
//! position. Dimension-wise cursors expand each prefix only when they
//! reach it. Handle-backed cursors read from host state: if the
//! geometry changes shape while such a cursor is live, the elements
//! it yields are undefined.

use std::fmt;
use std::rc::Rc;

use crate::domain::IndexDomain;
use crate::error::ComponentError;
use crate::flatten::DimensionWalk;
use crate::host::Host;
use crate::index::ComponentIndex;
use crate::index::Scalar;

enum Source<H: Host> {
    Dimensions {
        domain: Rc<IndexDomain<H>>,
        walk: DimensionWalk,
        // The element at the cursor, once pulled from the walk.
        peeked: Option<ComponentIndex>,
        len: Option<usize>,
    },
    Indices(Vec<ComponentIndex>),
    Handles {
        host: Rc<H>,
        handles: Vec<H::Handle>,
        counts: Vec<usize>,
    },
}

/// A forward cursor over the elements of a component. Besides the
/// [`Iterator`] interface it can be rewound with [`reset`] and
/// repositioned with [`set_index`].
///
/// [`reset`]: ComponentIterator::reset
/// [`set_index`]: ComponentIterator::set_index
pub struct ComponentIterator<H: Host> {
    source: Source<H>,
    cursor: usize,
}

impl<H: Host> fmt::Debug for ComponentIterator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match &self.source {
            Source::Dimensions { .. } => "dimensions",
            Source::Indices(_) => "indices",
            Source::Handles { .. } => "handles",
        };
        f.debug_struct("ComponentIterator")
            .field("strategy", &strategy)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<H: Host> ComponentIterator<H> {
    pub(crate) fn by_dimension(
        domain: Rc<IndexDomain<H>>,
        index: &ComponentIndex,
    ) -> Result<Self, ComponentError> {
        let walk = DimensionWalk::new(&domain, index)?;
        Ok(Self {
            source: Source::Dimensions {
                domain,
                walk,
                peeked: None,
                len: None,
            },
            cursor: 0,
        })
    }

    pub(crate) fn from_indices(indices: Vec<ComponentIndex>) -> Self {
        Self {
            source: Source::Indices(indices),
            cursor: 0,
        }
    }

    pub(crate) fn from_handles(
        host: Rc<H>,
        handles: Vec<H::Handle>,
    ) -> Result<Self, ComponentError> {
        let counts = handles
            .iter()
            .map(|handle| host.element_count(handle))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: Source::Handles {
                host,
                handles,
                counts,
            },
            cursor: 0,
        })
    }

    /// The number of elements in the sequence. A dimension-wise
    /// cursor enumerates a separate walk to learn it, once.
    pub fn len(&mut self) -> Result<usize, ComponentError> {
        match &mut self.source {
            Source::Dimensions {
                domain, walk, len, ..
            } => {
                if let Some(len) = len {
                    return Ok(*len);
                }
                let mut counter = walk.clone();
                counter.restart();
                let count = counter.count_remaining(domain)?;
                *len = Some(count);
                Ok(count)
            }
            Source::Indices(indices) => Ok(indices.len()),
            Source::Handles { counts, .. } => Ok(counts.iter().sum()),
        }
    }

    pub fn is_empty(&mut self) -> Result<bool, ComponentError> {
        Ok(self.len()? == 0)
    }

    /// Rewinds to the first element.
    pub fn reset(&mut self) {
        self.cursor = 0;
        if let Source::Dimensions { walk, peeked, .. } = &mut self.source {
            walk.restart();
            *peeked = None;
        }
    }

    /// The position of the element the next call to
    /// [`next_element`](Self::next_element) returns.
    pub fn index(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor to `index`. Moving to the end of the sequence
    /// is allowed; moving past it is not.
    pub fn set_index(&mut self, index: usize) -> Result<(), ComponentError> {
        let len = self.len()?;
        if index > len {
            return Err(ComponentError::IndexOutOfRange {
                value: Scalar::Int(index as i64),
                dim: 0,
                min: Scalar::Int(0),
                max: Scalar::Int(len as i64),
            });
        }
        if !matches!(self.source, Source::Dimensions { .. }) {
            self.cursor = index;
            return Ok(());
        }
        if index < self.cursor {
            self.reset();
        }
        while self.cursor < index {
            match self.next_element() {
                Some(Ok(_)) => (),
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }
        Ok(())
    }

    /// The element at the cursor, without advancing. `None` at the end
    /// of the sequence.
    pub fn current(&mut self) -> Option<Result<ComponentIndex, ComponentError>> {
        match &mut self.source {
            Source::Dimensions {
                domain,
                walk,
                peeked,
                ..
            } => {
                if peeked.is_none() {
                    match walk.next_index(domain)? {
                        Ok(index) => *peeked = Some(index),
                        Err(err) => return Some(Err(err)),
                    }
                }
                peeked.clone().map(Ok)
            }
            Source::Indices(indices) => indices.get(self.cursor).cloned().map(Ok),
            Source::Handles {
                host,
                handles,
                counts,
            } => {
                let mut offset = self.cursor;
                for (handle, count) in handles.iter().zip(counts) {
                    if offset < *count {
                        return Some(host.element_at(handle, offset).map_err(Into::into));
                    }
                    offset -= *count;
                }
                None
            }
        }
    }

    /// The element at the cursor, advancing past it. `None` at the end
    /// of the sequence.
    pub fn next_element(&mut self) -> Option<Result<ComponentIndex, ComponentError>> {
        let element = self.current()?;
        self.cursor += 1;
        if let Source::Dimensions { peeked, .. } = &mut self.source {
            *peeked = None;
        }
        Some(element)
    }
}

impl<H: Host> Iterator for ComponentIterator<H> {
    type Item = Result<ComponentIndex, ComponentError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_element()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.source {
            Source::Dimensions { len: None, .. } => return (0, None),
            Source::Dimensions { len: Some(len), .. } => *len,
            Source::Indices(indices) => indices.len(),
            Source::Handles { counts, .. } => counts.iter().sum(),
        };
        let remaining = len.saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}
