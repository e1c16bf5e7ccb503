//! The scene host: the external collaborator that owns geometry and
//! answers bound queries, and that translates between address strings
//! and its own native element handles.

use std::fmt;

use crate::domain::ComponentKind;
use crate::index::ComponentIndex;

/// Errors reported by a [`Host`].
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no such object `{0}`")]
    NoSuchObject(String),

    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error("{kind} does not support {operation}")]
    Unsupported {
        kind: ComponentKind,
        operation: &'static str,
    },

    #[error("{0}")]
    Other(String),
}

/// The primitives this crate consumes from the scene host.
///
/// Objects are referred to by name; a component never owns the object
/// it addresses. Calls are synchronous and the host is assumed to be
/// single-client: callers serialize access.
///
/// Handles are host-owned. Two handles obtained at different times
/// need not denote the same elements if the geometry changed in
/// between.
pub trait Host {
    /// A resolved, concrete subset of an object's elements.
    type Handle: Clone + fmt::Debug;

    /// The number of elements along the dimension following
    /// `partial`. Only called for discrete kinds with native bounds.
    fn dimension_length(
        &self,
        object: &str,
        kind: ComponentKind,
        partial: &ComponentIndex,
    ) -> Result<usize, HostError>;

    /// The inclusive `(min, max)` parameter range along the dimension
    /// following `partial`. Only called for continuous kinds.
    fn dimension_range(
        &self,
        object: &str,
        kind: ComponentKind,
        partial: &ComponentIndex,
    ) -> Result<(f64, f64), HostError>;

    /// The members of a sparse dimension following `partial`, in
    /// host order.
    fn dimension_members(
        &self,
        _object: &str,
        kind: ComponentKind,
        _partial: &ComponentIndex,
    ) -> Result<Vec<i64>, HostError> {
        Err(HostError::Unsupported {
            kind,
            operation: "sparse dimensions",
        })
    }

    /// Resolves an address string into a native handle.
    fn resolve_address(&self, address: &str) -> Result<Self::Handle, HostError>;

    /// The host's normalized (clamped) address strings for a handle.
    fn address_strings(&self, handle: &Self::Handle) -> Result<Vec<String>, HostError>;

    /// The number of elements in a handle.
    fn element_count(&self, handle: &Self::Handle) -> Result<usize, HostError>;

    /// The element at `flat_index` within a handle.
    fn element_at(
        &self,
        handle: &Self::Handle,
        flat_index: usize,
    ) -> Result<ComponentIndex, HostError>;

    /// Whether a handle denotes every element of its kind on its
    /// object.
    fn is_complete(&self, _handle: &Self::Handle) -> Result<bool, HostError> {
        Ok(false)
    }
}
