//! Progressive indexing of geometric sub-elements.
//!
//! A component names a set of sub-elements of one object: vertices of
//! a mesh, control points of a surface, parameter values along a
//! curve. Components are built by chained indexing with
//! [`ProgressiveComponent::get`], one dimension at a time. Each step
//! is validated against the bounds the [`Host`] reports for the
//! prefix fixed so far, and may use negative indices, inclusive
//! ranges, wildcards and lists.
//!
//! Components and textual addresses such as `pPlane1.vtx[0:3,7]`
//! convert both ways; see [`address`].
//!
//! ```
//! use compslice::IndexEntry;
//! use compslice::address::Address;
//! use compslice::index;
//!
//! let address: Address = "surf1.cv[1,3][*]".parse().unwrap();
//! assert_eq!(
//!     address.index(),
//!     index![label = "cv"; IndexEntry::nested([1, 3]), IndexEntry::Wildcard]
//! );
//! ```

/// Textual addresses: parsing, encoding and counting.
pub mod address;

/// Runtime configuration.
pub mod config;

/// Component kinds and the per-object index domains they span.
pub mod domain;

/// Errors raised by component operations.
pub mod error;

/// Range expansion along one dimension.
pub mod expand;

/// Flattening of partial and nested indices.
pub mod flatten;

/// The interface to the geometry host.
pub mod host;

/// Index entries and component indices.
pub mod index;

/// Label canonicalization.
pub mod label;

mod component;
mod iter;

#[cfg(test)]
mod test_utils;

pub use component::MaterializedComponent;
pub use component::ProgressiveComponent;
pub use config::Config;
pub use domain::ComponentKind;
pub use domain::IndexDomain;
pub use error::ComponentError;
pub use host::Host;
pub use host::HostError;
pub use index::ComponentIndex;
pub use index::IndexEntry;
pub use index::Range;
pub use index::Scalar;
pub use iter::ComponentIterator;
