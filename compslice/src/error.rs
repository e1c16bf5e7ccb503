use crate::domain::ComponentKind;
use crate::host::HostError;
use crate::index::ComponentIndex;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;

/// Errors raised by index construction, validation, expansion and
/// address translation. All of them are caller-correctable: an
/// operation either succeeds or fails without leaving any component
/// state behind.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("{value} out of range [{min}, {max}] for dimension {dim}")]
    IndexOutOfRange {
        value: Scalar,
        dim: usize,
        min: Scalar,
        max: Scalar,
    },

    #[error("negative step in range {range}")]
    NegativeStep { range: Range },

    #[error("zero step in range {range}")]
    ZeroStep { range: Range },

    #[error("{kind} does not support stepped range {range}")]
    SliceStepUnsupported { range: Range, kind: ComponentKind },

    #[error("nested collection `{entry}` below the top level of dimension {dim}")]
    NestedIterable { entry: IndexEntry, dim: usize },

    #[error("cannot combine labels `{lhs}` and `{rhs}`")]
    LabelConflict { lhs: String, rhs: String },

    #[error("cannot combine components of `{lhs}` and `{rhs}`")]
    ComponentMismatch { lhs: String, rhs: String },

    #[error("`{component}` is fully specified and cannot be indexed further")]
    NotIndexable { component: String },

    #[error("could not resolve `{address}`")]
    UnresolvedAddress {
        address: String,
        #[source]
        source: HostError,
    },

    #[error("invalid index entry `{entry}` for {kind}")]
    InvalidEntry { entry: IndexEntry, kind: ComponentKind },

    #[error("invalid label `{label}` for {kind}")]
    InvalidLabel { label: String, kind: ComponentKind },

    #[error("{kind} requires a label")]
    MissingLabel { kind: ComponentKind },

    #[error("index `{index}` exceeds dimensionality {num_dim}")]
    TooDeep { index: ComponentIndex, num_dim: usize },

    #[error("{kind} components cannot be enumerated")]
    NotIterable { kind: ComponentKind },

    #[error("dimension {dim} only accepts `*` as a range, got {range}")]
    SparseSlice { range: Range, dim: usize },

    #[error("invalid address `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error("address `{address}` has an open-ended range")]
    UnboundedAddress { address: String },

    #[error("could not determine bound from `{address}`")]
    UndeterminedBound { address: String },

    #[error(transparent)]
    Host(#[from] HostError),
}
