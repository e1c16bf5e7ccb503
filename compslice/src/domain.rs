//! Component kinds and the index domain they define over an object.
//!
//! Every kind is described by a static [`DomainSpec`]: its
//! dimensionality, whether its coordinates are discrete element
//! numbers or continuous parameters, the labels it may be addressed
//! by, and where its bounds come from. [`IndexDomain`] binds a kind
//! to a host object and answers bound queries for partial indices.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use serde::Serialize;

use crate::address::Address;
use crate::config::Config;
use crate::error::ComponentError;
use crate::host::Host;
use crate::index::ComponentIndex;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;
use crate::label;

/// Whether a kind's coordinates are element numbers or parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    Discrete,
    Continuous,
}

/// Where a discrete kind's dimension lengths come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounds {
    /// Asked of the host directly with [`Host::dimension_length`].
    Native,

    /// Learned by resolving a query address spanning every index the
    /// host could accept and reading back the clamped result.
    AddressFallback,
}

/// The static description of a component kind.
#[derive(Debug)]
pub struct DomainSpec {
    pub name: &'static str,
    pub dimensions: usize,
    pub continuity: Continuity,
    /// Every label the kind may be addressed by, canonical or not.
    pub labels: &'static [&'static str],
    /// The label used when an index carries none.
    pub default_label: Option<&'static str>,
    /// `(alias, canonical)` label pairs.
    pub aliases: &'static [(&'static str, &'static str)],
    pub bounds: Bounds,
    /// Dimensions whose members are an arbitrary host-supplied list
    /// rather than `0..length`.
    pub sparse_dims: &'static [usize],
    /// The complete address must spell out `[0:N]` because the host
    /// rejects `[*]`.
    pub explicit_complete: bool,
}

const fn discrete(
    name: &'static str,
    labels: &'static [&'static str],
    dimensions: usize,
) -> DomainSpec {
    DomainSpec {
        name,
        dimensions,
        continuity: Continuity::Discrete,
        labels,
        default_label: Some(labels[0]),
        aliases: &[],
        bounds: Bounds::Native,
        sparse_dims: &[],
        explicit_complete: false,
    }
}

const fn fallback(
    name: &'static str,
    labels: &'static [&'static str],
    dimensions: usize,
) -> DomainSpec {
    DomainSpec {
        bounds: Bounds::AddressFallback,
        ..discrete(name, labels, dimensions)
    }
}

const fn continuous(
    name: &'static str,
    labels: &'static [&'static str],
    dimensions: usize,
) -> DomainSpec {
    DomainSpec {
        continuity: Continuity::Continuous,
        ..discrete(name, labels, dimensions)
    }
}

const ISOPARM_LABELS: &[&str] = &["u", "v", "uv"];
const ISOPARM_ALIASES: &[(&str, &str)] = &[("uv", "u")];

static PIVOT: DomainSpec = DomainSpec {
    default_label: None,
    ..discrete("pivot", &["rotatePivot", "scalePivot"], 0)
};
static MESH_VERTEX: DomainSpec = discrete("mesh vertex", &["vtx"], 1);
static MESH_EDGE: DomainSpec = discrete("mesh edge", &["e"], 1);
static MESH_FACE: DomainSpec = discrete("mesh face", &["f"], 1);
static MESH_UV: DomainSpec = discrete("mesh uv", &["map"], 1);
static MESH_VERTEX_FACE: DomainSpec = DomainSpec {
    sparse_dims: &[1],
    ..discrete("mesh vertex-face", &["vtxFace"], 2)
};
static SUBD_VERTEX: DomainSpec = fallback("subdiv vertex", &["smp"], 2);
static SUBD_EDGE: DomainSpec = fallback("subdiv edge", &["sme"], 2);
static SUBD_FACE: DomainSpec = fallback("subdiv face", &["smf"], 2);
static SUBD_UV: DomainSpec = DomainSpec {
    explicit_complete: true,
    ..fallback("subdiv uv", &["smm"], 1)
};
static CURVE_PARAMETER: DomainSpec = continuous("curve parameter", &["u"], 1);
static CURVE_CV: DomainSpec = discrete("curve cv", &["cv"], 1);
static CURVE_EP: DomainSpec = discrete("curve edit point", &["ep"], 1);
static CURVE_KNOT: DomainSpec = discrete("curve knot", &["knot"], 1);
static SURFACE_ISOPARM: DomainSpec = DomainSpec {
    aliases: ISOPARM_ALIASES,
    ..continuous("surface isoparm", ISOPARM_LABELS, 2)
};
static SURFACE_RANGE: DomainSpec = DomainSpec {
    aliases: ISOPARM_ALIASES,
    ..continuous("surface range", ISOPARM_LABELS, 2)
};
static SURFACE_CV: DomainSpec = discrete("surface cv", &["cv"], 2);
static SURFACE_EP: DomainSpec = discrete("surface edit point", &["ep"], 2);
static SURFACE_KNOT: DomainSpec = discrete("surface knot", &["knot"], 2);
static SURFACE_FACE: DomainSpec = discrete("surface face", &["sf"], 2);
static LATTICE_POINT: DomainSpec = discrete("lattice point", &["pt"], 3);

/// The closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Pivot,
    MeshVertex,
    MeshEdge,
    MeshFace,
    MeshUv,
    MeshVertexFace,
    SubdVertex,
    SubdEdge,
    SubdFace,
    SubdUv,
    CurveParameter,
    CurveCv,
    CurveEp,
    CurveKnot,
    SurfaceIsoparm,
    SurfaceRange,
    SurfaceCv,
    SurfaceEp,
    SurfaceKnot,
    SurfaceFace,
    LatticePoint,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 21] = [
        ComponentKind::Pivot,
        ComponentKind::MeshVertex,
        ComponentKind::MeshEdge,
        ComponentKind::MeshFace,
        ComponentKind::MeshUv,
        ComponentKind::MeshVertexFace,
        ComponentKind::SubdVertex,
        ComponentKind::SubdEdge,
        ComponentKind::SubdFace,
        ComponentKind::SubdUv,
        ComponentKind::CurveParameter,
        ComponentKind::CurveCv,
        ComponentKind::CurveEp,
        ComponentKind::CurveKnot,
        ComponentKind::SurfaceIsoparm,
        ComponentKind::SurfaceRange,
        ComponentKind::SurfaceCv,
        ComponentKind::SurfaceEp,
        ComponentKind::SurfaceKnot,
        ComponentKind::SurfaceFace,
        ComponentKind::LatticePoint,
    ];

    pub fn spec(&self) -> &'static DomainSpec {
        match self {
            ComponentKind::Pivot => &PIVOT,
            ComponentKind::MeshVertex => &MESH_VERTEX,
            ComponentKind::MeshEdge => &MESH_EDGE,
            ComponentKind::MeshFace => &MESH_FACE,
            ComponentKind::MeshUv => &MESH_UV,
            ComponentKind::MeshVertexFace => &MESH_VERTEX_FACE,
            ComponentKind::SubdVertex => &SUBD_VERTEX,
            ComponentKind::SubdEdge => &SUBD_EDGE,
            ComponentKind::SubdFace => &SUBD_FACE,
            ComponentKind::SubdUv => &SUBD_UV,
            ComponentKind::CurveParameter => &CURVE_PARAMETER,
            ComponentKind::CurveCv => &CURVE_CV,
            ComponentKind::CurveEp => &CURVE_EP,
            ComponentKind::CurveKnot => &CURVE_KNOT,
            ComponentKind::SurfaceIsoparm => &SURFACE_ISOPARM,
            ComponentKind::SurfaceRange => &SURFACE_RANGE,
            ComponentKind::SurfaceCv => &SURFACE_CV,
            ComponentKind::SurfaceEp => &SURFACE_EP,
            ComponentKind::SurfaceKnot => &SURFACE_KNOT,
            ComponentKind::SurfaceFace => &SURFACE_FACE,
            ComponentKind::LatticePoint => &LATTICE_POINT,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.spec().dimensions
    }

    pub fn is_continuous(&self) -> bool {
        self.spec().continuity == Continuity::Continuous
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().name)
    }
}

/// A component kind bound to one object on a host.
///
/// Bounds learned through the address fallback are cached per prefix
/// for the lifetime of the domain, which is shared by every component
/// derived from it. The domain is single-threaded.
pub struct IndexDomain<H: Host> {
    host: Rc<H>,
    object: String,
    kind: ComponentKind,
    config: Config,
    fallback_lengths: RefCell<HashMap<Vec<IndexEntry>, usize>>,
}

impl<H: Host> fmt::Debug for IndexDomain<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDomain")
            .field("object", &self.object)
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish()
    }
}

impl<H: Host> IndexDomain<H> {
    pub fn new<S: Into<String>>(host: Rc<H>, object: S, kind: ComponentKind) -> Self {
        Self::with_config(host, object, kind, Config::default())
    }

    pub fn with_config<S: Into<String>>(
        host: Rc<H>,
        object: S,
        kind: ComponentKind,
        config: Config,
    ) -> Self {
        Self {
            host,
            object: object.into(),
            kind,
            config,
            fallback_lengths: RefCell::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn spec(&self) -> &'static DomainSpec {
        self.kind.spec()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dimensions(&self) -> usize {
        self.spec().dimensions
    }

    pub fn is_continuous(&self) -> bool {
        self.kind.is_continuous()
    }

    pub fn is_sparse(&self, dim: usize) -> bool {
        self.spec().sparse_dims.contains(&dim)
    }

    /// The canonical label addressing `index` in this domain.
    pub fn label_for(&self, index: &ComponentIndex) -> Result<&'static str, ComponentError> {
        match index.label() {
            Some(l) => label::canonical_label(self.kind, l),
            None => self
                .spec()
                .default_label
                .ok_or(ComponentError::MissingLabel { kind: self.kind }),
        }
    }

    /// The number of elements along the dimension following the
    /// concrete prefix `partial`.
    pub fn length(&self, partial: &ComponentIndex) -> Result<usize, ComponentError> {
        if self.is_continuous() {
            return Err(ComponentError::NotIterable { kind: self.kind });
        }
        if partial.len() >= self.dimensions() {
            return Err(ComponentError::TooDeep {
                index: partial.clone(),
                num_dim: self.dimensions(),
            });
        }
        if self.is_sparse(partial.len()) {
            return Ok(self.members(partial)?.len());
        }
        match self.spec().bounds {
            Bounds::Native => Ok(self
                .host
                .dimension_length(&self.object, self.kind, partial)?),
            Bounds::AddressFallback => self.fallback_length(partial),
        }
    }

    /// The inclusive bounds of the dimension following `partial`:
    /// `(-length, length - 1)` for discrete kinds, the host's
    /// parameter range for continuous ones.
    pub fn range(&self, partial: &ComponentIndex) -> Result<(Scalar, Scalar), ComponentError> {
        if self.is_continuous() {
            let (min, max) = self
                .host
                .dimension_range(&self.object, self.kind, partial)?;
            return Ok((Scalar::Real(min), Scalar::Real(max)));
        }
        let length = self.length(partial)? as i64;
        Ok((Scalar::Int(-length), Scalar::Int(length - 1)))
    }

    /// Translates a negative scalar into its concrete counterpart at
    /// `partial`. Continuous coordinates are literal and returned as
    /// is; so are non-negative discrete ones.
    pub fn translate_negative(
        &self,
        value: Scalar,
        partial: &ComponentIndex,
    ) -> Result<Scalar, ComponentError> {
        if self.is_continuous() || !value.is_negative() {
            return Ok(value);
        }
        let i = match value {
            Scalar::Int(i) => i,
            Scalar::Real(_) => {
                return Err(ComponentError::InvalidEntry {
                    entry: IndexEntry::Scalar(value),
                    kind: self.kind,
                });
            }
        };
        if self.is_sparse(partial.len()) {
            let members = self.members(partial)?;
            let len = members.len() as i64;
            return match usize::try_from(len + i) {
                Ok(at) => Ok(Scalar::Int(members[at])),
                Err(_) => Err(self.sparse_out_of_range(value, partial.len(), &members)),
            };
        }
        let length = self.length(partial)? as i64;
        if length + i < 0 {
            return Err(ComponentError::IndexOutOfRange {
                value,
                dim: partial.len(),
                min: Scalar::Int(-length),
                max: Scalar::Int(length - 1),
            });
        }
        Ok(Scalar::Int(length + i))
    }

    /// The members of the sparse dimension following `partial`.
    pub fn members(&self, partial: &ComponentIndex) -> Result<Vec<i64>, ComponentError> {
        Ok(self
            .host
            .dimension_members(&self.object, self.kind, partial)?)
    }

    pub(crate) fn sparse_out_of_range(
        &self,
        value: Scalar,
        dim: usize,
        members: &[i64],
    ) -> ComponentError {
        ComponentError::IndexOutOfRange {
            value,
            dim,
            min: Scalar::Int(-(members.len() as i64)),
            max: Scalar::Int(members.iter().copied().max().unwrap_or(-1)),
        }
    }

    /// The address naming every element of this domain.
    pub fn complete_address(&self, label: &str) -> Result<String, ComponentError> {
        let mut address = format!("{}.{}", self.object, label);
        if self.spec().explicit_complete {
            let length = self.length(&ComponentIndex::default())?;
            if length == 0 {
                return Err(ComponentError::UndeterminedBound { address });
            }
            address.push_str(&format!("[0:{}]", length - 1));
        } else {
            for _ in 0..self.dimensions() {
                address.push_str("[*]");
            }
        }
        Ok(address)
    }

    // Kinds without native bounds: resolve a query address spanning
    // every index the host could accept at `partial`, then read the
    // largest index back out of the host's clamped rendition.
    fn fallback_length(&self, partial: &ComponentIndex) -> Result<usize, ComponentError> {
        if let Some(length) = self.fallback_lengths.borrow().get(partial.entries()) {
            tracing::trace!("{}: cached length {} at {}", self.object, length, partial);
            return Ok(*length);
        }

        let label = self.label_for(partial)?;
        let dim = partial.len();
        let query = Address::new(
            self.object.clone(),
            label,
            partial
                .entries()
                .iter()
                .cloned()
                .chain(std::iter::once(IndexEntry::Range(Range::closed(
                    0,
                    self.config.fallback_max_index,
                ))))
                .collect(),
        )
        .to_string();

        tracing::debug!("{}: querying bound with {}", self.object, query);
        let handle = self
            .host
            .resolve_address(&query)
            .map_err(|source| ComponentError::UnresolvedAddress {
                address: query.clone(),
                source,
            })?;
        let strings = self.host.address_strings(&handle)?;
        tracing::debug!("{}: host clamped {} to {:?}", self.object, query, strings);

        let mut max: Option<i64> = None;
        for s in &strings {
            let address: Address = s.parse()?;
            let top = address
                .groups()
                .get(dim)
                .and_then(max_index)
                .ok_or_else(|| ComponentError::UndeterminedBound {
                    address: s.clone(),
                })?;
            max = Some(max.map_or(top, |m| m.max(top)));
        }
        let length = length_after(max);

        self.fallback_lengths
            .borrow_mut()
            .insert(partial.entries().to_vec(), length);
        Ok(length)
    }
}

// The length of a dimension whose largest index is `max`.
fn length_after(max: Option<i64>) -> usize {
    max.map_or(0, |m| m.saturating_add(1).max(0) as usize)
}

// The largest concrete index named by one bracket group.
fn max_index(entry: &IndexEntry) -> Option<i64> {
    match entry {
        IndexEntry::Scalar(s) => s.as_int(),
        IndexEntry::Range(r) => r.stop().and_then(|s| s.as_int()),
        IndexEntry::Nested(entries) => entries.iter().filter_map(max_index).max(),
        IndexEntry::Wildcard => None,
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::index;
    use crate::test_utils::MockHost;

    #[test]
    fn test_kind_table() {
        for kind in ComponentKind::ALL {
            let spec = kind.spec();
            assert!(spec.dimensions <= 3, "{}", kind);
            assert!(!spec.labels.is_empty(), "{}", kind);
            if let Some(default) = spec.default_label {
                assert!(spec.labels.contains(&default), "{}", kind);
            }
            for dim in spec.sparse_dims {
                assert!(*dim < spec.dimensions, "{}", kind);
            }
        }
        assert_eq!(ComponentKind::Pivot.dimensions(), 0);
        assert_eq!(ComponentKind::LatticePoint.dimensions(), 3);
        assert!(ComponentKind::SurfaceRange.is_continuous());
        assert!(!ComponentKind::SurfaceCv.is_continuous());
        assert_eq!(ComponentKind::MeshVertexFace.to_string(), "mesh vertex-face");
    }

    #[test]
    fn test_discrete_range_and_negatives() {
        let host = Rc::new(MockHost::new().with_lengths("pPlane1", ComponentKind::MeshVertex, &[10]));
        let domain = IndexDomain::new(host, "pPlane1", ComponentKind::MeshVertex);
        let root = ComponentIndex::default();

        assert_eq!(domain.length(&root).unwrap(), 10);
        assert_eq!(
            domain.range(&root).unwrap(),
            (Scalar::Int(-10), Scalar::Int(9))
        );
        assert_eq!(
            domain.translate_negative(Scalar::Int(-1), &root).unwrap(),
            Scalar::Int(9)
        );
        assert_eq!(
            domain.translate_negative(Scalar::Int(-10), &root).unwrap(),
            Scalar::Int(0)
        );
        assert_eq!(
            domain.translate_negative(Scalar::Int(4), &root).unwrap(),
            Scalar::Int(4)
        );
        assert!(matches!(
            domain.translate_negative(Scalar::Int(-11), &root),
            Err(ComponentError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_continuous_range() {
        let host = Rc::new(
            MockHost::new().with_range("curve1", ComponentKind::CurveParameter, (-1.0, 3.0)),
        );
        let domain = IndexDomain::new(host, "curve1", ComponentKind::CurveParameter);
        let root = ComponentIndex::default();

        assert_eq!(
            domain.range(&root).unwrap(),
            (Scalar::Real(-1.0), Scalar::Real(3.0))
        );
        assert_eq!(
            domain.translate_negative(Scalar::Real(-0.5), &root).unwrap(),
            Scalar::Real(-0.5)
        );
        assert!(matches!(
            domain.length(&root),
            Err(ComponentError::NotIterable { .. })
        ));
    }

    #[test]
    fn test_sparse_members() {
        let host = Rc::new(
            MockHost::new()
                .with_lengths("pCube1", ComponentKind::MeshVertexFace, &[8])
                .with_members("pCube1", 2, &[3, 6, 187]),
        );
        let domain = IndexDomain::new(host, "pCube1", ComponentKind::MeshVertexFace);
        let vertex = index![2];

        assert_eq!(domain.length(&vertex).unwrap(), 3);
        assert_eq!(
            domain.translate_negative(Scalar::Int(-1), &vertex).unwrap(),
            Scalar::Int(187)
        );
        assert!(matches!(
            domain.translate_negative(Scalar::Int(-4), &vertex),
            Err(ComponentError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_labels() {
        let host = Rc::new(MockHost::new());
        let isoparm = IndexDomain::new(host.clone(), "surf1", ComponentKind::SurfaceIsoparm);
        assert_eq!(isoparm.label_for(&index![]).unwrap(), "u");
        assert_eq!(isoparm.label_for(&index![label = "uv"; 0.5]).unwrap(), "u");
        assert_eq!(isoparm.label_for(&index![label = "v"; 0.5]).unwrap(), "v");
        assert!(matches!(
            isoparm.label_for(&index![label = "w"; 0.5]),
            Err(ComponentError::InvalidLabel { .. })
        ));

        let pivot = IndexDomain::new(host, "xform1", ComponentKind::Pivot);
        assert!(matches!(
            pivot.label_for(&index![]),
            Err(ComponentError::MissingLabel { .. })
        ));
        assert_eq!(
            pivot.complete_address("scalePivot").unwrap(),
            "xform1.scalePivot"
        );
    }

    #[traced_test]
    #[test]
    fn test_fallback_length_is_cached() {
        let host = Rc::new(MockHost::new().with_lengths("subd1", ComponentKind::SubdUv, &[207]));
        let domain = IndexDomain::new(host.clone(), "subd1", ComponentKind::SubdUv);
        let root = ComponentIndex::default();

        assert_eq!(domain.length(&root).unwrap(), 207);
        assert_eq!(host.round_trips(), 1);
        assert!(logs_contain("querying bound with subd1.smm[0:2147483647]"));

        assert_eq!(domain.length(&root).unwrap(), 207);
        assert_eq!(host.round_trips(), 1);
        assert!(logs_contain("cached length 207"));

        assert_eq!(domain.complete_address("smm").unwrap(), "subd1.smm[0:206]");
        assert_eq!(host.round_trips(), 1);
    }

    #[test]
    fn test_fallback_cache_ignores_label() {
        let host = Rc::new(MockHost::new().with_lengths("subd1", ComponentKind::SubdUv, &[207]));
        let domain = IndexDomain::new(host.clone(), "subd1", ComponentKind::SubdUv);

        assert_eq!(domain.length(&index![]).unwrap(), 207);
        assert_eq!(
            domain
                .length(&ComponentIndex::empty(Some("smm".to_string())))
                .unwrap(),
            207
        );
        assert_eq!(host.round_trips(), 1);
    }

    #[test]
    fn test_length_after_largest_index() {
        assert_eq!(length_after(None), 0);
        assert_eq!(length_after(Some(4)), 5);
        assert_eq!(length_after(Some(-3)), 0);
        assert_eq!(length_after(Some(i64::MAX)), i64::MAX as usize);
    }

    #[test]
    fn test_fallback_respects_config() {
        let host = Rc::new(MockHost::new().with_lengths("subd1", ComponentKind::SubdVertex, &[4, 9]));
        let domain = IndexDomain::with_config(
            host,
            "subd1",
            ComponentKind::SubdVertex,
            Config {
                fallback_max_index: 5,
                ..Config::default()
            },
        );
        assert_eq!(domain.length(&index![]).unwrap(), 4);
        // Clamped by the query range before the host's own bound.
        assert_eq!(domain.length(&index![1]).unwrap(), 6);
    }
}
