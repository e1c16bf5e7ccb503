//! Range expansion along a single dimension.

use crate::domain::IndexDomain;
use crate::error::ComponentError;
use crate::host::Host;
use crate::index::ComponentIndex;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;

/// Expands `range` along the dimension following the concrete prefix
/// `partial`, producing one index per element with the new dimension
/// appended, in ascending order.
///
/// Discrete ranges are fully enumerated. A non-negative `stop` is
/// inclusive; open or negative endpoints are resolved against the
/// dimension's length the way a half-open range over `[0, length)`
/// would be, and clamped to it. Continuous ranges are not enumerable:
/// the range itself is appended as the single result, and must not
/// carry a step.
pub fn expand_range<H: Host>(
    domain: &IndexDomain<H>,
    range: &Range,
    partial: &ComponentIndex,
) -> Result<Vec<ComponentIndex>, ComponentError> {
    if range.step().is_some_and(|s| s.is_negative()) {
        return Err(ComponentError::NegativeStep {
            range: range.clone(),
        });
    }

    if domain.is_continuous() {
        if range.step().is_some() {
            return Err(ComponentError::SliceStepUnsupported {
                range: range.clone(),
                kind: domain.kind(),
            });
        }
        return Ok(vec![partial.pushed(range.clone())]);
    }

    let dim = partial.len();
    if domain.is_sparse(dim) {
        if !range.is_full() {
            return Err(ComponentError::SparseSlice {
                range: range.clone(),
                dim,
            });
        }
        return Ok(domain
            .members(partial)?
            .into_iter()
            .map(|member| partial.pushed(member))
            .collect());
    }

    let int = |value: Option<Scalar>| -> Result<Option<i64>, ComponentError> {
        match value {
            None => Ok(None),
            Some(Scalar::Int(v)) => Ok(Some(v)),
            Some(real @ Scalar::Real(_)) => Err(ComponentError::InvalidEntry {
                entry: IndexEntry::Scalar(real),
                kind: domain.kind(),
            }),
        }
    };
    let start = int(range.start())?;
    let stop = int(range.stop())?;
    let step = match int(range.step())? {
        None => 1,
        Some(0) => {
            return Err(ComponentError::ZeroStep {
                range: range.clone(),
            });
        }
        Some(step) => step,
    };

    let length = domain.length(partial)? as i64;
    // Host addressing includes a non-negative stop.
    let stop = stop.map(|stop| if stop >= 0 { stop + 1 } else { stop });
    let (start, stop) = resolve(start, stop, length);
    tracing::trace!(
        "expanding {} at {} to {}..{} by {}",
        range,
        partial,
        start,
        stop,
        step
    );

    Ok((start..stop)
        .step_by(step as usize)
        .map(|i| partial.pushed(i))
        .collect())
}

/// Resolves half-open `start..stop` endpoints against `length`:
/// missing endpoints take the dimension's extent, negative ones count
/// back from its end, and both are clamped to `[0, length]`.
fn resolve(start: Option<i64>, stop: Option<i64>, length: i64) -> (i64, i64) {
    let clamp = |value: i64| {
        let value = if value < 0 { value + length } else { value };
        value.clamp(0, length)
    };
    (
        start.map_or(0, clamp),
        stop.map_or(length, clamp),
    )
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::domain::ComponentKind;
    use crate::index;
    use crate::test_utils::MockHost;

    fn vertices(length: usize) -> IndexDomain<MockHost> {
        let host = MockHost::new().with_lengths("pPlane1", ComponentKind::MeshVertex, &[length]);
        IndexDomain::new(Rc::new(host), "pPlane1", ComponentKind::MeshVertex)
    }

    fn expanded(domain: &IndexDomain<MockHost>, range: Range) -> Vec<i64> {
        expand_range(domain, &range, &ComponentIndex::default())
            .unwrap()
            .into_iter()
            .map(|index| index.to_ints().unwrap()[0])
            .collect()
    }

    #[test]
    fn test_inclusive_stop() {
        let domain = vertices(10);
        assert_eq!(expanded(&domain, Range::closed(2, 5).step_by(1)), vec![2, 3, 4, 5]);
        assert_eq!(expanded(&domain, Range::closed(2, 5)), vec![2, 3, 4, 5]);
        assert_eq!(expanded(&domain, (2..).into()), vec![2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(expanded(&domain, (..=1).into()), vec![0, 1]);
        assert_eq!(expanded(&domain, Range::full()), (0..10).collect::<Vec<_>>());
        assert_eq!(expanded(&domain, Range::closed(0, 9).step_by(3)), vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_negative_endpoints_and_clamping() {
        let domain = vertices(10);
        assert_eq!(expanded(&domain, (-3..).into()), vec![7, 8, 9]);
        // A negative stop stays exclusive.
        assert_eq!(expanded(&domain, Range::closed(0, -8)), vec![0, 1]);
        assert_eq!(expanded(&domain, Range::closed(5, 100)), vec![5, 6, 7, 8, 9]);
        assert_eq!(expanded(&domain, Range::closed(-100, 1)), vec![0, 1]);
        assert!(expanded(&domain, Range::closed(6, 2)).is_empty());
    }

    #[test]
    fn test_step_errors() {
        let domain = vertices(10);
        let root = ComponentIndex::default();
        assert!(matches!(
            expand_range(&domain, &Range::closed(0, 5).step_by(-1), &root),
            Err(ComponentError::NegativeStep { .. })
        ));
        assert!(matches!(
            expand_range(&domain, &Range::closed(0, 5).step_by(0), &root),
            Err(ComponentError::ZeroStep { .. })
        ));
        assert!(matches!(
            expand_range(&domain, &Range(Some(0.5.into()), None, None), &root),
            Err(ComponentError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn test_continuous_ranges_are_kept() {
        let host = MockHost::new().with_range("curve1", ComponentKind::CurveParameter, (0.0, 4.0));
        let domain = IndexDomain::new(Rc::new(host), "curve1", ComponentKind::CurveParameter);
        let root = ComponentIndex::default();
        let range = Range(Some(0.0.into()), Some(1.0.into()), None);

        assert_eq!(
            expand_range(&domain, &range, &root).unwrap(),
            vec![index![range.clone()]]
        );
        assert!(matches!(
            expand_range(&domain, &range.clone().step_by(2.0), &root),
            Err(ComponentError::SliceStepUnsupported { .. })
        ));
    }

    #[test]
    fn test_sparse_dimension() {
        let host = MockHost::new()
            .with_lengths("pCube1", ComponentKind::MeshVertexFace, &[8])
            .with_members("pCube1", 2, &[3, 6, 187]);
        let domain = IndexDomain::new(Rc::new(host), "pCube1", ComponentKind::MeshVertexFace);

        assert_eq!(
            expand_range(&domain, &Range::full(), &index![2]).unwrap(),
            vec![index![2, 3], index![2, 6], index![2, 187]]
        );
        assert!(matches!(
            expand_range(&domain, &Range::closed(0, 1), &index![2]),
            Err(ComponentError::SparseSlice { dim: 1, .. })
        ));
        assert_eq!(
            expand_range(&domain, &Range::closed(0, 1), &index![]).unwrap(),
            vec![index![0], index![1]]
        );
    }
}
