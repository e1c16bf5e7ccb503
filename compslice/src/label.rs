//! Label canonicalization for kinds that can address the same
//! geometry under more than one name.
//!
//! A surface isoparm may be addressed as `u`, `v` or `uv`. The host
//! treats `uv[*][*]` as a degenerate selection, so `uv` is folded into
//! the preferred `u` before any index math happens. The trailing index
//! data is carried over unchanged.

use crate::domain::ComponentKind;
use crate::error::ComponentError;
use crate::index::ComponentIndex;

/// The canonical form of `label` for `kind`.
pub fn canonical_label(kind: ComponentKind, label: &str) -> Result<&'static str, ComponentError> {
    let spec = kind.spec();
    let Some(known) = spec.labels.iter().find(|l| **l == label) else {
        return Err(ComponentError::InvalidLabel {
            label: label.to_string(),
            kind,
        });
    };
    Ok(spec
        .aliases
        .iter()
        .find(|(alias, _)| alias == known)
        .map_or(*known, |(_, canonical)| *canonical))
}

/// `index` with its label, if any, in canonical form.
pub fn canonicalize(
    kind: ComponentKind,
    index: ComponentIndex,
) -> Result<ComponentIndex, ComponentError> {
    match index.label() {
        Some(label) => {
            let canonical = canonical_label(kind, label)?;
            Ok(index.with_label(canonical))
        }
        None => Ok(index),
    }
}

/// Concatenates two indices after canonicalizing both labels, so that
/// equivalent labels never conflict.
pub fn merge(
    kind: ComponentKind,
    lhs: ComponentIndex,
    rhs: ComponentIndex,
) -> Result<ComponentIndex, ComponentError> {
    canonicalize(kind, lhs)?.concat(&canonicalize(kind, rhs)?)
}

/// Folds per-label groups of indices into groups keyed by canonical
/// label. Groups keep the order in which their canonical label first
/// appears; indices within a group keep their order. Each index is
/// relabeled with its group's label.
pub fn merge_groups<L, I>(
    kind: ComponentKind,
    groups: I,
) -> Result<Vec<(&'static str, Vec<ComponentIndex>)>, ComponentError>
where
    L: AsRef<str>,
    I: IntoIterator<Item = (L, Vec<ComponentIndex>)>,
{
    let mut merged: Vec<(&'static str, Vec<ComponentIndex>)> = Vec::new();
    for (label, indices) in groups {
        let canonical = canonical_label(kind, label.as_ref())?;
        let relabeled = indices.into_iter().map(|index| index.with_label(canonical));
        match merged.iter_mut().find(|(l, _)| *l == canonical) {
            Some((_, existing)) => existing.extend(relabeled),
            None => merged.push((canonical, relabeled.collect())),
        }
    }
    Ok(merged)
}
