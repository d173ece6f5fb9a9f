// src/layered.rs - Masks of rank 3 and above as sparse stacks of lower-rank masks

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rayon::prelude::*;

use crate::bounds::{Axis, LayeredBounds, MaskBounds};
use crate::components::ComponentArena;
use crate::errors::{axis_name, MaskError, Result};
use crate::mask2d::Mask2D;
use crate::mask_trait::{dimension_mismatch, BooleanMask};

/// Slices of a lifted mask along its outer axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Layers<M> {
    /// Slices over `origin .. origin + size`; a missing index is an empty slice
    Finite {
        origin: i32,
        size: i32,
        slices: BTreeMap<i32, M>,
    },
    /// One slice shared by every index of the axis
    Infinite(M),
}

/// A mask of rank `M::RANK + 1`: an outer axis over masks of type `M`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredMask<M: BooleanMask> {
    inner: M::Bounds,
    layers: Layers<M>,
}

/// Z stack of 2D masks
pub type Mask3D = LayeredMask<Mask2D>;
/// T series of 3D masks
pub type Mask4D = LayeredMask<Mask3D>;
/// C channels of 4D masks
pub type Mask5D = LayeredMask<Mask4D>;

impl<M: BooleanMask> Default for LayeredMask<M> {
    fn default() -> Self {
        Self::finite(0, 0, M::Bounds::default(), BTreeMap::new())
    }
}

impl<M: BooleanMask> LayeredMask<M> {
    fn finite(origin: i32, size: i32, inner: M::Bounds, slices: BTreeMap<i32, M>) -> Self {
        Self {
            inner,
            layers: Layers::Finite { origin, size, slices },
        }
    }

    /// Stack slices by outer index. The extent is the tight index range and
    /// empty slices are skipped; a repeated index keeps the last slice.
    pub fn from_layers<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = (i32, M)>,
    {
        let slices: BTreeMap<i32, M> = layers.into_iter().filter(|(_, m)| !m.is_empty()).collect();
        let (origin, size) = finite_span(Axis::spanning(slices.keys().copied()));
        let inner = union_of_bounds(slices.values());
        Self::finite(origin, size, inner, slices)
    }

    /// Stack slices over an explicit extent. Slices outside it are dropped.
    pub fn with_extent<I>(origin: i32, size: i32, layers: I) -> Self
    where
        I: IntoIterator<Item = (i32, M)>,
    {
        let extent = Axis::Finite { origin, size };
        let mut dropped = 0usize;
        let slices: BTreeMap<i32, M> = layers
            .into_iter()
            .filter(|(index, m)| {
                let inside = extent.contains(*index);
                if !inside {
                    dropped += 1;
                }
                inside && !m.is_empty()
            })
            .collect();

        if dropped > 0 {
            debug!("Dropped {} slice(s) outside [{}, {})", dropped, origin, origin + size);
        }

        let inner = union_of_bounds(slices.values());
        Self::finite(origin, size.max(0), inner, slices)
    }

    /// Same slice at every index of the outer axis
    pub fn uniform(slice: M) -> Self {
        Self {
            inner: slice.mask_bounds(),
            layers: Layers::Infinite(slice),
        }
    }

    pub fn layers(&self) -> &Layers<M> {
        &self.layers
    }

    pub fn bounds(&self) -> LayeredBounds<M::Bounds> {
        LayeredBounds::new(self.outer(), self.inner)
    }

    /// Extent of the outer axis
    pub fn outer(&self) -> Axis {
        match &self.layers {
            Layers::Finite { origin, size, .. } => Axis::Finite {
                origin: *origin,
                size: *size,
            },
            Layers::Infinite(_) => Axis::Infinite,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self.layers, Layers::Infinite(_))
    }

    /// Slice at `index`; a uniform mask returns its shared slice everywhere
    pub fn layer(&self, index: i32) -> Option<&M> {
        match &self.layers {
            Layers::Finite { slices, .. } => slices.get(&index),
            Layers::Infinite(slice) => Some(slice),
        }
    }

    /// Store a slice at `index`, growing the extent to include it.
    ///
    /// On a uniform mask this replaces the shared slice.
    pub fn set_layer(&mut self, index: i32, slice: M) {
        match &mut self.layers {
            Layers::Finite { origin, size, slices } => {
                let (o, s) = finite_span(
                    Axis::Finite {
                        origin: *origin,
                        size: *size,
                    }
                    .union(&Axis::Finite { origin: index, size: 1 }),
                );
                *origin = o;
                *size = s;
                self.inner = self.inner.union(&slice.mask_bounds());
                slices.insert(index, slice);
            }
            Layers::Infinite(shared) => {
                self.inner = slice.mask_bounds();
                *shared = slice;
            }
        }
    }

    /// Take the slice at `index` out; the extent is kept. Uniform masks have
    /// no removable slice.
    pub fn remove_layer(&mut self, index: i32) -> Option<M> {
        match &mut self.layers {
            Layers::Finite { slices, .. } => slices.remove(&index),
            Layers::Infinite(_) => None,
        }
    }

    /// Populated indexes in ascending order (none for a uniform mask)
    pub fn layer_indices(&self) -> Vec<i32> {
        match &self.layers {
            Layers::Finite { slices, .. } => slices.keys().copied().collect(),
            Layers::Infinite(_) => Vec::new(),
        }
    }

    pub(crate) fn from_parts(inner: M::Bounds, layers: Layers<M>) -> Self {
        Self { inner, layers }
    }

    fn mismatch() -> MaskError {
        dimension_mismatch(<Self as BooleanMask>::RANK)
    }
}

/// Origin and size of a finite axis; finite inputs never produce an infinite extent
fn finite_span(axis: Axis) -> (i32, i32) {
    match axis {
        Axis::Finite { origin, size } => (origin, size),
        Axis::Infinite => (0, 0),
    }
}

fn union_of_bounds<'a, M: BooleanMask + 'a>(slices: impl Iterator<Item = &'a M>) -> M::Bounds {
    slices.fold(M::Bounds::default(), |acc, m| acc.union(&m.mask_bounds()))
}

/// Evaluate `op` for every index in parallel, keeping the slices it returns
fn combine_slices<M, F>(indexes: Vec<i32>, op: F) -> Result<BTreeMap<i32, M>>
where
    M: BooleanMask,
    F: Fn(i32) -> Result<Option<M>> + Send + Sync,
{
    let combined: Vec<Option<(i32, M)>> = indexes
        .into_par_iter()
        .map(|index| -> Result<Option<(i32, M)>> { Ok(op(index)?.map(|slice| (index, slice))) })
        .collect::<Result<_>>()?;

    Ok(combined.into_iter().flatten().collect())
}

fn all_indexes<M>(a: &BTreeMap<i32, M>, b: &BTreeMap<i32, M>) -> Vec<i32> {
    let keys: BTreeSet<i32> = a.keys().chain(b.keys()).copied().collect();
    keys.into_iter().collect()
}

impl<M: BooleanMask> BooleanMask for LayeredMask<M> {
    type Bounds = LayeredBounds<M::Bounds>;
    const RANK: usize = M::RANK + 1;

    fn empty() -> Self {
        Self::default()
    }

    fn mask_bounds(&self) -> Self::Bounds {
        self.bounds()
    }

    fn is_empty(&self) -> bool {
        self.bounds().is_empty()
    }

    fn point_count(&self) -> usize {
        match &self.layers {
            Layers::Finite { slices, .. } => slices.values().map(M::point_count).sum(),
            Layers::Infinite(slice) => slice.point_count(),
        }
    }

    fn contains_coords(&self, coords: &[i32]) -> bool {
        match coords.split_last() {
            Some((&index, rest)) if coords.len() == Self::RANK => {
                self.layer(index).is_some_and(|slice| slice.contains_coords(rest))
            }
            _ => false,
        }
    }

    fn contains_mask(&self, other: &Self) -> bool {
        match (&self.layers, &other.layers) {
            (_, Layers::Finite { slices, .. }) => slices.iter().all(|(index, theirs)| {
                theirs.point_count() == 0 || self.layer(*index).is_some_and(|ours| ours.contains_mask(theirs))
            }),
            (Layers::Infinite(ours), Layers::Infinite(theirs)) => ours.contains_mask(theirs),
            (Layers::Finite { .. }, Layers::Infinite(theirs)) => theirs.point_count() == 0,
        }
    }

    fn intersects(&self, other: &Self) -> bool {
        match (&self.layers, &other.layers) {
            (Layers::Infinite(ours), Layers::Infinite(theirs)) => ours.intersects(theirs),
            (Layers::Finite { slices, .. }, _) => slices
                .iter()
                .any(|(index, ours)| other.layer(*index).is_some_and(|theirs| ours.intersects(theirs))),
            (Layers::Infinite(ours), Layers::Finite { slices, .. }) => {
                slices.values().any(|theirs| ours.intersects(theirs))
            }
        }
    }

    fn flat_points(&self) -> Result<Vec<i32>> {
        let Layers::Finite { slices, .. } = &self.layers else {
            return Err(MaskError::InfiniteExtent {
                axis: axis_name(Self::RANK - 1),
            });
        };

        let mut flat = Vec::new();
        for (&index, slice) in slices {
            for point in slice.flat_points()?.chunks_exact(M::RANK) {
                flat.extend_from_slice(point);
                flat.push(index);
            }
        }
        Ok(flat)
    }

    fn from_flat_points(coords: &[i32]) -> Result<Self> {
        if coords.len() % Self::RANK != 0 {
            return Err(MaskError::PointArity {
                rank: Self::RANK,
                len: coords.len(),
            });
        }

        let mut grouped: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for point in coords.chunks_exact(Self::RANK) {
            if let Some((&index, rest)) = point.split_last() {
                grouped.entry(index).or_default().extend_from_slice(rest);
            }
        }

        let layers = grouped
            .into_iter()
            .map(|(index, flat)| -> Result<(i32, M)> { Ok((index, M::from_flat_points(&flat)?)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_layers(layers))
    }

    fn try_union(a: &Self, b: &Self) -> Result<Self> {
        if a.is_empty() {
            return Ok(b.clone());
        }
        if b.is_empty() {
            return Ok(a.clone());
        }

        let inner = a.inner.union(&b.inner);
        match (&a.layers, &b.layers) {
            (Layers::Infinite(sa), Layers::Infinite(sb)) => {
                Ok(Self::from_parts(inner, Layers::Infinite(M::try_union(sa, sb)?)))
            }
            (Layers::Finite { slices: la, .. }, Layers::Finite { slices: lb, .. }) => {
                let (origin, size) = finite_span(a.outer().union(&b.outer()));
                let slices = combine_slices(all_indexes(la, lb), |index| match (la.get(&index), lb.get(&index)) {
                    (Some(x), Some(y)) => M::try_union(x, y).map(Some),
                    (Some(x), None) | (None, Some(x)) => Ok(Some(x.clone())),
                    (None, None) => Ok(None),
                })?;
                Ok(Self::finite(origin, size, inner, slices))
            }
            _ => Err(Self::mismatch()),
        }
    }

    fn try_intersection(a: &Self, b: &Self) -> Result<Self> {
        if a.is_empty() || b.is_empty() {
            return Ok(Self::empty());
        }

        let inner = a.inner.intersection(&b.inner);
        let result = match (&a.layers, &b.layers) {
            (Layers::Infinite(sa), Layers::Infinite(sb)) => {
                Self::from_parts(inner, Layers::Infinite(M::try_intersection(sa, sb)?))
            }
            (Layers::Finite { slices: la, .. }, Layers::Finite { slices: lb, .. }) => {
                let (origin, size) = finite_span(a.outer().intersection(&b.outer()));
                let shared: Vec<i32> = la.keys().filter(|index| lb.contains_key(index)).copied().collect();
                let slices = combine_slices(shared, |index| match (la.get(&index), lb.get(&index)) {
                    (Some(x), Some(y)) => {
                        let slice = M::try_intersection(x, y)?;
                        Ok((!slice.is_empty()).then_some(slice))
                    }
                    _ => Ok(None),
                })?;
                Self::finite(origin, size, inner, slices)
            }
            _ => return Err(Self::mismatch()),
        };

        if result.point_count() == 0 {
            return Ok(Self::empty());
        }
        Ok(result)
    }

    fn try_xor(a: &Self, b: &Self) -> Result<Self> {
        if a.is_empty() {
            return Ok(b.clone());
        }
        if b.is_empty() {
            return Ok(a.clone());
        }

        let inner = a.inner.union(&b.inner);
        let mut result = match (&a.layers, &b.layers) {
            (Layers::Infinite(sa), Layers::Infinite(sb)) => {
                Self::from_parts(inner, Layers::Infinite(M::try_xor(sa, sb)?))
            }
            (Layers::Finite { slices: la, .. }, Layers::Finite { slices: lb, .. }) => {
                let (origin, size) = finite_span(a.outer().union(&b.outer()));
                let slices = combine_slices(all_indexes(la, lb), |index| match (la.get(&index), lb.get(&index)) {
                    (Some(x), Some(y)) => M::try_xor(x, y).map(Some),
                    (Some(x), None) | (None, Some(x)) => Ok(Some(x.clone())),
                    (None, None) => Ok(None),
                })?;
                Self::finite(origin, size, inner, slices)
            }
            _ => return Err(Self::mismatch()),
        };

        result.optimize_bounds();
        Ok(result)
    }

    fn try_subtract(a: &Self, b: &Self) -> Result<Self> {
        if a.is_empty() {
            return Ok(Self::empty());
        }
        if b.is_empty() {
            return Ok(a.clone());
        }

        let mut result = match (&a.layers, &b.layers) {
            (Layers::Infinite(sa), Layers::Infinite(sb)) => {
                Self::from_parts(a.inner, Layers::Infinite(M::try_subtract(sa, sb)?))
            }
            (Layers::Finite { origin, size, slices: la }, Layers::Finite { slices: lb, .. }) => {
                let slices = combine_slices(la.keys().copied().collect(), |index| match (la.get(&index), lb.get(&index)) {
                    (Some(x), Some(y)) => {
                        let slice = M::try_subtract(x, y)?;
                        Ok((!slice.is_empty()).then_some(slice))
                    }
                    (Some(x), None) => Ok(Some(x.clone())),
                    _ => Ok(None),
                })?;
                Self::finite(*origin, *size, a.inner, slices)
            }
            _ => return Err(Self::mismatch()),
        };

        result.optimize_bounds();
        Ok(result)
    }

    /// Tighten every slice, drop the empty ones, then recompute the outer
    /// extent and the inner bounds from what is left.
    fn optimize_bounds(&mut self) -> bool {
        let before = self.bounds();

        match &mut self.layers {
            Layers::Finite { origin, size, slices } => {
                for slice in slices.values_mut() {
                    slice.optimize_bounds();
                }
                slices.retain(|_, slice| !slice.is_empty());

                if slices.is_empty() {
                    *size = 0;
                } else {
                    let (o, s) = finite_span(Axis::spanning(slices.keys().copied()));
                    *origin = o;
                    *size = s;
                }
                self.inner = union_of_bounds(slices.values());
            }
            Layers::Infinite(slice) => {
                slice.optimize_bounds();
                self.inner = slice.mask_bounds();
            }
        }

        self.bounds() != before
    }

    /// Move every slice to the new inner bounds and clip the outer axis.
    /// The moved slices are built aside, so on error `self` is untouched.
    fn try_move_bounds(&mut self, bounds: Self::Bounds) -> Result<()> {
        let layers = match (&self.layers, bounds.outer) {
            (Layers::Finite { slices, .. }, Axis::Finite { origin, size }) => {
                let moved = slices
                    .iter()
                    .filter(|(index, _)| bounds.outer.contains(**index))
                    .map(|(&index, slice)| -> Result<(i32, M)> {
                        let mut slice = slice.clone();
                        slice.try_move_bounds(bounds.inner)?;
                        Ok((index, slice))
                    })
                    .collect::<Result<BTreeMap<i32, M>>>()?;
                Layers::Finite {
                    origin,
                    size: size.max(0),
                    slices: moved,
                }
            }
            (Layers::Infinite(slice), Axis::Infinite) => {
                let mut slice = slice.clone();
                slice.try_move_bounds(bounds.inner)?;
                Layers::Infinite(slice)
            }
            _ => return Err(Self::mismatch()),
        };

        self.layers = layers;
        self.inner = bounds.inner;
        Ok(())
    }

    /// Approximate boundary: the first and last populated slices are kept
    /// whole, every slice in between is reduced to its own contour.
    fn contour(&self) -> Self {
        match &self.layers {
            Layers::Finite { origin, size, slices } => {
                let first = slices.keys().next().copied();
                let last = slices.keys().next_back().copied();
                let contoured = slices
                    .iter()
                    .map(|(&index, slice)| {
                        let end = Some(index) == first || Some(index) == last;
                        (index, if end { slice.clone() } else { slice.contour() })
                    })
                    .collect();
                Self::finite(*origin, *size, self.inner, contoured)
            }
            Layers::Infinite(slice) => Self::uniform(slice.contour()),
        }
    }

    /// Dilate every slice in its own plane and spread it to both
    /// neighbouring outer indexes. A uniform mask only grows in-plane.
    fn try_dilate(&self) -> Result<Self> {
        let slices = match &self.layers {
            Layers::Finite { slices, .. } => slices,
            Layers::Infinite(slice) => return Ok(Self::uniform(slice.try_dilate()?)),
        };

        let grown = slices
            .par_iter()
            .map(|(&index, slice)| -> Result<(i32, M)> { Ok((index, slice.try_dilate()?)) })
            .collect::<Result<Vec<_>>>()?;

        let mut spread: BTreeMap<i32, M> = BTreeMap::new();
        for (index, slice) in grown {
            for target in index - 1..=index + 1 {
                let merged = match spread.remove(&target) {
                    Some(existing) => M::try_union(&existing, &slice)?,
                    None => slice.clone(),
                };
                spread.insert(target, merged);
            }
        }

        Ok(Self::from_layers(spread))
    }

    /// Per-slice components joined across consecutive indexes when the
    /// dilation of one touches the other.
    fn try_components(&self) -> Result<Vec<Self>> {
        let slices = match &self.layers {
            Layers::Finite { slices, .. } => slices,
            Layers::Infinite(slice) => {
                return Ok(slice.try_components()?.into_iter().map(Self::uniform).collect());
            }
        };

        // (index, dilated part, part) in ascending index order
        let nodes: Vec<(i32, M, M)> = slices
            .par_iter()
            .map(|(&index, slice)| -> Result<Vec<(i32, M, M)>> {
                slice
                    .try_components()?
                    .into_iter()
                    .map(|part| -> Result<(i32, M, M)> { Ok((index, part.try_dilate()?, part)) })
                    .collect()
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let mut arena = ComponentArena::new();
        for label in 0..nodes.len() {
            arena.make();
            arena.push(label, label);
        }

        for (a, (index, grown, _)) in nodes.iter().enumerate() {
            for (offset, (other_index, _, part)) in nodes[a + 1..].iter().enumerate() {
                if *other_index > index + 1 {
                    break;
                }
                if *other_index == index + 1 && grown.intersects(part) {
                    arena.union(a, a + 1 + offset);
                }
            }
        }

        let mut groups = arena.into_groups();
        for group in groups.iter_mut() {
            group.sort_unstable();
        }
        groups.sort_by_key(|group| group.first().copied());

        let mut components = Vec::with_capacity(groups.len());
        for group in groups {
            let mut stacked: BTreeMap<i32, M> = BTreeMap::new();
            for label in group {
                let (index, _, part) = &nodes[label];
                let merged = match stacked.remove(index) {
                    Some(existing) => M::try_union(&existing, part)?,
                    None => part.clone(),
                };
                stacked.insert(*index, merged);
            }
            components.push(Self::from_layers(stacked));
        }

        debug!(
            "Joined {} slice component(s) into {} rank-{} component(s)",
            nodes.len(),
            components.len(),
            Self::RANK
        );
        Ok(components)
    }
}

/// Folds over lists and in-place forms of the slice-wise algebra
impl<M: BooleanMask> LayeredMask<M> {
    fn fold_all(masks: &[Self], op: fn(&Self, &Self) -> Result<Self>) -> Result<Self> {
        let Some((first, rest)) = masks.split_first() else {
            return Ok(Self::empty());
        };
        rest.iter().try_fold(first.clone(), |acc, mask| op(&acc, mask))
    }

    /// Union of every mask, folded left to right. An empty list gives an empty mask.
    pub fn union_all(masks: &[Self]) -> Result<Self> {
        Self::fold_all(masks, Self::try_union)
    }

    /// Intersection of every mask, folded left to right
    pub fn intersection_all(masks: &[Self]) -> Result<Self> {
        Self::fold_all(masks, Self::try_intersection)
    }

    /// Symmetric difference of every mask, folded left to right
    pub fn xor_all(masks: &[Self]) -> Result<Self> {
        Self::fold_all(masks, Self::try_xor)
    }

    /// Combine the slices of `other` into ours index by index. Indexes
    /// `other` lacks are not touched. Every slice is combined before any is
    /// stored, so an error leaves `self` as it was.
    fn apply_slicewise<F>(&mut self, other: &Self, grow: bool, op: F) -> Result<()>
    where
        F: Fn(Option<&M>, &M) -> Result<Option<M>> + Send + Sync,
    {
        match (&mut self.layers, &other.layers) {
            (Layers::Infinite(ours), Layers::Infinite(theirs)) => {
                if let Some(slice) = op(Some(&*ours), theirs)? {
                    *ours = slice;
                }
            }
            (Layers::Finite { origin, size, slices }, Layers::Finite { slices: theirs, .. }) => {
                let current = &*slices;
                let updates = theirs
                    .par_iter()
                    .map(|(&index, slice)| -> Result<(i32, Option<M>)> { Ok((index, op(current.get(&index), slice)?)) })
                    .collect::<Result<Vec<_>>>()?;

                for (index, update) in updates {
                    match update {
                        Some(slice) if !slice.is_empty() => {
                            slices.insert(index, slice);
                        }
                        _ => {
                            slices.remove(&index);
                        }
                    }
                }

                if grow {
                    let (o, s) = finite_span(
                        Axis::Finite {
                            origin: *origin,
                            size: *size,
                        }
                        .union(&other.outer()),
                    );
                    *origin = o;
                    *size = s;
                }
            }
            _ => return Err(Self::mismatch()),
        }

        if grow {
            self.inner = self.inner.union(&other.inner);
        }
        Ok(())
    }

    /// In-place union; slices of `self` that `other` does not cover are kept as they are
    pub fn apply_union_into(&mut self, other: &Self) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }

        self.apply_slicewise(other, true, |ours, theirs| match ours {
            Some(ours) => M::try_union(ours, theirs).map(Some),
            None => Ok(Some(theirs.clone())),
        })
    }

    /// In-place intersection. Indexes missing from `other` all go, so the
    /// result is computed whole and swapped in.
    pub fn apply_intersection_into(&mut self, other: &Self) -> Result<()> {
        *self = Self::try_intersection(self, other)?;
        Ok(())
    }

    /// In-place symmetric difference, with tightened bounds
    pub fn apply_xor_into(&mut self, other: &Self) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }

        self.apply_slicewise(other, true, |ours, theirs| match ours {
            Some(ours) => M::try_xor(ours, theirs).map(Some),
            None => Ok(Some(theirs.clone())),
        })?;
        self.optimize_bounds();
        Ok(())
    }

    /// In-place subtraction, with tightened bounds
    pub fn apply_subtraction_into(&mut self, other: &Self) -> Result<()> {
        if self.is_empty() {
            *self = Self::empty();
            return Ok(());
        }
        if other.is_empty() {
            return Ok(());
        }

        self.apply_slicewise(other, false, |ours, theirs| match ours {
            Some(ours) => M::try_subtract(ours, theirs).map(Some),
            None => Ok(None),
        })?;
        self.optimize_bounds();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds2D;

    fn square(x: i32, y: i32, size: i32) -> Mask2D {
        Mask2D::filled(Bounds2D::new(x, y, size, size))
    }

    fn cube(origin: i32, size: i32) -> Mask3D {
        Mask3D::from_layers((origin..origin + size).map(|z| (z, square(origin, origin, size))))
    }

    #[test]
    fn test_from_layers_extent_and_counts() {
        let stack = Mask3D::from_layers([(2, square(0, 0, 2)), (5, square(1, 1, 3)), (7, Mask2D::empty())]);
        assert_eq!(stack.outer(), Axis::Finite { origin: 2, size: 4 });
        assert_eq!(stack.bounds().inner, Bounds2D::new(0, 0, 4, 4));
        assert_eq!(stack.layer_indices(), vec![2, 5]);
        assert_eq!(stack.point_count(), 4 + 9);
        assert!(stack.layer(3).is_none());
        assert!(stack.contains_coords(&[2, 2, 5]));
        assert!(!stack.contains_coords(&[2, 2, 2]));
        assert!(!stack.contains_coords(&[2, 2]));
    }

    #[test]
    fn test_with_extent_drops_outside() {
        let stack = Mask3D::with_extent(0, 3, [(1, square(0, 0, 1)), (4, square(0, 0, 1))]);
        assert_eq!(stack.outer(), Axis::Finite { origin: 0, size: 3 });
        assert_eq!(stack.layer_indices(), vec![1]);
    }

    #[test]
    fn test_set_and_remove_layer() {
        let mut stack = Mask3D::from_layers([(0, square(0, 0, 2))]);
        stack.set_layer(3, square(5, 5, 1));
        assert_eq!(stack.outer(), Axis::Finite { origin: 0, size: 4 });
        assert_eq!(stack.bounds().inner, Bounds2D::new(0, 0, 6, 6));

        assert_eq!(stack.remove_layer(3), Some(square(5, 5, 1)));
        assert_eq!(stack.remove_layer(3), None);
        assert_eq!(stack.point_count(), 4);
    }

    #[test]
    fn test_uniform_mask() {
        let mut uniform = Mask3D::uniform(square(0, 0, 3));
        assert!(uniform.is_infinite());
        assert_eq!(uniform.point_count(), 9);
        assert!(uniform.contains_coords(&[1, 1, -1000]));
        assert!(uniform.layer_indices().is_empty());
        assert!(uniform.remove_layer(0).is_none());
        assert!(matches!(uniform.flat_points(), Err(MaskError::InfiniteExtent { axis: "Z" })));

        uniform.set_layer(42, square(0, 0, 1));
        assert_eq!(uniform.point_count(), 1);
    }

    #[test]
    fn test_slice_wise_algebra() {
        let a = Mask3D::from_layers([(0, square(0, 0, 2)), (1, square(0, 0, 2))]);
        let b = Mask3D::from_layers([(1, square(1, 1, 2)), (2, square(0, 0, 2))]);

        let u = Mask3D::try_union(&a, &b).unwrap();
        assert_eq!(u.layer_indices(), vec![0, 1, 2]);
        assert_eq!(u.point_count(), 4 + 7 + 4);

        let i = Mask3D::try_intersection(&a, &b).unwrap();
        assert_eq!(i.layer_indices(), vec![1]);
        assert_eq!(i.point_count(), 1);

        let x = Mask3D::try_xor(&a, &b).unwrap();
        assert_eq!(x.point_count(), 4 + 6 + 4);

        let d = Mask3D::try_subtract(&a, &b).unwrap();
        assert_eq!(d.layer_indices(), vec![0, 1]);
        assert_eq!(d.point_count(), 4 + 3);

        assert!(Mask3D::try_subtract(&a, &a).unwrap().is_empty());
        assert!(Mask3D::try_xor(&a, &a).unwrap().is_empty());
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let a = Mask3D::from_layers([(0, square(0, 0, 2))]);
        let b = Mask3D::from_layers([(5, square(0, 0, 2))]);
        assert_eq!(Mask3D::try_intersection(&a, &b).unwrap(), Mask3D::empty());
    }

    #[test]
    fn test_finite_with_infinite_is_mismatch() {
        let finite = cube(0, 2);
        let uniform = Mask3D::uniform(square(0, 0, 2));

        for result in [
            Mask3D::try_union(&finite, &uniform),
            Mask3D::try_intersection(&finite, &uniform),
            Mask3D::try_xor(&uniform, &finite),
            Mask3D::try_subtract(&uniform, &finite),
        ] {
            assert!(matches!(result, Err(MaskError::DimensionMismatch { axis: "Z" })));
        }

        let mut moved = finite.clone();
        let target = LayeredBounds::new(Axis::Infinite, Bounds2D::new(0, 0, 2, 2));
        assert!(moved.try_move_bounds(target).is_err());
    }

    #[test]
    fn test_empty_operand_never_mismatches() {
        let uniform = Mask3D::uniform(square(0, 0, 2));
        assert_eq!(Mask3D::try_union(&Mask3D::empty(), &uniform).unwrap(), uniform);
        assert!(Mask3D::try_intersection(&uniform, &Mask3D::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_two_uniform_masks_combine_shared_slice() {
        let a = Mask3D::uniform(square(0, 0, 3));
        let b = Mask3D::uniform(square(1, 1, 3));
        let i = Mask3D::try_intersection(&a, &b).unwrap();
        assert!(i.is_infinite());
        assert_eq!(i.point_count(), 4);
        assert!(i.contains_coords(&[2, 2, 99]));
    }

    #[test]
    fn test_mismatch_in_nested_rank_names_inner_axis() {
        let finite_z = Mask4D::from_layers([(0, cube(0, 2))]);
        let infinite_z = Mask4D::from_layers([(0, Mask3D::uniform(square(0, 0, 2)))]);
        let err = Mask4D::try_union(&finite_z, &infinite_z).unwrap_err();
        assert!(matches!(err, MaskError::DimensionMismatch { axis: "Z" }));

        let infinite_t = Mask4D::uniform(cube(0, 2));
        let err = Mask4D::try_union(&finite_z, &infinite_t).unwrap_err();
        assert!(matches!(err, MaskError::DimensionMismatch { axis: "T" }));
    }

    #[test]
    fn test_flat_points_outer_index_last() {
        let flat = [0, 0, 1, 2, 3, 1, 5, 5, 0];
        let stack = Mask3D::from_flat_points(&flat).unwrap();
        assert_eq!(stack.layer_indices(), vec![0, 1]);
        assert_eq!(stack.flat_points().unwrap(), vec![5, 5, 0, 0, 0, 1, 2, 3, 1]);
        assert!(matches!(
            Mask3D::from_flat_points(&[1, 2, 3, 4]),
            Err(MaskError::PointArity { rank: 3, len: 4 })
        ));

        let five = Mask5D::from_flat_points(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(<Mask5D as BooleanMask>::RANK, 5);
        assert!(five.contains_coords(&[1, 2, 3, 4, 5]));
        assert_eq!(five.flat_points().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_contains_and_intersects() {
        let big = cube(0, 4);
        let small = Mask3D::from_layers([(1, square(1, 1, 2))]);
        assert!(big.contains_mask(&small));
        assert!(!small.contains_mask(&big));
        assert!(big.intersects(&small));
        assert!(!small.intersects(&Mask3D::from_layers([(3, square(1, 1, 2))])));
    }

    #[test]
    fn test_optimize_cascades() {
        let mut padded = Mask3D::with_extent(-5, 20, [(2, Mask2D::blank(Bounds2D::new(0, 0, 9, 9)))]);
        let mut slice = Mask2D::blank(Bounds2D::new(0, 0, 9, 9));
        slice.set(4, 4, true);
        padded.set_layer(3, slice);

        assert!(padded.optimize_bounds());
        assert_eq!(padded.layer_indices(), vec![3]);
        assert_eq!(padded.outer(), Axis::Finite { origin: 3, size: 1 });
        assert_eq!(padded.bounds().inner, Bounds2D::new(4, 4, 1, 1));
        assert!(!padded.optimize_bounds());
    }

    #[test]
    fn test_move_bounds_clips_layers() {
        let mut stack = cube(0, 4);
        stack
            .try_move_bounds(LayeredBounds::new(Axis::Finite { origin: 1, size: 2 }, Bounds2D::new(0, 0, 2, 2)))
            .unwrap();
        assert_eq!(stack.layer_indices(), vec![1, 2]);
        assert_eq!(stack.point_count(), 8);
    }

    #[test]
    fn test_contour_keeps_end_slices_whole() {
        let shell = cube(0, 5).contour();
        // Two full 5x5 caps and three 16-point rings
        assert_eq!(shell.point_count(), 2 * 25 + 3 * 16);
    }

    #[test]
    fn test_dilate_spreads_across_layers() {
        let voxel = Mask3D::from_layers([(0, square(0, 0, 1))]);
        let grown = voxel.try_dilate().unwrap();
        assert_eq!(grown.layer_indices(), vec![-1, 0, 1]);
        assert_eq!(grown.point_count(), 27);
    }

    #[test]
    fn test_components_join_across_layers() {
        // Diagonal staircase through z is one 26-connected component
        let stairs = Mask3D::from_layers([
            (0, Mask2D::from_points(&[(0, 0)])),
            (1, Mask2D::from_points(&[(1, 1)])),
            (2, Mask2D::from_points(&[(2, 2)])),
        ]);
        assert_eq!(stairs.try_components().unwrap().len(), 1);

        // Gap along z splits
        let split = Mask3D::from_layers([(0, square(0, 0, 2)), (2, square(0, 0, 2))]);
        let parts = split.try_components().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].layer_indices(), vec![0]);
        assert_eq!(parts[1].layer_indices(), vec![2]);

        // Two blobs in z = 0 joined through z = 1
        let bridge = Mask3D::from_layers([
            (0, Mask2D::union(&square(0, 0, 1), &square(4, 0, 1))),
            (1, Mask2D::filled(Bounds2D::new(0, 0, 5, 1))),
        ]);
        let parts = bridge.try_components().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].point_count(), 7);
    }

    #[test]
    fn test_failed_move_leaves_mask_unchanged() {
        let series = Mask4D::from_layers((0..4).map(|t| (t, cube(0, 2))));
        let mut moved = series.clone();
        let target = LayeredBounds::new(
            Axis::Finite { origin: 0, size: 2 },
            LayeredBounds::new(Axis::Infinite, Bounds2D::new(0, 0, 2, 2)),
        );

        let result = moved.try_move_bounds(target);
        assert!(matches!(result, Err(MaskError::DimensionMismatch { axis: "Z" })));
        assert_eq!(moved.layer_indices(), vec![0, 1, 2, 3]);
        assert_eq!(moved, series);
    }

    #[test]
    fn test_list_folds() {
        let parts = [
            cube(0, 2),
            Mask3D::from_layers([(1, square(1, 1, 2)), (3, square(0, 0, 1))]),
            cube(1, 3),
        ];

        let chained = |op: fn(&Mask3D, &Mask3D) -> Result<Mask3D>| {
            op(&op(&parts[0], &parts[1]).unwrap(), &parts[2]).unwrap()
        };
        assert_eq!(Mask3D::union_all(&parts).unwrap(), chained(Mask3D::try_union));
        assert_eq!(Mask3D::intersection_all(&parts).unwrap(), chained(Mask3D::try_intersection));
        assert_eq!(Mask3D::xor_all(&parts).unwrap(), chained(Mask3D::try_xor));

        assert_eq!(Mask3D::union_all(&[]).unwrap(), Mask3D::empty());
        assert_eq!(Mask3D::xor_all(&parts[..1]).unwrap(), parts[0]);

        let series = [
            Mask4D::from_layers([(0, cube(0, 2))]),
            Mask4D::from_layers([(0, cube(1, 2)), (1, cube(0, 1))]),
        ];
        let merged = Mask4D::union_all(&series).unwrap();
        assert_eq!(merged.layer_indices(), vec![0, 1]);
        // z = 0: 4, z = 1: 4 + 4 - 1, z = 2: 4, plus the lone voxel at t = 1
        assert_eq!(merged.point_count(), 16);
    }

    #[test]
    fn test_in_place_variants_match_allocating() {
        let a = Mask3D::from_layers([(0, square(0, 0, 2)), (1, square(0, 0, 2))]);
        let b = Mask3D::from_layers([(1, square(1, 1, 2)), (2, square(0, 0, 2))]);

        let mut u = a.clone();
        u.apply_union_into(&b).unwrap();
        assert_eq!(u, Mask3D::try_union(&a, &b).unwrap());

        let mut i = a.clone();
        i.apply_intersection_into(&b).unwrap();
        assert_eq!(i, Mask3D::try_intersection(&a, &b).unwrap());

        let mut x = a.clone();
        x.apply_xor_into(&b).unwrap();
        assert_eq!(x, Mask3D::try_xor(&a, &b).unwrap());

        let mut d = a.clone();
        d.apply_subtraction_into(&b).unwrap();
        assert_eq!(d, Mask3D::try_subtract(&a, &b).unwrap());

        let mut gone = a.clone();
        gone.apply_subtraction_into(&a).unwrap();
        assert!(gone.is_empty());

        let mut grown = Mask3D::empty();
        grown.apply_union_into(&a).unwrap();
        assert_eq!(grown, a);
    }

    #[test]
    fn test_failed_in_place_union_leaves_mask_unchanged() {
        let finite_z = Mask4D::from_layers([(0, cube(0, 2)), (1, cube(0, 2))]);
        let infinite_z = Mask4D::from_layers([(1, Mask3D::uniform(square(0, 0, 2)))]);

        let mut target = finite_z.clone();
        assert!(target.apply_union_into(&infinite_z).is_err());
        assert_eq!(target, finite_z);

        let mut uniform = Mask4D::uniform(cube(0, 2));
        assert!(matches!(
            uniform.apply_xor_into(&finite_z),
            Err(MaskError::DimensionMismatch { axis: "T" })
        ));
        assert_eq!(uniform, Mask4D::uniform(cube(0, 2)));
    }
}
