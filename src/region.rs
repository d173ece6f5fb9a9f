// src/region.rs - Slice accessor used to combine heterogeneous region sources

use crate::layered::Mask3D;
use crate::mask2d::Mask2D;

/// Position of a 2D slice inside a 5D stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SlicePosition {
    pub z: i32,
    pub t: i32,
    pub c: i32,
}

impl SlicePosition {
    pub fn new(z: i32, t: i32, c: i32) -> Self {
        Self { z, t, c }
    }
}

/// Anything that can hand out a 2D mask for a slice position.
///
/// `inclusive` asks for cells only partially covered by the region to count
/// as set; sources that are already discrete ignore it.
pub trait SliceMaskSource {
    fn slice_mask(&self, pos: SlicePosition, inclusive: bool) -> Mask2D;
}

/// A plain 2D mask covers every slice
impl SliceMaskSource for Mask2D {
    fn slice_mask(&self, _pos: SlicePosition, _inclusive: bool) -> Mask2D {
        self.clone()
    }
}

/// A 3D mask answers with its layer at `z`, or nothing
impl SliceMaskSource for Mask3D {
    fn slice_mask(&self, pos: SlicePosition, _inclusive: bool) -> Mask2D {
        self.layer(pos.z).cloned().unwrap_or_default()
    }
}

fn slices(sources: &[&dyn SliceMaskSource], pos: SlicePosition, inclusive: bool) -> Vec<Mask2D> {
    sources.iter().map(|source| source.slice_mask(pos, inclusive)).collect()
}

/// Union of every source's slice at `pos`
pub fn union_of_sources(sources: &[&dyn SliceMaskSource], pos: SlicePosition, inclusive: bool) -> Mask2D {
    Mask2D::union_all(&slices(sources, pos, inclusive))
}

/// Intersection of every source's slice at `pos`
pub fn intersection_of_sources(sources: &[&dyn SliceMaskSource], pos: SlicePosition, inclusive: bool) -> Mask2D {
    Mask2D::intersection_all(&slices(sources, pos, inclusive))
}

/// Symmetric difference of every source's slice at `pos`
pub fn xor_of_sources(sources: &[&dyn SliceMaskSource], pos: SlicePosition, inclusive: bool) -> Mask2D {
    Mask2D::xor_all(&slices(sources, pos, inclusive))
}

/// First source's slice minus the union of the others
pub fn subtraction_of_sources(sources: &[&dyn SliceMaskSource], pos: SlicePosition, inclusive: bool) -> Mask2D {
    let mut masks = slices(sources, pos, inclusive).into_iter();
    let Some(first) = masks.next() else {
        return Mask2D::empty();
    };
    let rest: Vec<Mask2D> = masks.collect();
    Mask2D::subtraction(&first, &Mask2D::union_all(&rest))
}
