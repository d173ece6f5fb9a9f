// src/mask_trait.rs - Capability shared by masks of every rank

use std::fmt::Debug;

use crate::bounds::{Bounds2D, MaskBounds};
use crate::errors::{MaskError, Result};
use crate::mask2d::Mask2D;

/// Operations every mask rank provides.
///
/// `Mask2D` implements it directly; `LayeredMask<M>` implements it once for
/// any `M: BooleanMask` by delegating slice-wise, which gives 3D, 4D and 5D.
/// Binary operations are fallible because lifted masks refuse to combine a
/// finite outer extent with an infinite one.
pub trait BooleanMask: Clone + Debug + PartialEq + Send + Sync + Sized {
    type Bounds: MaskBounds;

    /// Number of coordinates per point
    const RANK: usize;

    fn empty() -> Self;
    fn mask_bounds(&self) -> Self::Bounds;
    fn is_empty(&self) -> bool;
    fn point_count(&self) -> usize;

    /// Membership test for one point given as `RANK` coordinates
    fn contains_coords(&self, coords: &[i32]) -> bool;
    fn contains_mask(&self, other: &Self) -> bool;
    fn intersects(&self, other: &Self) -> bool;

    /// Set points as interleaved coordinates, outer index last
    fn flat_points(&self) -> Result<Vec<i32>>;
    fn from_flat_points(coords: &[i32]) -> Result<Self>;

    fn try_union(a: &Self, b: &Self) -> Result<Self>;
    fn try_intersection(a: &Self, b: &Self) -> Result<Self>;
    fn try_xor(a: &Self, b: &Self) -> Result<Self>;
    fn try_subtract(a: &Self, b: &Self) -> Result<Self>;

    /// Tighten the bounds; returns true if they changed
    fn optimize_bounds(&mut self) -> bool;
    fn try_move_bounds(&mut self, bounds: Self::Bounds) -> Result<()>;

    fn contour(&self) -> Self;
    fn try_dilate(&self) -> Result<Self>;
    fn try_components(&self) -> Result<Vec<Self>>;
}

impl BooleanMask for Mask2D {
    type Bounds = Bounds2D;
    const RANK: usize = 2;

    fn empty() -> Self {
        Mask2D::empty()
    }

    fn mask_bounds(&self) -> Bounds2D {
        self.bounds
    }

    fn is_empty(&self) -> bool {
        Mask2D::is_empty(self)
    }

    fn point_count(&self) -> usize {
        Mask2D::point_count(self)
    }

    fn contains_coords(&self, coords: &[i32]) -> bool {
        match *coords {
            [x, y] => self.contains(x, y),
            _ => false,
        }
    }

    fn contains_mask(&self, other: &Self) -> bool {
        Mask2D::contains_mask(self, other)
    }

    fn intersects(&self, other: &Self) -> bool {
        Mask2D::intersects(self, other)
    }

    fn flat_points(&self) -> Result<Vec<i32>> {
        Ok(self.points_flat())
    }

    fn from_flat_points(coords: &[i32]) -> Result<Self> {
        Mask2D::from_flat_points(coords)
    }

    fn try_union(a: &Self, b: &Self) -> Result<Self> {
        Ok(Mask2D::union(a, b))
    }

    fn try_intersection(a: &Self, b: &Self) -> Result<Self> {
        Ok(Mask2D::intersection(a, b))
    }

    fn try_xor(a: &Self, b: &Self) -> Result<Self> {
        Ok(Mask2D::xor(a, b))
    }

    fn try_subtract(a: &Self, b: &Self) -> Result<Self> {
        Ok(Mask2D::subtraction(a, b))
    }

    fn optimize_bounds(&mut self) -> bool {
        Mask2D::optimize_bounds(self)
    }

    fn try_move_bounds(&mut self, bounds: Bounds2D) -> Result<()> {
        self.move_bounds(bounds);
        Ok(())
    }

    fn contour(&self) -> Self {
        self.contour_mask()
    }

    fn try_dilate(&self) -> Result<Self> {
        Ok(self.dilate())
    }

    fn try_components(&self) -> Result<Vec<Self>> {
        Ok(self.components())
    }
}

/// Error for an N-D operation mixing finite and infinite extents on the outer axis of rank `rank`
pub(crate) fn dimension_mismatch(rank: usize) -> MaskError {
    MaskError::DimensionMismatch {
        axis: crate::errors::axis_name(rank - 1),
    }
}
