// src/mask2d.rs - Boolean occupancy grid over an integer rectangle

use crate::bounds::Bounds2D;
use crate::errors::{MaskError, Result};

/// A 2D region: bounding rectangle plus a row-major boolean array.
///
/// `cells.len() == bounds.area()` holds for every value; constructors enforce it
/// and every operation that changes the bounds reallocates the array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mask2D {
    pub(crate) bounds: Bounds2D,
    pub(crate) cells: Vec<bool>,
}

impl Mask2D {
    /// Build a mask from explicit bounds and a row-major cell array
    pub fn new(bounds: Bounds2D, cells: Vec<bool>) -> Result<Self> {
        let expected = bounds.area();
        if cells.len() != expected {
            return Err(MaskError::SizeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { bounds, cells })
    }

    /// Mask with empty bounds and no cells
    pub fn empty() -> Self {
        Self::default()
    }

    /// Mask where every cell of `bounds` is set
    pub fn filled(bounds: Bounds2D) -> Self {
        Self {
            bounds,
            cells: vec![true; bounds.area()],
        }
    }

    /// Mask with all cells cleared
    pub(crate) fn blank(bounds: Bounds2D) -> Self {
        Self {
            bounds,
            cells: vec![false; bounds.area()],
        }
    }

    /// Build a mask from discrete points; bounds are the tight box around them
    pub fn from_points(points: &[(i32, i32)]) -> Self {
        let bounds = Bounds2D::from_points(points);
        let mut mask = Self::blank(bounds);
        for &(x, y) in points {
            let offset = bounds.offset(x, y);
            mask.cells[offset] = true;
        }
        mask
    }

    /// Build a mask from interleaved `x0, y0, x1, y1, ...` coordinates
    pub fn from_flat_points(coords: &[i32]) -> Result<Self> {
        if coords.len() % 2 != 0 {
            return Err(MaskError::PointArity {
                rank: 2,
                len: coords.len(),
            });
        }
        let points: Vec<(i32, i32)> = coords.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        Ok(Self::from_points(&points))
    }

    /// Build a mask from floating point coordinates, truncated toward zero
    pub fn from_float_points(points: &[(f64, f64)]) -> Self {
        let points: Vec<(i32, i32)> = points.iter().map(|&(x, y)| (x as i32, y as i32)).collect();
        Self::from_points(&points)
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2D {
        self.bounds
    }

    #[inline]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Split into the `(bounds, cells)` pair
    pub fn into_parts(self) -> (Bounds2D, Vec<bool>) {
        (self.bounds, self.cells)
    }

    /// True when the bounds have no area
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Raw cell lookup; false outside bounds
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.bounds.contains(x, y) && self.cells[self.bounds.offset(x, y)]
    }

    /// Set a cell. Coordinates outside the bounds are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if self.bounds.contains(x, y) {
            let offset = self.bounds.offset(x, y);
            self.cells[offset] = value;
        }
    }

    /// True when every set cell of `other` is set in `self`.
    ///
    /// `other`'s bounds must lie inside ours, otherwise this fails fast
    /// even if the cells outside are all cleared.
    pub fn contains_mask(&self, other: &Mask2D) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.bounds.intersection(&other.bounds) != other.bounds {
            return false;
        }

        let b = other.bounds;
        for y in b.y..b.max_y() {
            for x in b.x..b.max_x() {
                if other.cells[b.offset(x, y)] && !self.cells[self.bounds.offset(x, y)] {
                    return false;
                }
            }
        }
        true
    }

    /// True when at least one coordinate is set in both masks
    pub fn intersects(&self, other: &Mask2D) -> bool {
        let overlap = self.bounds.intersection(&other.bounds);
        if overlap.is_empty() {
            return false;
        }

        for y in overlap.y..overlap.max_y() {
            for x in overlap.x..overlap.max_x() {
                if self.cells[self.bounds.offset(x, y)] && other.cells[other.bounds.offset(x, y)] {
                    return true;
                }
            }
        }
        false
    }

    /// Number of set cells
    pub fn point_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Set cells in ascending row-major order (y first, then x)
    pub fn points(&self) -> Vec<(i32, i32)> {
        let b = self.bounds;
        let mut points = Vec::new();
        if b.is_empty() {
            return points;
        }

        let width = b.width as usize;
        for (offset, _) in self.cells.iter().enumerate().filter(|(_, &c)| c) {
            points.push((b.x + (offset % width) as i32, b.y + (offset / width) as i32));
        }
        points
    }

    /// Set cells as interleaved `x0, y0, x1, y1, ...`
    pub fn points_flat(&self) -> Vec<i32> {
        self.points().into_iter().flat_map(|(x, y)| [x, y]).collect()
    }

    /// True when both masks set exactly the same absolute coordinates
    pub fn same_points(&self, other: &Mask2D) -> bool {
        self.points() == other.points()
    }
}
