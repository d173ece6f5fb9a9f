// src/bounds.rs - Rectangles and extents that masks are defined over

use serde::{Deserialize, Serialize};

/// Common behaviour of the bounds of any mask rank.
pub trait MaskBounds: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync {
    /// True when the bounds enclose no cell at all
    fn is_empty(&self) -> bool;

    /// Smallest bounds enclosing both inputs (an empty side is ignored)
    fn union(&self, other: &Self) -> Self;

    /// Overlap of both inputs
    fn intersection(&self, other: &Self) -> Self;
}

/// Integer rectangle `(x, y, width, height)`; the max corner is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bounds2D {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds2D {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Tight rectangle around a set of points, empty for no points
    pub fn from_points(points: &[(i32, i32)]) -> Self {
        let mut iter = points.iter();
        let Some(&(x0, y0)) = iter.next() else {
            return Self::default();
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for &(x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of cells, zero for empty bounds
    #[inline]
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// Exclusive max x
    #[inline]
    pub fn max_x(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive max y
    #[inline]
    pub fn max_y(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.max_x() && y < self.max_y()
    }

    /// True if `other` lies completely inside `self`. Empty `other` is always contained.
    pub fn contains_bounds(&self, other: &Bounds2D) -> bool {
        if other.is_empty() {
            return true;
        }
        !self.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Row-major offset of an absolute coordinate. Caller guarantees containment.
    #[inline]
    pub(crate) fn offset(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.contains(x, y));
        ((y - self.y) as usize) * (self.width as usize) + (x - self.x) as usize
    }

    pub fn union(&self, other: &Bounds2D) -> Bounds2D {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());

        Bounds2D::new(x, y, max_x - x, max_y - y)
    }

    /// Overlap rectangle; width/height are clamped to zero when disjoint
    pub fn intersection(&self, other: &Bounds2D) -> Bounds2D {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());

        Bounds2D::new(x, y, (max_x - x).max(0), (max_y - y).max(0))
    }
}

impl MaskBounds for Bounds2D {
    fn is_empty(&self) -> bool {
        Bounds2D::is_empty(self)
    }

    fn union(&self, other: &Self) -> Self {
        Bounds2D::union(self, other)
    }

    fn intersection(&self, other: &Self) -> Self {
        Bounds2D::intersection(self, other)
    }
}

/// Extent of a mask along one outer axis (Z, T or C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Indexes `origin .. origin + size`
    Finite { origin: i32, size: i32 },
    /// Every index along the axis
    Infinite,
}

impl Default for Axis {
    fn default() -> Self {
        Axis::Finite { origin: 0, size: 0 }
    }
}

impl Axis {
    /// Tight finite extent around a set of indexes
    pub fn spanning<I: IntoIterator<Item = i32>>(indexes: I) -> Axis {
        let mut range: Option<(i32, i32)> = None;
        for index in indexes {
            range = Some(match range {
                None => (index, index),
                Some((lo, hi)) => (lo.min(index), hi.max(index)),
            });
        }

        match range {
            Some((lo, hi)) => Axis::Finite { origin: lo, size: hi - lo + 1 },
            None => Axis::default(),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Axis::Infinite)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Axis::Finite { size, .. } => *size <= 0,
            Axis::Infinite => false,
        }
    }

    pub fn contains(&self, index: i32) -> bool {
        match *self {
            Axis::Finite { origin, size } => index >= origin && index < origin + size,
            Axis::Infinite => true,
        }
    }

    /// Covering extent; anything joined with an infinite extent is infinite
    pub fn union(&self, other: &Axis) -> Axis {
        match (*self, *other) {
            (Axis::Infinite, _) | (_, Axis::Infinite) => Axis::Infinite,
            (a, b) if a.is_empty() => b,
            (a, b) if b.is_empty() => a,
            (Axis::Finite { origin: o1, size: s1 }, Axis::Finite { origin: o2, size: s2 }) => {
                let lo = o1.min(o2);
                let hi = (o1 + s1).max(o2 + s2);
                Axis::Finite { origin: lo, size: hi - lo }
            }
        }
    }

    /// Overlap; an infinite extent leaves the other side unchanged
    pub fn intersection(&self, other: &Axis) -> Axis {
        match (*self, *other) {
            (Axis::Infinite, b) => b,
            (a, Axis::Infinite) => a,
            (Axis::Finite { origin: o1, size: s1 }, Axis::Finite { origin: o2, size: s2 }) => {
                let lo = o1.max(o2);
                let hi = (o1 + s1).min(o2 + s2);
                Axis::Finite { origin: lo, size: (hi - lo).max(0) }
            }
        }
    }
}

/// Bounds of a lifted mask: one outer axis over the bounds of the lower rank.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayeredBounds<B> {
    pub outer: Axis,
    pub inner: B,
}

impl<B: MaskBounds> LayeredBounds<B> {
    pub fn new(outer: Axis, inner: B) -> Self {
        Self { outer, inner }
    }
}

impl<B: MaskBounds> MaskBounds for LayeredBounds<B> {
    fn is_empty(&self) -> bool {
        self.outer.is_empty() || self.inner.is_empty()
    }

    fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        LayeredBounds::new(self.outer.union(&other.outer), self.inner.union(&other.inner))
    }

    fn intersection(&self, other: &Self) -> Self {
        LayeredBounds::new(
            self.outer.intersection(&other.outer),
            self.inner.intersection(&other.inner),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_ignores_empty_side() {
        let a = Bounds2D::new(2, 3, 4, 5);
        assert_eq!(a.union(&Bounds2D::default()), a);
        assert_eq!(Bounds2D::new(9, 9, 0, 3).union(&a), a);
        assert_eq!(a.union(&Bounds2D::new(0, 0, 1, 1)), Bounds2D::new(0, 0, 6, 8));
    }

    #[test]
    fn test_intersection_clamps_disjoint() {
        let a = Bounds2D::new(0, 0, 4, 4);
        let b = Bounds2D::new(2, 2, 4, 4);
        assert_eq!(a.intersection(&b), Bounds2D::new(2, 2, 2, 2));

        let far = Bounds2D::new(10, 10, 2, 2);
        let none = a.intersection(&far);
        assert!(none.is_empty());
        assert_eq!(none.area(), 0);
    }

    #[test]
    fn test_from_points() {
        let b = Bounds2D::from_points(&[(3, 1), (-1, 4), (2, 2)]);
        assert_eq!(b, Bounds2D::new(-1, 1, 5, 4));
        assert!(Bounds2D::from_points(&[]).is_empty());
    }

    #[test]
    fn test_axis_algebra() {
        let a = Axis::Finite { origin: 0, size: 3 };
        let b = Axis::Finite { origin: 5, size: 2 };
        assert_eq!(a.union(&b), Axis::Finite { origin: 0, size: 7 });
        assert!(a.intersection(&b).is_empty());
        assert_eq!(a.union(&Axis::Infinite), Axis::Infinite);
        assert_eq!(a.intersection(&Axis::Infinite), a);
        assert_eq!(Axis::spanning([4, -2, 1]), Axis::Finite { origin: -2, size: 7 });
        assert!(Axis::spanning(std::iter::empty()).is_empty());
    }
}
