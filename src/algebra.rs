// src/algebra.rs - Union, intersection, symmetric difference and subtraction of 2D masks

use crate::bounds::Bounds2D;
use crate::mask2d::Mask2D;

/// Combine `src` into the `dst` array (laid out over `dst_bounds`) cell by cell,
/// restricted to the overlap of both bounds.
fn combine_into<F>(dst_bounds: &Bounds2D, dst: &mut [bool], src: &Mask2D, op: F)
where
    F: Fn(bool, bool) -> bool,
{
    let overlap = dst_bounds.intersection(&src.bounds);
    if overlap.is_empty() {
        return;
    }

    let len = overlap.width as usize;
    for y in overlap.y..overlap.max_y() {
        let d = dst_bounds.offset(overlap.x, y);
        let s = src.bounds.offset(overlap.x, y);
        for (target, &value) in dst[d..d + len].iter_mut().zip(&src.cells[s..s + len]) {
            *target = op(*target, value);
        }
    }
}

impl Mask2D {
    /// Cells set in either mask, over the union of both bounds.
    ///
    /// An empty operand yields a clone of the other one.
    pub fn union(a: &Mask2D, b: &Mask2D) -> Mask2D {
        if a.is_empty() {
            return b.clone();
        }
        if b.is_empty() {
            return a.clone();
        }

        let mut result = Mask2D::blank(a.bounds.union(&b.bounds));
        combine_into(&result.bounds, &mut result.cells, a, |_, s| s);
        combine_into(&result.bounds, &mut result.cells, b, |d, s| d || s);
        result
    }

    /// Cells set in both masks, over the intersection of both bounds.
    ///
    /// Disjoint bounds or an empty operand yield [`Mask2D::empty`].
    pub fn intersection(a: &Mask2D, b: &Mask2D) -> Mask2D {
        if a.is_empty() || b.is_empty() {
            return Mask2D::empty();
        }
        let bounds = a.bounds.intersection(&b.bounds);
        if bounds.is_empty() {
            return Mask2D::empty();
        }

        let mut result = Mask2D::blank(bounds);
        combine_into(&result.bounds, &mut result.cells, a, |_, s| s);
        combine_into(&result.bounds, &mut result.cells, b, |d, s| d && s);
        result
    }

    /// Cells set in exactly one mask, with tightened bounds
    pub fn xor(a: &Mask2D, b: &Mask2D) -> Mask2D {
        if a.is_empty() {
            return b.clone();
        }
        if b.is_empty() {
            return a.clone();
        }

        let mut result = Mask2D::blank(a.bounds.union(&b.bounds));
        combine_into(&result.bounds, &mut result.cells, a, |_, s| s);
        combine_into(&result.bounds, &mut result.cells, b, |d, s| d ^ s);
        result.optimize_bounds();
        result
    }

    /// Cells of `a` not set in `b`, with tightened bounds
    pub fn subtraction(a: &Mask2D, b: &Mask2D) -> Mask2D {
        if a.is_empty() {
            return Mask2D::empty();
        }
        if b.is_empty() {
            return a.clone();
        }

        let mut result = a.clone();
        combine_into(&result.bounds, &mut result.cells, b, |d, s| d && !s);
        result.optimize_bounds();
        result
    }

    /// Union of every mask, folded left to right. Empty input gives an empty mask.
    pub fn union_all(masks: &[Mask2D]) -> Mask2D {
        fold(masks, Mask2D::union)
    }

    /// Intersection of every mask, folded left to right
    pub fn intersection_all(masks: &[Mask2D]) -> Mask2D {
        fold(masks, Mask2D::intersection)
    }

    /// Symmetric difference of every mask, folded left to right
    pub fn xor_all(masks: &[Mask2D]) -> Mask2D {
        fold(masks, Mask2D::xor)
    }

    /// In-place union. Cells are updated without reallocation when `other`
    /// fits inside the current bounds.
    pub fn apply_union_into(&mut self, other: &Mask2D) {
        if other.is_empty() {
            return;
        }
        if !self.is_empty() && self.bounds.contains_bounds(&other.bounds) {
            combine_into(&self.bounds, &mut self.cells, other, |d, s| d || s);
        } else {
            *self = Mask2D::union(self, other);
        }
    }

    /// In-place intersection. Cells are updated without reallocation when
    /// `other` covers the current bounds.
    pub fn apply_intersection_into(&mut self, other: &Mask2D) {
        if !self.is_empty() && !other.is_empty() && other.bounds.contains_bounds(&self.bounds) {
            combine_into(&self.bounds, &mut self.cells, other, |d, s| d && s);
        } else {
            *self = Mask2D::intersection(self, other);
        }
    }

    /// In-place symmetric difference, bounds tightened afterwards
    pub fn apply_xor_into(&mut self, other: &Mask2D) {
        if other.is_empty() {
            return;
        }
        if !self.is_empty() && self.bounds.contains_bounds(&other.bounds) {
            combine_into(&self.bounds, &mut self.cells, other, |d, s| d ^ s);
            self.optimize_bounds();
        } else {
            *self = Mask2D::xor(self, other);
        }
    }

    /// In-place subtraction; the result always fits the current bounds
    pub fn apply_subtraction_into(&mut self, other: &Mask2D) {
        if self.is_empty() {
            *self = Mask2D::empty();
            return;
        }
        if other.is_empty() {
            return;
        }
        combine_into(&self.bounds, &mut self.cells, other, |d, s| d && !s);
        self.optimize_bounds();
    }
}

fn fold(masks: &[Mask2D], op: fn(&Mask2D, &Mask2D) -> Mask2D) -> Mask2D {
    let mut iter = masks.iter();
    let Some(first) = iter.next() else {
        return Mask2D::empty();
    };
    iter.fold(first.clone(), |acc, mask| op(&acc, mask))
}
