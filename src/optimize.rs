// src/optimize.rs - Tightening and moving mask bounds

use crate::bounds::Bounds2D;
use crate::mask2d::Mask2D;

impl Mask2D {
    /// Smallest rectangle enclosing every set cell.
    ///
    /// Without set cells the result has zero size at the current origin.
    pub fn optimized_bounds(&self) -> Bounds2D {
        let b = self.bounds;
        if b.is_empty() {
            return Bounds2D::new(b.x, b.y, 0, 0);
        }

        let width = b.width as usize;
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0usize;
        let mut max_y = 0usize;

        for (row_index, row) in self.cells.chunks_exact(width).enumerate() {
            let Some(first) = row.iter().position(|&c| c) else {
                continue;
            };
            // `first` exists, so does `last`
            let last = row.iter().rposition(|&c| c).unwrap_or(first);

            if min_y == usize::MAX {
                min_y = row_index;
            }
            max_y = row_index;
            min_x = min_x.min(first);
            max_x = max_x.max(last);
        }

        if min_y == usize::MAX {
            return Bounds2D::new(b.x, b.y, 0, 0);
        }

        Bounds2D::new(
            b.x + min_x as i32,
            b.y + min_y as i32,
            (max_x - min_x + 1) as i32,
            (max_y - min_y + 1) as i32,
        )
    }

    /// Shrink the bounds to the set cells. Returns true if the bounds changed.
    pub fn optimize_bounds(&mut self) -> bool {
        let tight = self.optimized_bounds();
        self.move_bounds(tight)
    }

    /// Reallocate to `new_bounds`, keeping the overlapping cells and clearing the rest.
    ///
    /// Returns false (and does nothing) if the bounds are unchanged.
    pub fn move_bounds(&mut self, new_bounds: Bounds2D) -> bool {
        if new_bounds == self.bounds {
            return false;
        }

        let mut cells = vec![false; new_bounds.area()];
        let overlap = self.bounds.intersection(&new_bounds);
        if !overlap.is_empty() && !new_bounds.is_empty() {
            let len = overlap.width as usize;
            for y in overlap.y..overlap.max_y() {
                let src = self.bounds.offset(overlap.x, y);
                let dst = new_bounds.offset(overlap.x, y);
                cells[dst..dst + len].copy_from_slice(&self.cells[src..src + len]);
            }
        }

        self.bounds = new_bounds;
        self.cells = cells;
        true
    }
}
