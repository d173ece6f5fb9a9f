// src/morphology.rs - Square-kernel dilation and erosion

use rayon::prelude::*;

use crate::bounds::Bounds2D;
use crate::mask2d::Mask2D;

/// Applies morphological dilation with a square kernel of the given radius.
///
/// The output bounds grow by `radius` on every side so no set cell is clipped.
pub fn dilate_square(mask: &Mask2D, radius: i32) -> Mask2D {
    if mask.is_empty() || radius <= 0 {
        return mask.clone();
    }

    let src = mask.bounds();
    let out_bounds = Bounds2D::new(
        src.x - radius,
        src.y - radius,
        src.width + 2 * radius,
        src.height + 2 * radius,
    );
    let width = out_bounds.width as usize;
    let mut cells = vec![false; out_bounds.area()];

    cells.par_chunks_mut(width).enumerate().for_each(|(row_index, row)| {
        let y = out_bounds.y + row_index as i32;
        for (lx, cell) in row.iter_mut().enumerate() {
            let x = out_bounds.x + lx as i32;

            // Check if any kernel pixel overlaps with a set cell
            'kernel_check: for ky in -radius..=radius {
                for kx in -radius..=radius {
                    if mask.contains(x + kx, y + ky) {
                        *cell = true;
                        break 'kernel_check;
                    }
                }
            }
        }
    });

    Mask2D {
        bounds: out_bounds,
        cells,
    }
}

/// Applies morphological erosion with a square kernel of the given radius.
///
/// Cells outside the bounds count as cleared. The result has tight bounds.
pub fn erode_square(mask: &Mask2D, radius: i32) -> Mask2D {
    if mask.is_empty() || radius <= 0 {
        return mask.clone();
    }

    let b = mask.bounds();
    let width = b.width as usize;
    let mut cells = vec![false; b.area()];

    cells.par_chunks_mut(width).enumerate().for_each(|(row_index, row)| {
        let y = b.y + row_index as i32;
        for (lx, cell) in row.iter_mut().enumerate() {
            let x = b.x + lx as i32;
            if !mask.contains(x, y) {
                continue;
            }

            let mut erode = false;
            'kernel_check: for ky in -radius..=radius {
                for kx in -radius..=radius {
                    if !mask.contains(x + kx, y + ky) {
                        erode = true;
                        break 'kernel_check;
                    }
                }
            }
            *cell = !erode;
        }
    });

    let mut result = Mask2D { bounds: b, cells };
    result.optimize_bounds();
    result
}

impl Mask2D {
    /// One-step 3x3 erosion
    pub fn erode(&self) -> Mask2D {
        erode_square(self, 1)
    }
}
