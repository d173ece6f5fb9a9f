// src/scale.rs - Power-of-two up and down scaling

use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;

use crate::bounds::Bounds2D;
use crate::errors::{MaskError, Result};
use crate::layered::{LayeredMask, Layers, Mask3D};
use crate::mask2d::Mask2D;
use crate::mask_trait::BooleanMask;

/// 2x scaling with a majority threshold on the way down.
pub trait Scaling: Sized {
    /// Threshold used when the caller has no preference
    const DEFAULT_THRESHOLD: u8;
    /// Number of cells in one block
    const MAX_THRESHOLD: u8;

    /// Every cell becomes a block of identical cells
    fn scale_up(&self) -> Self;

    /// Every complete block becomes one cell, set when at least `threshold`
    /// of its cells are set. Incomplete trailing blocks are ignored.
    fn scale_down(&self, threshold: u8) -> Result<Self>;
}

fn check_threshold(threshold: u8, max: u8) -> Result<()> {
    if threshold == 0 || threshold > max {
        return Err(MaskError::InvalidThreshold { threshold, max });
    }
    Ok(())
}

impl Mask2D {
    /// Each cell becomes a 2x2 block; bounds become `(2x, 2y, 2w, 2h)`
    pub fn upscale(&self) -> Mask2D {
        let b = self.bounds;
        let out = Bounds2D::new(b.x * 2, b.y * 2, b.width.max(0) * 2, b.height.max(0) * 2);
        if out.is_empty() {
            return Mask2D::blank(out);
        }

        let width = b.width as usize;
        let out_width = out.width as usize;
        let mut cells = vec![false; out.area()];

        cells.par_chunks_mut(out_width).enumerate().for_each(|(out_row, row)| {
            let src = &self.cells[(out_row / 2) * width..(out_row / 2 + 1) * width];
            for (ox, cell) in row.iter_mut().enumerate() {
                *cell = src[ox / 2];
            }
        });

        Mask2D { bounds: out, cells }
    }

    /// Each complete 2x2 block becomes one cell, set when at least
    /// `threshold` (1..=4) of its cells are set. The origin is floor-halved.
    pub fn downscale(&self, threshold: u8) -> Result<Mask2D> {
        check_threshold(threshold, 4)?;

        let b = self.bounds;
        let out = Bounds2D::new(
            b.x.div_euclid(2),
            b.y.div_euclid(2),
            b.width.max(0) / 2,
            b.height.max(0) / 2,
        );
        if out.is_empty() {
            return Ok(Mask2D::blank(out));
        }

        let width = b.width as usize;
        let out_width = out.width as usize;
        let mut cells = vec![false; out.area()];

        cells.par_chunks_mut(out_width).enumerate().for_each(|(out_row, row)| {
            let top = &self.cells[(2 * out_row) * width..(2 * out_row + 1) * width];
            let bottom = &self.cells[(2 * out_row + 1) * width..(2 * out_row + 2) * width];
            for (ox, cell) in row.iter_mut().enumerate() {
                let count = [top[2 * ox], top[2 * ox + 1], bottom[2 * ox], bottom[2 * ox + 1]]
                    .iter()
                    .filter(|&&c| c)
                    .count();
                *cell = count >= threshold as usize;
            }
        });

        debug!(
            "Downscaled {}x{} to {}x{} (threshold {})",
            b.width, b.height, out.width, out.height, threshold
        );
        Ok(Mask2D { bounds: out, cells })
    }
}

impl Scaling for Mask2D {
    const DEFAULT_THRESHOLD: u8 = 2;
    const MAX_THRESHOLD: u8 = 4;

    fn scale_up(&self) -> Self {
        self.upscale()
    }

    fn scale_down(&self, threshold: u8) -> Result<Self> {
        self.downscale(threshold)
    }
}

impl Scaling for Mask3D {
    const DEFAULT_THRESHOLD: u8 = 5;
    const MAX_THRESHOLD: u8 = 8;

    /// Every voxel becomes a 2x2x2 block; a uniform mask only grows in XY.
    fn scale_up(&self) -> Self {
        let (origin, size, slices) = match self.layers() {
            Layers::Finite { origin, size, slices } => (*origin, *size, slices),
            Layers::Infinite(slice) => return Mask3D::uniform(slice.upscale()),
        };

        let doubled: Vec<(i32, Mask2D)> = slices
            .par_iter()
            .flat_map_iter(|(&z, slice)| {
                let grown = slice.upscale();
                [(2 * z, grown.clone()), (2 * z + 1, grown)]
            })
            .collect();

        Mask3D::with_extent(2 * origin, 2 * size, doubled)
    }

    /// 2x2x2 blocks aligned to the inner XY bounds and the Z origin. A
    /// uniform mask is halved in XY only, each 2x2 count standing for a
    /// block of two identical layers.
    fn scale_down(&self, threshold: u8) -> Result<Self> {
        check_threshold(threshold, Self::MAX_THRESHOLD)?;

        let (origin, size, slices) = match self.layers() {
            Layers::Finite { origin, size, slices } => (*origin, *size, slices),
            Layers::Infinite(slice) => return Ok(Mask3D::uniform(slice.downscale(threshold.div_ceil(2))?)),
        };

        let inner = self.bounds().inner;
        let out_inner = Bounds2D::new(inner.x.div_euclid(2), inner.y.div_euclid(2), inner.width / 2, inner.height / 2);
        let out_origin = origin.div_euclid(2);

        let aligned: BTreeMap<i32, Mask2D> = slices
            .iter()
            .map(|(&z, slice)| {
                let mut slice = slice.clone();
                slice.move_bounds(inner);
                (z, slice)
            })
            .collect();

        let blank = Mask2D::blank(inner);
        let width = inner.width as usize;
        let out_width = out_inner.width as usize;

        let layers: Vec<(i32, Mask2D)> = (0..size / 2)
            .into_par_iter()
            .filter_map(|j| {
                let lower = aligned.get(&(origin + 2 * j));
                let upper = aligned.get(&(origin + 2 * j + 1));
                if lower.is_none() && upper.is_none() {
                    return None;
                }
                let lower = lower.unwrap_or(&blank);
                let upper = upper.unwrap_or(&blank);

                let mut out = Mask2D::blank(out_inner);
                for oy in 0..out_inner.height as usize {
                    for ox in 0..out_width {
                        let mut count = 0usize;
                        for layer in [lower, upper] {
                            for dy in 0..2 {
                                let row = (2 * oy + dy) * width;
                                count += layer.cells[row + 2 * ox] as usize + layer.cells[row + 2 * ox + 1] as usize;
                            }
                        }
                        out.cells[oy * out_width + ox] = count >= threshold as usize;
                    }
                }

                (out.point_count() > 0).then_some((out_origin + j, out))
            })
            .collect();

        debug!(
            "Downscaled {} layer(s) of {}x{} to {} layer(s) (threshold {})",
            size, inner.width, inner.height, layers.len(), threshold
        );
        Ok(Mask3D::with_extent(out_origin, size / 2, layers))
    }
}

/// 4D and 5D masks scale their spatial part per outer index; the outer
/// axis itself is left unchanged.
impl<M> Scaling for LayeredMask<LayeredMask<M>>
where
    M: BooleanMask,
    LayeredMask<M>: Scaling,
{
    const DEFAULT_THRESHOLD: u8 = <LayeredMask<M> as Scaling>::DEFAULT_THRESHOLD;
    const MAX_THRESHOLD: u8 = <LayeredMask<M> as Scaling>::MAX_THRESHOLD;

    fn scale_up(&self) -> Self {
        match self.layers() {
            Layers::Finite { origin, size, slices } => {
                LayeredMask::with_extent(*origin, *size, slices.iter().map(|(&i, s)| (i, s.scale_up())))
            }
            Layers::Infinite(slice) => LayeredMask::uniform(slice.scale_up()),
        }
    }

    fn scale_down(&self, threshold: u8) -> Result<Self> {
        match self.layers() {
            Layers::Finite { origin, size, slices } => {
                let scaled = slices
                    .iter()
                    .map(|(&i, s)| -> Result<(i32, LayeredMask<M>)> { Ok((i, s.scale_down(threshold)?)) })
                    .collect::<Result<Vec<_>>>()?;
                Ok(LayeredMask::with_extent(*origin, *size, scaled))
            }
            Layers::Infinite(slice) => Ok(LayeredMask::uniform(slice.scale_down(threshold)?)),
        }
    }
}
