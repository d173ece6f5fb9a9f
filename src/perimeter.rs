// src/perimeter.rs - Continuous length/area estimates from discrete contours

use std::f64::consts::{PI, SQRT_2};

use crate::errors::{MaskError, Result};
use crate::layered::{Layers, Mask3D};
use crate::mask2d::Mask2D;

/// Half of a diagonal link
const HALF_DIAGONAL: f64 = SQRT_2 / 2.0;

/// In-plane offsets ringing the outward neighbour of an exposed face
const RING_OFFSETS: [(i32, i32); 8] = [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

/// Running totals of a perimeter or surface estimate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct EdgeTally {
    length: f64,
    side: u32,
    corner: u32,
}

impl EdgeTally {
    fn side(&mut self, contribution: f64, count: u32) {
        self.length += contribution;
        self.side += count;
    }

    fn corner(&mut self, contribution: f64) {
        self.length += contribution;
        self.corner += 1;
    }
}

/// Contribution of one contour point given its neighbourhood.
///
/// `direct` is `[top, left, right, bottom]`, `diagonal` is
/// `[top_left, top_right, bottom_left, bottom_right]`.
fn classify_contour_point(direct: [bool; 4], diagonal: [bool; 4], tally: &mut EdgeTally) {
    let [top, left, right, bottom] = direct;
    let [top_left, top_right, bottom_left, bottom_right] = diagonal;
    let d = direct.iter().filter(|&&c| c).count();
    let g = diagonal.iter().filter(|&&c| c).count();

    match d {
        0 => match g {
            // Isolated point
            0 => tally.length += PI,
            // End of a diagonal line
            1 => tally.corner(PI / 2.0 + HALF_DIAGONAL),
            // Diagonal thread
            _ => tally.corner(g as f64 * HALF_DIAGONAL),
        },
        1 => {
            if g == 0 {
                // End of a straight line
                tally.side(PI / 2.0 + 0.5, 1);
            } else {
                // End of a staircase
                tally.corner(0.5 + HALF_DIAGONAL);
            }
        }
        2 => {
            if (left && right) || (top && bottom) {
                // Straight 180 degree border
                tally.side(1.0, 1);
            } else {
                // 90 degree corner
                tally.corner(SQRT_2);
            }
        }
        3 => {
            // Diagonals flanking the open side
            let flanking = if !top {
                [top_left, top_right]
            } else if !bottom {
                [bottom_left, bottom_right]
            } else if !left {
                [top_left, bottom_left]
            } else {
                [top_right, bottom_right]
            };

            match flanking.iter().filter(|&&c| c).count() {
                0 => tally.side(1.0, 1),
                // 225 degree corner
                1 => tally.corner(0.5 + HALF_DIAGONAL),
                // One pixel notch
                _ => tally.corner(SQRT_2),
            }
        }
        // Contour points always miss a direct neighbour; kept so every `d` is covered
        _ => {
            let missing = 4 - g;
            if missing > 0 {
                tally.corner(missing as f64 * (SQRT_2 - 1.0));
            }
        }
    }
}

impl Mask2D {
    /// Estimate the continuous perimeter of the mask.
    ///
    /// Each contour point is classified by its 4 direct and 4 diagonal
    /// neighbours and adds a fixed contribution; the total is reduced by
    /// `min(side_edges / 10, corner_edges)` to offset systematic overshoot.
    pub fn perimeter(&self) -> f64 {
        let mut tally = EdgeTally::default();

        for (x, y) in self.contour_points() {
            let direct = [
                self.contains(x, y - 1),
                self.contains(x - 1, y),
                self.contains(x + 1, y),
                self.contains(x, y + 1),
            ];
            let diagonal = [
                self.contains(x - 1, y - 1),
                self.contains(x + 1, y - 1),
                self.contains(x - 1, y + 1),
                self.contains(x + 1, y + 1),
            ];
            classify_contour_point(direct, diagonal, &mut tally);
        }

        tally.length - (tally.side as f64 / 10.0).min(tally.corner as f64)
    }
}

impl Mask3D {
    /// Estimate the continuous surface area of a 3D mask.
    ///
    /// Every voxel with a cleared 6-neighbour is classified by how many faces
    /// it exposes per axis, refined with its 26-neighbourhood for flat faces.
    /// The total is reduced by `min(corner_faces / 10, side_faces)`.
    pub fn surface_area(&self) -> Result<f64> {
        let Layers::Finite { slices, .. } = self.layers() else {
            return Err(MaskError::InfiniteExtent { axis: "Z" });
        };

        let voxel = |x: i32, y: i32, z: i32| slices.get(&z).map_or(false, |m| m.contains(x, y));
        let mut tally = EdgeTally::default();

        for (&z, slice) in slices {
            for (x, y) in slice.points() {
                // Exposed faces per axis: (negative side, positive side)
                let exposed = [
                    (!voxel(x - 1, y, z), !voxel(x + 1, y, z)),
                    (!voxel(x, y - 1, z), !voxel(x, y + 1, z)),
                    (!voxel(x, y, z - 1), !voxel(x, y, z + 1)),
                ];
                let faces: usize = exposed.iter().map(|&(n, p)| n as usize + p as usize).sum();
                if faces == 0 {
                    continue;
                }
                if faces == 6 {
                    tally.length += PI;
                    continue;
                }

                let both = exposed.iter().filter(|&&(n, p)| n && p).count();
                let single = exposed.iter().filter(|&&(n, p)| n != p).count();
                if both > 0 {
                    tally.side(2.0 * both as f64, 2 * both as u32);
                }

                match single {
                    0 => {}
                    1 => {
                        // Outward step of the single exposed face
                        let axis = exposed.iter().position(|&(n, p)| n != p).unwrap_or(0);
                        let mut outward = [0, 0, 0];
                        outward[axis] = if exposed[axis].0 { -1 } else { 1 };

                        let staircase = RING_OFFSETS.iter().any(|&(a, b)| {
                            let mut o = outward;
                            o[(axis + 1) % 3] += a;
                            o[(axis + 2) % 3] += b;
                            voxel(x + o[0], y + o[1], z + o[2])
                        });

                        if staircase {
                            tally.corner((1.0 + SQRT_2) / 2.0);
                        } else {
                            tally.side(1.0, 1);
                        }
                    }
                    2 => tally.corner(SQRT_2),
                    _ => tally.corner(3f64.sqrt()),
                }
            }
        }

        Ok(tally.length - (tally.corner as f64 / 10.0).min(tally.side as f64))
    }
}
