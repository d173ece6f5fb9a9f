// src/pipeline.rs - Per-image mask analysis for the batch CLI

use std::path::PathBuf;

use log::{debug, info};
use serde::Serialize;

use crate::config::Config;
use crate::errors::{MaskError, Result};
use crate::image_io::{save_image, InputImage};
use crate::image_utils::{create_debug_image, mask_from_image, mask_to_image, CONTOUR_COLOR_RGB};
use crate::mask2d::Mask2D;
use crate::output::{write_components_csv, write_contour_csv};

/// One row of the batch summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskSummary {
    pub filename: String,
    pub subfolder: String,
    pub image_width: u32,
    pub image_height: u32,
    pub bounds_x: i32,
    pub bounds_y: i32,
    pub bounds_width: i32,
    pub bounds_height: i32,
    pub point_count: usize,
    pub contour_point_count: usize,
    pub connected_contour_length: usize,
    pub component_count: usize,
    pub largest_component: usize,
    pub perimeter: f64,
}

/// Largest cell grid an upscale may produce
pub const MAX_SCALED_CELLS: usize = 1 << 28;

/// Apply `steps` doublings (positive) or halvings (negative).
///
/// Upscaling first tightens the bounds and refuses to grow the grid past
/// `MAX_SCALED_CELLS`. Downscaling keeps the bounds so blocks stay aligned
/// to the image origin.
pub fn apply_scale_steps(mut mask: Mask2D, steps: i32, threshold: u8) -> Result<Mask2D> {
    if steps > 0 {
        mask.optimize_bounds();
        let cells = mask.bounds().area() as f64 * 4f64.powi(steps);
        if cells > MAX_SCALED_CELLS as f64 {
            return Err(MaskError::Config(format!(
                "scale_steps {} would grow {:?} to {:.0} cells (limit {})",
                steps,
                mask.bounds(),
                cells,
                MAX_SCALED_CELLS
            )));
        }
    }

    for _ in 0..steps.max(0) {
        mask = mask.upscale();
    }
    for _ in 0..(-steps).max(0) {
        mask = mask.downscale(threshold)?;
    }
    if steps != 0 {
        debug!("Scaled by 2^{} to {:?}", steps, mask.bounds());
    }
    Ok(mask)
}

/// Build, analyse and report the mask of a single image
pub fn process_image(input_image: InputImage, config: &Config, debug: bool) -> Result<MaskSummary> {
    let InputImage { image, path, filename } = input_image;

    let subfolder = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
        .unwrap_or("root")
        .to_string();

    // Step 1: Raster to mask
    let mask = mask_from_image(&image, config.foreground, config.foreground_threshold);

    // Step 2: Scaling
    let mut mask = apply_scale_steps(mask, config.scale_steps, config.downscale_threshold)?;

    // Step 3: Tight bounds
    mask.optimize_bounds();
    if mask.point_count() == 0 {
        return Err(MaskError::NoForeground);
    }

    // Step 4: Statistics
    let point_count = mask.point_count();
    let contour = mask.contour_points();
    let connected = mask.connected_contour();
    let components: Vec<Mask2D> = mask
        .components()
        .into_iter()
        .filter(|c| c.point_count() >= config.min_component_size)
        .collect();
    let perimeter = mask.perimeter();

    if connected.len() < contour.len() {
        debug!(
            "{}: ordered contour covers {} of {} border points",
            filename,
            connected.len(),
            contour.len()
        );
    }

    // Step 5: Reports
    let output_dir = PathBuf::from(&config.output_base_dir);
    if config.export_contours {
        write_contour_csv(&connected, &output_dir, &filename)?;
    }
    if config.export_components {
        write_components_csv(&components, &output_dir, &filename)?;
    }

    if debug {
        // Canvas covers the bounds window only
        let b = mask.bounds();
        let canvas = mask_to_image(&mask);
        let local: Vec<(i32, i32)> = contour.iter().map(|&(x, y)| (x - b.x, y - b.y)).collect();
        let overlay = create_debug_image(&canvas, &local, CONTOUR_COLOR_RGB, 1);
        let debug_path = output_dir.join("debug").join(format!("{}_contour.png", filename));
        save_image(&overlay, &debug_path)?;
        debug!("Saved contour overlay to {}", debug_path.display());
    }

    let b = mask.bounds();
    let summary = MaskSummary {
        filename,
        subfolder,
        image_width: image.width(),
        image_height: image.height(),
        bounds_x: b.x,
        bounds_y: b.y,
        bounds_width: b.width,
        bounds_height: b.height,
        point_count,
        contour_point_count: contour.len(),
        connected_contour_length: connected.len(),
        component_count: components.len(),
        largest_component: components.iter().map(Mask2D::point_count).max().unwrap_or(0),
        perimeter,
    };

    info!(
        "{}: {} points, {} component(s), perimeter {:.3}",
        summary.filename, summary.point_count, summary.component_count, summary.perimeter
    );

    Ok(summary)
}
