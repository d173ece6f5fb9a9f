// src/lib.rs - Library interface for roi_mask_rust

pub mod algebra;
pub mod bounds;
pub mod components;
pub mod config;
pub mod contour;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod layered;
pub mod mask2d;
pub mod mask_trait;
pub mod morphology;
pub mod optimize;
pub mod output;
pub mod perimeter;
pub mod pipeline;
pub mod region;
pub mod scale;
pub mod shared;

// Re-export commonly used types and functions
pub use errors::{MaskError, Result};
pub use config::{Config, ForegroundRule};
pub use pipeline::{process_image, MaskSummary};
pub use image_io::{InputImage, load_image, save_image};

// Re-export the mask family
pub use bounds::{Axis, Bounds2D, LayeredBounds, MaskBounds};
pub use mask2d::Mask2D;
pub use layered::{LayeredMask, Layers, Mask3D, Mask4D, Mask5D};
pub use mask_trait::BooleanMask;
pub use scale::Scaling;
pub use shared::SharedMask;

// Re-export region combinators
pub use region::{
    SliceMaskSource,
    SlicePosition,
    union_of_sources,
    intersection_of_sources,
    xor_of_sources,
    subtraction_of_sources,
};

// Re-export morphology helpers
pub use morphology::{dilate_square, erode_square};
