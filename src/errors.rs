use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the mask library and its CLI
#[derive(Error, Debug)]
pub enum MaskError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Cell array has {actual} entries but bounds require {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Flat point list of length {len} is not a multiple of rank {rank}")]
    PointArity { rank: usize, len: usize },

    #[error("Cannot combine a finite and an infinite extent along the {axis} axis")]
    DimensionMismatch { axis: &'static str },

    #[error("Operation needs a finite extent along the {axis} axis")]
    InfiniteExtent { axis: &'static str },

    #[error("Downscale threshold {threshold} outside of [1, {max}]")]
    InvalidThreshold { threshold: u8, max: u8 },

    #[error("Shared mask lock was poisoned by a panicking writer")]
    Poisoned,

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No foreground pixels found in image")]
    NoForeground,

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, MaskError>;

/// Axis names by coordinate position (x, y, z, t, c).
pub(crate) const AXIS_NAMES: [&str; 5] = ["X", "Y", "Z", "T", "C"];

/// Name of the axis at `index`, falling back to "N" past the fifth dimension.
pub(crate) fn axis_name(index: usize) -> &'static str {
    AXIS_NAMES.get(index).copied().unwrap_or("N")
}
