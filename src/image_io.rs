// src/image_io.rs - Locating, loading and saving PNG mask images

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use log::debug;

use crate::errors::{MaskError, Result};

/// An input image with the name its reports are filed under
pub struct InputImage {
    pub image: RgbaImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Get all PNG files under a directory (recursively), sorted by path
pub fn get_png_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(MaskError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(MaskError::Config(format!(
            "{} is not a directory",
            dir_path.display()
        )));
    }

    let mut png_files = Vec::new();
    find_png_files_recursive(dir_path, &mut png_files)?;
    png_files.sort();

    debug!("Found {} PNG file(s) under {}", png_files.len(), dir_path.display());
    Ok(png_files)
}

fn find_png_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_png_files_recursive(&path, result)?;
        } else if path.is_file() && is_png(&path) {
            result.push(path);
        }
    }

    Ok(())
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}

/// Load an image as RGBA
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MaskError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let image = image::open(path)?.to_rgba8();

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGBA image as PNG, creating the parent directory
pub fn save_image<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    image.save_with_format(path, ImageFormat::Png)?;

    Ok(())
}
