//! Image glue: still dimensions, exact rescaling and grayscale extraction.

use image::imageops::FilterType;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Single-channel, row-major pixel buffer. The buffer always holds exactly
/// `width * height` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wrap a raw luma buffer. Fails when the buffer does not cover `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            // No source path here; load_grayscale attaches it.
            return Err(Error::decode(
                PathBuf::new(),
                format!("raster of {}x{} needs {} bytes, got {}", width, height, expected, pixels.len()),
            ));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }
}

/// Native dimensions of an image on disk, read from its header.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let (w, h) = image::image_dimensions(path).map_err(|e| Error::decode(path, e))?;
    if w == 0 || h == 0 {
        return Err(Error::decode(path, "image has a zero dimension"));
    }
    Ok((w, h))
}

/// Text grid height that keeps the source aspect ratio at `columns` wide.
///
/// `font_ratio` compensates for non-square character cells; at 1.0 this is
/// `round(columns / (src_w / src_h))`.
pub fn target_height(columns: u32, src_width: u32, src_height: u32, font_ratio: f32) -> u32 {
    let aspect = src_width as f64 / src_height as f64;
    let h = (columns as f64 / aspect * font_ratio as f64).round() as u32;
    h.max(1)
}

/// Decode a still, rescale it to exactly `width` x `height` and reduce it to luma.
pub fn load_grayscale(path: &Path, width: u32, height: u32) -> Result<Raster> {
    let img = image::open(path).map_err(|e| Error::decode(path, e))?;
    let img = if img.width() != width || img.height() != height {
        img.resize_exact(width, height, FilterType::Triangle)
    } else {
        img
    };
    let luma = img.to_luma8();
    let (w, h) = luma.dimensions();
    Raster::new(w, h, luma.into_raw()).map_err(|e| match e {
        Error::Decode { message, .. } => Error::decode(path, message),
        other => other,
    })
}
