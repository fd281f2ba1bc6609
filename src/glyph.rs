//! Brightness to glyph mapping.

use crate::error::{Error, Result};

/// Dense-to-sparse ramp used when no custom ramp is configured.
pub const DEFAULT_RAMP: &str = "@B%8&WM#*CJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'. ";

/// An ordered, immutable palette of glyphs.
///
/// Index 0 is the densest glyph and is chosen for brightness 0; the last glyph
/// is chosen for brightness 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Box<[u8]>,
}

impl GlyphRamp {
    /// Build a ramp from a string of ASCII glyphs, darkest appearance first.
    pub fn new(glyphs: &str) -> Result<Self> {
        if glyphs.is_empty() {
            return Err(Error::Config("glyph ramp must not be empty".into()));
        }
        if !glyphs.is_ascii() {
            return Err(Error::Config(
                "glyph ramp contains non-ASCII characters, which would break the grid width".into(),
            ));
        }
        Ok(Self {
            glyphs: glyphs.as_bytes().into(),
        })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; construction rejects empty ramps.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Position in the ramp chosen for `brightness`.
    pub fn index_for(&self, brightness: u8) -> usize {
        let last = self.glyphs.len() - 1;
        let idx = (brightness as usize * last) / 255;
        idx.min(last)
    }

    /// Map a brightness value to its glyph.
    pub fn map(&self, brightness: u8) -> char {
        self.glyphs[self.index_for(brightness)] as char
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self {
            glyphs: DEFAULT_RAMP.as_bytes().into(),
        }
    }
}
