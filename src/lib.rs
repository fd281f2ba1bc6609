//! # vidscii - terminal ASCII video player
//!
//! `vidscii` turns a video into a sequence of brightness-mapped text frames and
//! replays them in the terminal at the source frame rate.
//!
//! ## Features
//!
//! - Linear brightness to glyph mapping over a configurable ramp
//! - Aspect-preserving frame rendering at a chosen column width
//! - Video decoding through `ffmpeg`, with frames ordered by their numeric index
//! - Flicker-free playback: one buffered write per frame, looped until interrupted
//! - Transient frame storage that is removed on every exit path
//!
//! ## Example
//!
//! ```no_run
//! use vidscii::{CancelToken, FramePipeline, FrameStore, Ffmpeg, PipelineOptions, Player, TransientDir};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancelToken::new();
//! let store = FrameStore::new(TransientDir::unique("frames")?);
//! let pipeline = FramePipeline::new(Ffmpeg::default(), PipelineOptions::default().with_columns(120));
//! let sequence = pipeline.produce(Path::new("video.mp4"), &store, &cancel)?;
//!
//! let mut player = Player::new(sequence.frame_rate);
//! player.play(store, std::io::stdin(), &mut std::io::stdout(), &cancel)?;
//! # Ok(())
//! # }
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

pub mod cancel;
pub mod error;
pub mod glyph;
pub mod media;
pub mod pipeline;
pub mod playback;
pub mod raster;
pub mod render;
pub mod store;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use glyph::{GlyphRamp, DEFAULT_RAMP};
pub use media::{Ffmpeg, FrameRate, MediaBackend};
pub use pipeline::{FramePipeline, FrameSequence, PipelineOptions, Progress, ProgressPhase};
pub use playback::{PlaybackState, PlaybackStats, Player};
pub use raster::Raster;
pub use render::render_frame;
pub use store::{FrameStore, TransientDir};

fn default_columns() -> u32 {
    100
}

fn default_font_ratio() -> f32 {
    1.0
}

fn default_ramp() -> String {
    DEFAULT_RAMP.to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_wait_for_enter() -> bool {
    true
}

/// Application configuration, read from `vidscii.json` or `vidscii.toml`.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Output width in glyphs
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Multiplier applied to the aspect-derived row count
    #[serde(default = "default_font_ratio")]
    pub font_ratio: f32,
    /// Glyphs from densest to blank
    #[serde(default = "default_ramp")]
    pub ramp: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    /// Wait for Enter before the first frame is drawn
    #[serde(default = "default_wait_for_enter")]
    pub wait_for_enter: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            font_ratio: default_font_ratio(),
            ramp: default_ramp(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            wait_for_enter: default_wait_for_enter(),
        }
    }
}

impl AppConfig {
    /// Load and validate a configuration file. `.toml` files are parsed as TOML,
    /// anything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {}", path.display(), e)))?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        let config: AppConfig = if is_toml {
            toml::from_str(&text).map_err(|e| Error::Config(format!("parsing {}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&text).map_err(|e| Error::Config(format!("parsing {}: {}", path.display(), e)))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        GlyphRamp::new(&self.ramp)?;
        if self.columns == 0 {
            return Err(Error::Config("columns must be at least 1".into()));
        }
        if !(self.font_ratio.is_finite() && self.font_ratio > 0.0) {
            return Err(Error::Config(format!("font_ratio must be positive, got {}", self.font_ratio)));
        }
        Ok(())
    }

    pub fn glyph_ramp(&self) -> Result<GlyphRamp> {
        GlyphRamp::new(&self.ramp)
    }

    /// Pipeline options carrying this configuration's width, ramp and font ratio.
    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        Ok(PipelineOptions::default()
            .with_columns(self.columns)
            .with_ramp(self.glyph_ramp()?)
            .with_font_ratio(self.font_ratio))
    }

    pub fn media_backend(&self) -> Ffmpeg {
        Ffmpeg::new(&self.ffmpeg, &self.ffprobe)
    }
}
