//! Video to text-frame generation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::glyph::GlyphRamp;
use crate::media::{FrameRate, MediaBackend};
use crate::raster;
use crate::render::render_frame;
use crate::store::{list_by_ordinal, FrameStore, TransientDir, STILL_EXTENSION, STILL_PREFIX};

/// Represents the current phase of frame generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Asking the media backend for the source frame rate
    ProbingFrameRate,
    /// Decoding the video into still images
    ExtractingFrames,
    /// Converting stills to text frames
    ConvertingFrames,
    /// All text frames are persisted
    Complete,
}

/// Progress information for frame generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if unknown)
    pub total: usize,
    pub percentage: f64,
    pub message: String,
}

impl Progress {
    pub fn probing_frame_rate() -> Self {
        Self {
            phase: ProgressPhase::ProbingFrameRate,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Probing source frame rate...".to_string(),
        }
    }

    pub fn extracting_frames() -> Self {
        Self {
            phase: ProgressPhase::ExtractingFrames,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Extracting frames from video...".to_string(),
        }
    }

    pub fn converting_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            phase: ProgressPhase::ConvertingFrames,
            completed,
            total,
            percentage,
            message: format!("Converting frame {} of {}", completed, total),
        }
    }

    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Generated {} frames", total_frames),
        }
    }
}

/// Options for frame generation
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Output width in glyphs
    pub columns: u32,
    /// Frame rate to decode at; probed from the source when `None`
    pub frame_rate: Option<FrameRate>,
    pub ramp: GlyphRamp,
    /// Character cell compensation applied to the derived height
    pub font_ratio: f32,
    /// Where to decode stills; a fresh temp directory when `None`
    pub scratch_dir: Option<PathBuf>,
    /// Leave the decoded stills on disk
    pub keep_stills: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            columns: 100,
            frame_rate: None,
            ramp: GlyphRamp::default(),
            font_ratio: 1.0,
            scratch_dir: None,
            keep_stills: false,
        }
    }
}

impl PipelineOptions {
    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn with_ramp(mut self, ramp: GlyphRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn with_font_ratio(mut self, font_ratio: f32) -> Self {
        self.font_ratio = font_ratio;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_keep_stills(mut self, keep: bool) -> Self {
        self.keep_stills = keep;
        self
    }
}

/// Result of a successful generation run.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    pub frame_rate: FrameRate,
    pub width: u32,
    pub height: u32,
    /// Text frames in temporal order, as persisted
    pub frames: Vec<String>,
}

impl FrameSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Decodes a video through a [`MediaBackend`] and turns every still into a text frame.
pub struct FramePipeline<M> {
    media: M,
    options: PipelineOptions,
}

impl<M: MediaBackend> FramePipeline<M> {
    pub fn new(media: M, options: PipelineOptions) -> Self {
        Self { media, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Generate and persist the full frame sequence for `video` into `store`.
    pub fn produce(&self, video: &Path, store: &FrameStore, cancel: &CancelToken) -> Result<FrameSequence> {
        self.produce_with_progress(video, store, cancel, |_| {})
    }

    /// Same as [`produce`](Self::produce), reporting each phase through `progress_callback`.
    ///
    /// Any failure on any still aborts the run; nothing is persisted unless every
    /// still converted.
    pub fn produce_with_progress<F>(
        &self,
        video: &Path,
        store: &FrameStore,
        cancel: &CancelToken,
        progress_callback: F,
    ) -> Result<FrameSequence>
    where
        F: Fn(Progress) + Send + Sync,
    {
        let opts = &self.options;
        if opts.columns == 0 {
            return Err(Error::Usage("output width must be at least 1 column".into()));
        }
        if !video.is_file() {
            return Err(Error::Usage(format!("video source {} does not exist", video.display())));
        }
        check(cancel)?;

        // Phase 1: frame rate
        let frame_rate = match opts.frame_rate {
            Some(rate) => rate,
            None => {
                progress_callback(Progress::probing_frame_rate());
                self.media.probe_frame_rate(video)?
            }
        };
        check(cancel)?;

        // Phase 2: decode stills into scratch space
        let scratch = match &opts.scratch_dir {
            Some(dir) => TransientDir::create(dir)?,
            None => TransientDir::unique("stills")?,
        };
        progress_callback(Progress::extracting_frames());
        self.media
            .decode_to_stills(video, frame_rate, scratch.path())
            .map_err(|e| if cancel.is_cancelled() { Error::Interrupted } else { e })?;
        check(cancel)?;

        let stills = list_by_ordinal(scratch.path(), STILL_PREFIX, STILL_EXTENSION)?;
        if stills.is_empty() {
            return Err(Error::EmptySequence(video.to_path_buf()));
        }
        log::info!("decoded {} stills into {}", stills.len(), scratch.path().display());

        // Phase 3: convert, one output per still in ordinal order
        let (src_w, src_h) = raster::probe_dimensions(&stills[0].1)?;
        let width = opts.columns;
        let height = raster::target_height(width, src_w, src_h, opts.font_ratio);
        log::debug!("source {}x{} -> grid {}x{}", src_w, src_h, width, height);

        let total = stills.len();
        let completed = AtomicUsize::new(0);
        progress_callback(Progress::converting_frames(0, total));

        let frames = stills
            .par_iter()
            .map(|(_, still)| -> Result<String> {
                check(cancel)?;
                let raster = raster::load_grayscale(still, width, height)?;
                let frame = render_frame(&raster, &opts.ramp);
                let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress_callback(Progress::converting_frames(current, total));
                Ok(frame)
            })
            .collect::<Result<Vec<String>>>()?;

        // Phase 4: persist, then release the stills
        store.write_sequence(&frames)?;
        if opts.keep_stills {
            let kept = scratch.keep();
            log::info!("kept decoded stills in {}", kept.display());
        } else {
            drop(scratch);
        }

        progress_callback(Progress::complete(frames.len()));
        Ok(FrameSequence {
            frame_rate,
            width,
            height,
            frames,
        })
    }
}

fn check(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Interrupted)
    } else {
        Ok(())
    }
}
