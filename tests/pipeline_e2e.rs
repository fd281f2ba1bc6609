//! End-to-end tests for frame generation.
//!
//! A fake media backend writes grayscale PNG stills with the `image` crate,
//! so these tests never need `ffmpeg`.

use image::{GrayImage, Luma};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vidscii::{
    CancelToken, Error, FramePipeline, FrameRate, FrameStore, GlyphRamp, MediaBackend, PipelineOptions, ProgressPhase,
    Result, TransientDir,
};

struct FakeMedia {
    rate: Option<FrameRate>,
    /// One uniform still per entry, written as frame_1.png, frame_2.png, ...
    shades: Vec<u8>,
    size: (u32, u32),
    corrupt_still: Option<usize>,
    probed: Arc<AtomicBool>,
}

impl FakeMedia {
    fn new(shades: Vec<u8>, size: (u32, u32)) -> Self {
        Self {
            rate: FrameRate::new(10, 1),
            shades,
            size,
            corrupt_still: None,
            probed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl MediaBackend for FakeMedia {
    fn probe_frame_rate(&self, video: &Path) -> Result<FrameRate> {
        self.probed.store(true, Ordering::SeqCst);
        self.rate.ok_or_else(|| Error::Probe {
            path: video.to_path_buf(),
            message: "no video stream".into(),
        })
    }

    fn decode_to_stills(&self, _video: &Path, _rate: FrameRate, out_dir: &Path) -> Result<()> {
        let (w, h) = self.size;
        for (i, &shade) in self.shades.iter().enumerate() {
            let path = out_dir.join(format!("frame_{}.png", i + 1));
            if self.corrupt_still == Some(i + 1) {
                fs::write(&path, b"garbage")?;
                continue;
            }
            GrayImage::from_pixel(w, h, Luma([shade]))
                .save(&path)
                .map_err(|e| Error::Decode { path: path.clone(), message: e.to_string() })?;
        }
        Ok(())
    }
}

struct Fixture {
    root: tempfile::TempDir,
    video: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let video = root.path().join("input.mp4");
        fs::write(&video, b"not really a video").unwrap();
        Self { root, video }
    }

    fn store(&self) -> FrameStore {
        FrameStore::new(TransientDir::create(self.root.path().join("text_frames")).unwrap())
    }

    fn scratch(&self) -> PathBuf {
        self.root.path().join("stills")
    }
}

const LETTERS: &str = "ABCDEFGHIJKL";

/// Shade that maps to ramp index `j` of a 12-glyph ramp.
fn shade_for(j: u32) -> u8 {
    ((j * 255 + 10) / 11) as u8
}

#[test]
fn frames_follow_numeric_still_order() {
    let fx = Fixture::new();
    let shades: Vec<u8> = (0..12).map(shade_for).collect();
    let options = PipelineOptions::default()
        .with_columns(8)
        .with_ramp(GlyphRamp::new(LETTERS).unwrap())
        .with_scratch_dir(fx.scratch());
    let store = fx.store();

    let seq = FramePipeline::new(FakeMedia::new(shades, (8, 4)), options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap();

    assert_eq!(seq.len(), 12);
    assert_eq!((seq.width, seq.height), (8, 4));
    for (i, frame) in seq.frames.iter().enumerate() {
        let letter = LETTERS.as_bytes()[i] as char;
        let expected = format!("{}\n", letter.to_string().repeat(8)).repeat(4);
        assert_eq!(frame, &expected, "frame {} out of order", i);
    }
}

#[test]
fn persisted_sequence_reloads_identically() {
    let fx = Fixture::new();
    let options = PipelineOptions::default().with_columns(6).with_scratch_dir(fx.scratch());
    let store = fx.store();

    let seq = FramePipeline::new(FakeMedia::new(vec![0, 60, 120, 180, 240], (12, 6)), options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap();

    assert_eq!(store.load_sequence().unwrap(), seq.frames);
    assert!(store.path().join("ascii_frame_0.txt").is_file());
    assert!(store.path().join("ascii_frame_4.txt").is_file());
}

#[test]
fn frame_shape_follows_source_aspect() {
    let fx = Fixture::new();
    let options = PipelineOptions::default().with_columns(10).with_scratch_dir(fx.scratch());
    let store = fx.store();

    let seq = FramePipeline::new(FakeMedia::new(vec![30, 200], (40, 20)), options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap();

    assert_eq!(seq.height, 5);
    for frame in &seq.frames {
        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.len() == 10));
    }
}

#[test]
fn scratch_stills_are_removed_unless_kept() {
    let fx = Fixture::new();
    let store = fx.store();
    let options = PipelineOptions::default().with_columns(4).with_scratch_dir(fx.scratch());
    FramePipeline::new(FakeMedia::new(vec![0, 255], (4, 4)), options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap();
    assert!(!fx.scratch().exists());

    let kept = fx.root.path().join("kept");
    let store = FrameStore::new(TransientDir::create(fx.root.path().join("more_frames")).unwrap());
    let options = PipelineOptions::default()
        .with_columns(4)
        .with_scratch_dir(&kept)
        .with_keep_stills(true);
    FramePipeline::new(FakeMedia::new(vec![0, 255], (4, 4)), options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap();
    assert!(kept.join("frame_1.png").is_file());
    assert!(kept.join("frame_2.png").is_file());
}

#[test]
fn zero_stills_fail_with_empty_sequence() {
    let fx = Fixture::new();
    let store = fx.store();
    let options = PipelineOptions::default().with_scratch_dir(fx.scratch());

    let err = FramePipeline::new(FakeMedia::new(Vec::new(), (4, 4)), options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::EmptySequence(_)));
    assert!(store.frame_paths().is_err());
    assert!(!fx.scratch().exists());
}

#[test]
fn one_bad_still_aborts_everything() {
    let fx = Fixture::new();
    let store = fx.store();
    let mut media = FakeMedia::new(vec![10, 20, 30, 40], (4, 4));
    media.corrupt_still = Some(3);
    let options = PipelineOptions::default().with_columns(4).with_scratch_dir(fx.scratch());

    let err = FramePipeline::new(media, options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert!(store.frame_paths().is_err(), "no partial sequence may be persisted");
    assert!(!fx.scratch().exists());
}

#[test]
fn probe_failure_stops_before_decoding() {
    let fx = Fixture::new();
    let store = fx.store();
    let mut media = FakeMedia::new(vec![0], (4, 4));
    media.rate = None;
    let probed = Arc::clone(&media.probed);
    let options = PipelineOptions::default().with_scratch_dir(fx.scratch());

    let err = FramePipeline::new(media, options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::Probe { .. }));
    assert!(probed.load(Ordering::SeqCst));
    assert!(!fx.scratch().exists());
}

#[test]
fn explicit_frame_rate_skips_probing() {
    let fx = Fixture::new();
    let store = fx.store();
    let media = FakeMedia::new(vec![0], (4, 4));
    let probed = Arc::clone(&media.probed);
    let rate = FrameRate::new(24000, 1001).unwrap();
    let options = PipelineOptions::default()
        .with_columns(4)
        .with_frame_rate(rate)
        .with_scratch_dir(fx.scratch());
    let pipeline = FramePipeline::new(media, options);

    let seq = pipeline.produce(&fx.video, &store, &CancelToken::new()).unwrap();
    assert_eq!(seq.frame_rate, rate);
    assert!(!probed.load(Ordering::SeqCst));
}

#[test]
fn probed_rate_is_reported() {
    let fx = Fixture::new();
    let store = fx.store();
    let options = PipelineOptions::default().with_columns(4).with_scratch_dir(fx.scratch());
    let media = FakeMedia::new(vec![0], (4, 4));

    let seq = FramePipeline::new(media, options)
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap();
    assert_eq!(seq.frame_rate, FrameRate::new(10, 1).unwrap());
}

#[test]
fn progress_runs_through_every_phase() {
    use std::sync::Mutex;

    let fx = Fixture::new();
    let store = fx.store();
    let options = PipelineOptions::default().with_columns(4).with_scratch_dir(fx.scratch());
    let phases = Mutex::new(Vec::new());

    FramePipeline::new(FakeMedia::new(vec![0, 100, 200], (4, 4)), options)
        .produce_with_progress(&fx.video, &store, &CancelToken::new(), |p| {
            phases.lock().unwrap().push((p.phase, p.completed, p.total));
        })
        .unwrap();

    let phases = phases.into_inner().unwrap();
    assert_eq!(phases.first().unwrap().0, ProgressPhase::ProbingFrameRate);
    assert_eq!(phases[1].0, ProgressPhase::ExtractingFrames);
    assert_eq!(phases.last().unwrap(), &(ProgressPhase::Complete, 3, 3));
    let converted = phases
        .iter()
        .filter(|(phase, completed, _)| *phase == ProgressPhase::ConvertingFrames && *completed > 0)
        .count();
    assert_eq!(converted, 3);
}

#[test]
fn cancelled_run_is_interrupted() {
    let fx = Fixture::new();
    let store = fx.store();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = FramePipeline::new(FakeMedia::new(vec![0], (4, 4)), PipelineOptions::default())
        .produce(&fx.video, &store, &cancel)
        .unwrap_err();
    assert!(matches!(err, Error::Interrupted));
}

#[test]
fn missing_video_or_zero_width_is_a_usage_error() {
    let fx = Fixture::new();
    let store = fx.store();

    let err = FramePipeline::new(FakeMedia::new(vec![0], (4, 4)), PipelineOptions::default())
        .produce(&fx.root.path().join("missing.mp4"), &store, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));

    let err = FramePipeline::new(FakeMedia::new(vec![0], (4, 4)), PipelineOptions::default().with_columns(0))
        .produce(&fx.video, &store, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
}
