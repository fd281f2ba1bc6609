//! Media glue: frame-rate probing and video-to-stills decoding.
//!
//! The default backend shells out to `ffprobe` and `ffmpeg`, which must be on
//! `PATH` (or configured with explicit executable names).

use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command as ProcCommand, Stdio};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::store::{STILL_EXTENSION, STILL_PREFIX};

/// A positive rational frame rate in frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    num: u64,
    den: u64,
}

impl FrameRate {
    pub fn new(num: u64, den: u64) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        Some(Self { num, den })
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn den(&self) -> u64 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Time between two consecutive frames.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.den as f64 / self.num as f64)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for FrameRate {
    type Err = String;

    /// Accepts `30`, `29.97` or `30000/1001`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || format!("invalid frame rate '{}'", s);
        let (num, den) = if let Some((n, d)) = s.split_once('/') {
            let n: u64 = n.trim().parse().map_err(|_| invalid())?;
            let d: u64 = d.trim().parse().map_err(|_| invalid())?;
            (n, d)
        } else if let Some((int, frac)) = s.split_once('.') {
            if frac.is_empty() || frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let int: u64 = if int.is_empty() { 0 } else { int.parse().map_err(|_| invalid())? };
            let frac_val: u64 = frac.parse().map_err(|_| invalid())?;
            let den = 10u64.pow(frac.len() as u32);
            let num = int
                .checked_mul(den)
                .and_then(|v| v.checked_add(frac_val))
                .ok_or_else(invalid)?;
            (num, den)
        } else {
            (s.parse().map_err(|_| invalid())?, 1)
        };
        FrameRate::new(num, den).ok_or_else(|| format!("frame rate '{}' must be positive", s))
    }
}

/// External service that turns a video into still images.
pub trait MediaBackend {
    /// Native frame rate of the first video stream.
    fn probe_frame_rate(&self, video: &Path) -> Result<FrameRate>;

    /// Decode `video` into one still per `rate` interval, written to `out_dir`
    /// as `frame_<N>.png`. Returns once decoding has finished.
    fn decode_to_stills(&self, video: &Path, rate: FrameRate, out_dir: &Path) -> Result<()>;
}

/// `ffmpeg` / `ffprobe` subprocess backend.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl MediaBackend for Ffmpeg {
    fn probe_frame_rate(&self, video: &Path) -> Result<FrameRate> {
        let probe_err = |message: String| Error::Probe {
            path: video.to_path_buf(),
            message,
        };

        let output = ProcCommand::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=r_frame_rate"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(video)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => probe_err(format!("{} not found in PATH", self.ffprobe)),
                _ => probe_err(format!("running {}: {}", self.ffprobe, e)),
            })?;

        if !output.status.success() {
            return Err(probe_err(format!(
                "{} exited with {}: {}",
                self.ffprobe,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let rate = parse_probe_output(&text)
            .ok_or_else(|| probe_err(format!("no usable frame rate in ffprobe output '{}'", text.trim())))?;
        log::info!("probed {} at {} fps ({:.3})", video.display(), rate, rate.as_f64());
        Ok(rate)
    }

    fn decode_to_stills(&self, video: &Path, rate: FrameRate, out_dir: &Path) -> Result<()> {
        log::info!("extracting stills from {} at {} fps", video.display(), rate);
        let output = ProcCommand::new(&self.ffmpeg)
            .args(decode_args(video, rate, out_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::decode(video, format!("{} not found in PATH", self.ffmpeg)),
                _ => Error::decode(video, format!("running {}: {}", self.ffmpeg, e)),
            })?;

        if !output.status.success() {
            return Err(Error::decode(
                video,
                format!(
                    "{} exited with {}: {}",
                    self.ffmpeg,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(())
    }
}

/// First `num/den` line of `ffprobe ... stream=r_frame_rate` output.
fn parse_probe_output(text: &str) -> Option<FrameRate> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse().ok())
}

pub(crate) fn decode_args(video: &Path, rate: FrameRate, out_dir: &Path) -> Vec<OsString> {
    let out_pattern = out_dir.join(format!("{}%d.{}", STILL_PREFIX, STILL_EXTENSION));
    vec![
        "-nostdin".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        video.into(),
        "-vf".into(),
        format!("fps={}", rate).into(),
        out_pattern.into(),
    ]
}
