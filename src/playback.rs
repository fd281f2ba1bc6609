//! Timed terminal playback of a persisted frame sequence.
//!
//! Every tick is written as one buffer: hide cursor, cursor home, frame text,
//! erase to end of screen. Erasing after the frame clears whatever a taller
//! previous frame left behind without blanking the screen first.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::media::FrameRate;
use crate::store::{read_frame, FrameStore};

pub const HIDE_CURSOR: &str = "\x1b[?25l";
pub const SHOW_CURSOR: &str = "\x1b[?25h";
pub const CURSOR_HOME: &str = "\x1b[H";
pub const CLEAR_TO_END: &str = "\x1b[0J";

/// Longest uninterrupted sleep; bounds how late a cancellation is noticed.
const POLL_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    WaitingForStart,
    Playing,
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Frames drawn before playback stopped
    pub ticks: u64,
}

/// Build the single output buffer for one tick into `buf`.
pub fn compose_tick(frame: &str, buf: &mut Vec<u8>) {
    buf.clear();
    buf.reserve(HIDE_CURSOR.len() + CURSOR_HOME.len() + frame.len() + CLEAR_TO_END.len());
    buf.extend_from_slice(HIDE_CURSOR.as_bytes());
    buf.extend_from_slice(CURSOR_HOME.as_bytes());
    buf.extend_from_slice(frame.as_bytes());
    buf.extend_from_slice(CLEAR_TO_END.as_bytes());
}

/// Loops a stored frame sequence at a fixed rate until cancelled.
#[derive(Debug)]
pub struct Player {
    frame_rate: FrameRate,
    start_gate: bool,
    state: PlaybackState,
}

impl Player {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            frame_rate,
            start_gate: true,
            state: PlaybackState::Idle,
        }
    }

    /// Whether to wait for a line on the start input before the first frame.
    pub fn with_start_gate(mut self, enabled: bool) -> Self {
        self.start_gate = enabled;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Play `store` to `out` until `cancel` fires.
    ///
    /// Takes ownership of the store: the frame directory is removed when
    /// playback stops, whether by cancellation or by error.
    pub fn play<R, W>(&mut self, store: FrameStore, start_input: R, out: &mut W, cancel: &CancelToken) -> Result<PlaybackStats>
    where
        R: Read + Send + 'static,
        W: Write,
    {
        let result = self.run(&store, start_input, out, cancel);
        self.state = PlaybackState::Stopped;
        drop(store);
        result
    }

    fn run<R, W>(&mut self, store: &FrameStore, start_input: R, out: &mut W, cancel: &CancelToken) -> Result<PlaybackStats>
    where
        R: Read + Send + 'static,
        W: Write,
    {
        let mut stats = PlaybackStats::default();
        let frames = store.frame_paths()?;
        self.state = PlaybackState::WaitingForStart;
        log::info!(
            "loaded {} frames from {}, interval {:?}",
            frames.len(),
            store.path().display(),
            self.frame_rate.interval()
        );

        if self.start_gate && !wait_for_start(start_input, cancel)? {
            return Ok(stats);
        }

        self.state = PlaybackState::Playing;
        let result = tick_loop(&frames, self.frame_rate.interval(), out, cancel, &mut stats);
        // Restore the cursor even when a tick failed.
        let restored = out
            .write_all(SHOW_CURSOR.as_bytes())
            .and_then(|_| out.flush());
        result?;
        restored?;
        log::info!("playback stopped after {} ticks", stats.ticks);
        Ok(stats)
    }
}

fn tick_loop<W: Write>(frames: &[PathBuf], interval: Duration, out: &mut W, cancel: &CancelToken, stats: &mut PlaybackStats) -> Result<()> {
    let mut buf = Vec::new();
    let mut index = 0;
    let mut deadline = Instant::now();

    while sleep_until(deadline, cancel) {
        let frame = read_frame(&frames[index])?;
        compose_tick(&frame, &mut buf);
        out.write_all(&buf)?;
        out.flush()?;
        stats.ticks += 1;

        index += 1;
        if index == frames.len() {
            index = 0;
        }

        deadline += interval;
        // Running late: draw the next frame now instead of bursting to catch up.
        let now = Instant::now();
        if deadline < now {
            deadline = now;
        }
    }
    Ok(())
}

/// Sleep in short slices until `deadline`. Returns false once cancelled.
fn sleep_until(deadline: Instant, cancel: &CancelToken) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(POLL_SLICE));
    }
}

/// Block until one line is read from `input`. Returns false if cancelled first.
///
/// The read happens on a helper thread so a cancellation is honored while the
/// operator has not pressed Enter yet; that thread is left behind in that case.
fn wait_for_start<R: Read + Send + 'static>(input: R, cancel: &CancelToken) -> Result<bool> {
    let (tx, rx) = mpsc::channel::<io::Result<()>>();
    thread::Builder::new()
        .name("start-gate".into())
        .spawn(move || {
            let mut line = String::new();
            let res = BufReader::new(input).read_line(&mut line).map(|_| ());
            let _ = tx.send(res);
        })?;

    loop {
        if cancel.is_cancelled() {
            return Ok(false);
        }
        match rx.recv_timeout(POLL_SLICE) {
            Ok(res) => {
                res?;
                return Ok(!cancel.is_cancelled());
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(!cancel.is_cancelled()),
        }
    }
}
