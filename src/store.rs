//! On-disk layout for decoded stills and text frames.
//!
//! Both kinds of files carry their temporal position as an integer embedded in
//! the file name (`frame_12.png`, `ascii_frame_11.txt`). Ordering always goes
//! through [`parse_ordinal`]; raw names are never compared, since lexical order
//! puts `frame_10` before `frame_2`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Prefix of stills written by the media backend.
pub const STILL_PREFIX: &str = "frame_";
pub const STILL_EXTENSION: &str = "png";
/// Prefix of persisted text frames.
pub const FRAME_PREFIX: &str = "ascii_frame_";
pub const FRAME_EXTENSION: &str = "txt";

/// Extract the ordinal from `<prefix><digits>.<extension>`.
///
/// Returns `None` for any name that does not match that shape exactly.
pub fn parse_ordinal(file_name: &str, prefix: &str, extension: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(prefix)?
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Files directly inside `dir` matching the naming scheme, sorted by ordinal.
pub fn list_by_ordinal(dir: &Path, prefix: &str, extension: &str) -> Result<Vec<(u64, PathBuf)>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match parse_ordinal(&name, prefix, extension) {
            Some(ordinal) => found.push((ordinal, entry.into_path())),
            None => log::debug!("ignoring {} in {}", name, dir.display()),
        }
    }
    found.sort_by_key(|(ordinal, _)| *ordinal);
    Ok(found)
}

/// A directory that is removed when the guard is dropped.
///
/// The guard refuses to adopt a directory that already exists, so it can
/// never delete anything it did not create.
#[derive(Debug)]
pub struct TransientDir {
    path: PathBuf,
    keep: bool,
}

impl TransientDir {
    /// Create `path` (its parents may already exist, the directory itself must not).
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Usage(format!(
                    "{} already exists; refusing to use it as a transient directory",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        }
        log::debug!("created transient directory {}", path.display());
        Ok(Self { path, keep: false })
    }

    /// Create a fresh, uniquely named directory under the system temp dir.
    pub fn unique(label: &str) -> Result<Self> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let name = format!("vidscii_{}_{}_{}", label, std::process::id(), stamp);
        Self::create(std::env::temp_dir().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard, leaving the directory on disk.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for TransientDir {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => log::info!("removed {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Transient storage for one generated sequence of text frames.
#[derive(Debug)]
pub struct FrameStore {
    dir: TransientDir,
}

impl FrameStore {
    pub fn new(dir: TransientDir) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn frame_path(&self, ordinal: usize) -> PathBuf {
        self.path()
            .join(format!("{}{}.{}", FRAME_PREFIX, ordinal, FRAME_EXTENSION))
    }

    pub fn write_frame(&self, ordinal: usize, frame: &str) -> Result<()> {
        let path = self.frame_path(ordinal);
        fs::write(&path, frame).map_err(|e| Error::storage(&path, e))
    }

    /// Persist `frames` under ordinals `0..frames.len()`.
    pub fn write_sequence<S: AsRef<str>>(&self, frames: &[S]) -> Result<()> {
        for (ordinal, frame) in frames.iter().enumerate() {
            self.write_frame(ordinal, frame.as_ref())?;
        }
        log::info!("persisted {} frames to {}", frames.len(), self.path().display());
        Ok(())
    }

    /// Paths of every stored frame in ordinal order. An empty or missing store is an error.
    pub fn frame_paths(&self) -> Result<Vec<PathBuf>> {
        let dir = self.path();
        if !dir.is_dir() {
            return Err(Error::storage(dir, "frame directory is missing"));
        }
        let frames = list_by_ordinal(dir, FRAME_PREFIX, FRAME_EXTENSION)?;
        if frames.is_empty() {
            return Err(Error::storage(dir, "no ascii_frame_*.txt files found"));
        }
        // Sorted, so a complete sequence has ordinal i at position i.
        for (expected, (ordinal, path)) in frames.iter().enumerate() {
            let expected = expected as u64;
            if *ordinal < expected {
                return Err(Error::storage(path, format!("duplicate frame ordinal {}", ordinal)));
            }
            if *ordinal > expected {
                return Err(Error::storage(dir, format!("frame {} is missing", expected)));
            }
        }
        Ok(frames.into_iter().map(|(_, path)| path).collect())
    }

    /// Load every stored frame in ordinal order.
    pub fn load_sequence(&self) -> Result<Vec<String>> {
        self.frame_paths()?
            .iter()
            .map(|p| read_frame(p))
            .collect()
    }
}

/// Read one text frame; a missing, unreadable or empty file is a storage error.
pub fn read_frame(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
    if content.is_empty() {
        return Err(Error::storage(path, "frame file is empty"));
    }
    Ok(content)
}
