//! Transient files: uniquely named scratch files that never outlive the run
//! which created them.
//!
//! A [`ScratchSpace`] hands out [`TransientFile`]s in one directory and keeps
//! a registry of the ones still on disk, so that an interrupt handler can
//! remove them even while the main thread is blocked on a viewer.
//!
//! [`ScratchSpace`]: ./struct.ScratchSpace.html
//! [`TransientFile`]: ./struct.TransientFile.html

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{CleanupWarning, Result};

/// Prefix of every transient file name.
pub const TRANSIENT_PREFIX: &str = "scanpick_";

type Registry = Arc<Mutex<BTreeSet<PathBuf>>>;

fn lock(registry: &Registry) -> MutexGuard<BTreeSet<PathBuf>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A scratch directory handing out transient files.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    dir: PathBuf,
    live: Registry,
}

impl ScratchSpace {
    /// Use `dir` for transient files, creating it if needed.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<ScratchSpace> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(ScratchSpace {
            dir,
            live: Arc::default(),
        })
    }

    /// Use the system temporary directory.
    pub fn in_temp_dir() -> Result<ScratchSpace> {
        ScratchSpace::new(std::env::temp_dir())
    }

    /// The scratch directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a new, empty, uniquely named file ending in `suffix`.
    pub fn acquire(&self, suffix: &str) -> Result<TransientFile> {
        let temp = tempfile::Builder::new()
            .prefix(TRANSIENT_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.dir)?
            .into_temp_path();
        // registered while `temp` still deletes on drop, so an interrupt
        // never sees a file it does not know about
        let path = temp.to_path_buf();
        let _ = lock(&self.live).insert(path.clone());
        if let Err(e) = temp.keep() {
            let _ = lock(&self.live).remove(&path);
            return Err(io::Error::from(e).into());
        }
        debug!("acquired transient file {}", path.display());
        Ok(TransientFile {
            path,
            live: Arc::clone(&self.live),
            released: false,
        })
    }

    /// Delete `path` if it exists. A missing file is not an error, so
    /// releasing twice is harmless; any other failure is logged and
    /// returned as a warning.
    pub fn release(&self, path: &Path) -> Option<CleanupWarning> {
        release_path(&self.live, path)
    }

    /// Paths acquired here and not released yet.
    pub fn live_paths(&self) -> Vec<PathBuf> {
        lock(&self.live).iter().cloned().collect()
    }

    /// Release every live path. Used when the run is interrupted.
    pub fn release_live(&self) -> Vec<CleanupWarning> {
        self.live_paths()
            .iter()
            .filter_map(|p| release_path(&self.live, p))
            .collect()
    }

    /// Start the set of transient files for one run.
    pub fn session(&self) -> TransientSet {
        TransientSet {
            scratch: self.clone(),
            files: Vec::new(),
        }
    }
}

fn release_path(live: &Registry, path: &Path) -> Option<CleanupWarning> {
    let outcome = match fs::remove_file(path) {
        Ok(()) => {
            debug!("released transient file {}", path.display());
            None
        }
        Err(ref e) if e.kind() == ErrorKind::NotFound => None,
        Err(error) => {
            let warning = CleanupWarning {
                path: path.to_path_buf(),
                error,
            };
            warn!("{}", warning);
            Some(warning)
        }
    };
    let _ = lock(live).remove(path);
    outcome
}

/// A file created in a scratch space. Released explicitly with
/// [`release`](#method.release), or on drop otherwise.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    live: Registry,
    released: bool,
}

impl TransientFile {
    /// Where the file is.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Later calls do nothing.
    pub fn release(&mut self) -> Option<CleanupWarning> {
        if self.released {
            return None;
        }
        self.released = true;
        release_path(&self.live, &self.path)
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// All transient files of one run, released together.
#[derive(Debug)]
pub struct TransientSet {
    scratch: ScratchSpace,
    files: Vec<TransientFile>,
}

impl TransientSet {
    /// Acquire one more file and return its path.
    pub fn acquire(&mut self, suffix: &str) -> Result<PathBuf> {
        let file = self.scratch.acquire(suffix)?;
        let path = file.path().to_path_buf();
        self.files.push(file);
        Ok(path)
    }

    /// Paths of the files held.
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path()).collect()
    }

    /// Number of files held.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file is held.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Release every file, in acquisition order.
    pub fn release_all(&mut self) -> Vec<CleanupWarning> {
        self.files
            .drain(..)
            .filter_map(|mut f| f.release())
            .collect()
    }
}

impl Drop for TransientSet {
    fn drop(&mut self) {
        let _ = self.release_all();
    }
}
