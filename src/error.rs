//! Error types for every stage of picking, converting and viewing a volume.
use std::fmt;
use std::io::Error as IOError;
use std::path::PathBuf;

use crate::typedef::NiftiType;

quick_error! {
    /// The fatal errors of a run. Each one aborts the run after the
    /// transient files have been released.
    #[derive(Debug)]
    pub enum ScanPickError {
        /// The archive (or another required input) does not exist.
        NotFound(what: &'static str, path: PathBuf) {
            display("{} not found: {}", what, path.display())
        }
        /// An archive entry could not be interpreted as a volume.
        Format(entry: String, reason: String) {
            display("entry '{}' is not a readable volume: {}", entry, reason)
        }
        /// A metadata naming pattern is not a valid glob.
        InvalidPattern(pattern: String, reason: String) {
            display("invalid metadata pattern '{}': {}", pattern, reason)
        }
        /// No entry is left once metadata and unusable entries are filtered out.
        EmptyArchive(path: PathBuf) {
            display("no displayable volume in {}", path.display())
        }
        /// The viewer could not be located or spawned.
        Launch(program: PathBuf, reason: String) {
            display("could not launch viewer {}: {}", program.display(), reason)
        }
        /// The voxel type has no NIfTI-1 encoding handled here.
        UnsupportedDataType(t: NiftiType) {
            display("unsupported data type {:?}", t)
        }
        /// A file claimed to be NIfTI-1 but its header is not valid.
        InvalidNifti(reason: String) {
            display("invalid NIfTI-1 file: {}", reason)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Type alias for results with a `ScanPickError`.
pub type Result<T> = ::std::result::Result<T, ScanPickError>;

/// A transient file could not be deleted. Never fatal: it is logged and
/// reported alongside the run outcome.
#[derive(Debug)]
pub struct CleanupWarning {
    /// The path that was left behind.
    pub path: PathBuf,
    /// Why the deletion failed.
    pub error: IOError,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "could not remove transient file {}: {}",
            self.path.display(),
            self.error
        )
    }
}
