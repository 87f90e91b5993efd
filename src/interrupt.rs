//! Release transient files when the process is interrupted.
use std::io;
use std::process;

use crate::error::{Result, ScanPickError};
use crate::scratch::ScratchSpace;

/// Exit status after an interrupt (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Install a Ctrl-C / SIGTERM handler that removes every live transient
/// file of `scratch` and exits with [`INTERRUPTED_EXIT_CODE`].
///
/// Only one handler can be installed per process.
///
/// [`INTERRUPTED_EXIT_CODE`]: ./constant.INTERRUPTED_EXIT_CODE.html
pub fn install(scratch: &ScratchSpace) -> Result<()> {
    let scratch = scratch.clone();
    ctrlc::set_handler(move || {
        warn!("interrupted, removing transient files");
        let _ = scratch.release_live();
        process::exit(INTERRUPTED_EXIT_CODE);
    })
    .map_err(|e| ScanPickError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
}
