//! Pick a random CT scan or segmentation out of a NumPy `.npz` archive,
//! convert it to NIfTI-1 and open it in a desktop viewer.
//!
//! The converted files are transient: they live in a scratch directory for
//! as long as the viewer needs them and are removed on every exit path,
//! including errors and interrupts.
//!
//! ```no_run
//! use scanpick::{rng_from_seed, Orchestrator, PickConfig, ScratchSpace};
//! use scanpick::viewer::{SlicerCommand, ViewerLauncher};
//!
//! # fn run() -> scanpick::Result<()> {
//! let scratch = ScratchSpace::in_temp_dir()?;
//! let launcher = ViewerLauncher::new("Slicer", Box::new(SlicerCommand::default()));
//! let mut orchestrator = Orchestrator::new(PickConfig::new("scans.npz"), scratch, launcher);
//! let report = orchestrator.run(&mut rng_from_seed(None))?;
//! println!("showed {}", report.entry);
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use] extern crate quick_error;
#[macro_use] extern crate num_derive;
#[macro_use] extern crate log;

pub mod affine;
pub mod archive;
pub mod convert;
pub mod error;
pub mod header;
pub mod interrupt;
pub mod object;
pub mod orchestrator;
pub mod scratch;
pub mod select;
pub mod typedef;
pub mod viewer;
pub mod volume;
pub mod writer;
mod util;

pub use archive::{Archive, Candidate, EntryKind, EntryTag, NamingRules};
pub use error::{CleanupWarning, Result, ScanPickError};
pub use header::NiftiHeader;
pub use object::{read_nifti, NiftiObject};
pub use orchestrator::{Orchestrator, PickConfig, RunReport, Stage};
pub use scratch::{ScratchSpace, TransientFile, TransientSet};
pub use select::{rng_from_seed, FixedChoice, RandomSource};
pub use typedef::NiftiType;
pub use util::sanitize_filename;
pub use volume::{MaskMode, Volume, VoxelData};
pub use writer::{write_nifti, WriterOptions};
