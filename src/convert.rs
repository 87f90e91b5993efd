//! Persistent conversion: write one random entry next to other NIfTI files
//! instead of handing it to a viewer.
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{Archive, EntryKind};
use crate::error::Result;
use crate::orchestrator::{pick_candidate, prepare_volume, write_entry, PickConfig};
use crate::select::RandomSource;
use crate::util::sanitize_filename;

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// The entry picked
    pub entry: String,
    /// Its kind
    pub kind: EntryKind,
    /// Where it was (or would be) written
    pub output: PathBuf,
    /// Whether the file was actually written
    pub written: bool,
}

/// The output path of `entry` inside `out_dir`.
pub fn output_path(out_dir: &Path, entry: &str) -> PathBuf {
    out_dir.join(format!("{}.nii.gz", sanitize_filename(entry)))
}

/// Pick one entry of the configured archive and write it to
/// `<out_dir>/<name>.nii.gz`. With `dry_run`, only report what would be
/// written.
pub fn convert_random(
    config: &PickConfig,
    out_dir: &Path,
    dry_run: bool,
    rng: &mut dyn RandomSource,
) -> Result<Conversion> {
    let mut archive = Archive::open(&config.archive, config.rules.clone())?;
    let candidate = pick_candidate(&mut archive, config.kind, rng)?;
    let output = output_path(out_dir, &candidate.name);
    info!("picked '{}' ({:?})", candidate.name, candidate.kind);

    if !dry_run {
        let volume = prepare_volume(&mut archive, &candidate, config)?;
        fs::create_dir_all(out_dir)?;
        write_entry(&output, &candidate.name, &volume)?;
        info!("wrote {}", output.display());
    }
    Ok(Conversion {
        entry: candidate.name,
        kind: candidate.kind,
        output,
        written: !dry_run,
    })
}
