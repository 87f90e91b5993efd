//! One run: open the archive, pick an entry, convert it, show it, clean up.
//!
//! The run moves through the stages of [`Stage`] in order and never goes
//! back. Whatever stage a failure happens in, every transient file of the
//! run is released before the error is returned.
//!
//! [`Stage`]: ./enum.Stage.html

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::archive::{Archive, Candidate, EntryKind, NamingRules};
use crate::error::{CleanupWarning, Result, ScanPickError};
use crate::scratch::{ScratchSpace, TransientSet};
use crate::select::{choose, RandomSource};
use crate::util::sanitize_filename;
use crate::viewer::{LaunchTarget, ViewerLauncher, ViewerSession, WaitDiscipline};
use crate::volume::{MaskMode, Volume};
use crate::writer::WriterOptions;

/// Default foreground threshold for float masks.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// What to pick and how to prepare it.
#[derive(Debug, Clone)]
pub struct PickConfig {
    /// The `.npz` archive
    pub archive: PathBuf,
    /// How entries are tagged and classified
    pub rules: NamingRules,
    /// Only pick entries of this kind
    pub kind: Option<EntryKind>,
    /// How masks become label maps
    pub mask_mode: MaskMode,
    /// Foreground threshold for `MaskMode::Auto` (floats) and `MaskMode::Threshold`
    pub threshold: f64,
    /// Also convert the CT a picked mask was drawn on
    pub with_background: bool,
}

impl PickConfig {
    /// Pick anything from `archive` with the default naming rules.
    pub fn new<P: Into<PathBuf>>(archive: P) -> Self {
        PickConfig {
            archive: archive.into(),
            rules: NamingRules::default(),
            kind: None,
            mask_mode: MaskMode::default(),
            threshold: DEFAULT_THRESHOLD,
            with_background: false,
        }
    }
}

/// The stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the archive
    Start,
    /// Candidates enumerated
    Listed,
    /// One candidate chosen
    Selected,
    /// Written to transient files
    Converted,
    /// Viewer running
    Displayed,
    /// Releasing transient files
    Cleanup,
    /// Finished successfully
    Done,
    /// Finished with an error
    Fatal,
}

fn enter(stage: Stage) {
    debug!("stage: {:?}", stage);
}

/// The outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    /// The entry shown
    pub entry: String,
    /// Its kind
    pub kind: EntryKind,
    /// The CT shown under a mask, if any
    pub background: Option<String>,
    /// How the viewer exited; `None` when it was not waited for
    pub exit_status: Option<ExitStatus>,
    /// Transient files that could not be removed
    pub warnings: Vec<CleanupWarning>,
}

/// Choose one displayable entry of `archive` at random.
pub fn pick_candidate(
    archive: &mut Archive,
    kind: Option<EntryKind>,
    rng: &mut dyn RandomSource,
) -> Result<Candidate> {
    let candidates = archive.candidates(kind);
    debug!(
        "{} candidate(s) in {}",
        candidates.len(),
        archive.path().display()
    );
    choose(rng, &candidates)
        .cloned()
        .ok_or_else(|| ScanPickError::EmptyArchive(archive.path().to_path_buf()))
}

/// Read a candidate, turning masks into label maps.
pub fn prepare_volume(archive: &mut Archive, candidate: &Candidate, config: &PickConfig) -> Result<Volume> {
    let volume = archive.read_volume(&candidate.name)?;
    Ok(match candidate.kind {
        EntryKind::Image => volume,
        EntryKind::Mask => volume.into_label_map(config.mask_mode, config.threshold),
    })
}

/// Write `volume` to `path`, recording the entry name in the header.
pub fn write_entry(path: &Path, name: &str, volume: &Volume) -> Result<()> {
    WriterOptions::new(path).description(name).write_volume(volume)
}

struct Shown {
    candidate: Candidate,
    background: Option<String>,
    session: ViewerSession,
}

/// Runs the pick, convert, display and cleanup sequence.
#[derive(Debug)]
pub struct Orchestrator {
    config: PickConfig,
    scratch: ScratchSpace,
    launcher: ViewerLauncher,
    discipline: WaitDiscipline,
}

impl Orchestrator {
    /// A blocking orchestrator.
    pub fn new(config: PickConfig, scratch: ScratchSpace, launcher: ViewerLauncher) -> Self {
        Orchestrator {
            config,
            scratch,
            launcher,
            discipline: WaitDiscipline::Blocking,
        }
    }

    /// Replace the wait discipline.
    pub fn discipline(mut self, discipline: WaitDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &PickConfig {
        &self.config
    }

    /// Pick an entry with `rng`, show it and release its files.
    ///
    /// With `WaitDiscipline::Blocking` this returns once the viewer exits.
    /// With `WaitDiscipline::Detached` the files go to the cleanup hook and
    /// this returns once the hook does.
    pub fn run(&mut self, rng: &mut dyn RandomSource) -> Result<RunReport> {
        enter(Stage::Start);
        let mut files = self.scratch.session();
        let shown = match self.show(&mut files, rng) {
            Ok(shown) => shown,
            Err(e) => return Err(fatal(&mut files, e)),
        };
        let Shown {
            candidate,
            background,
            mut session,
        } = shown;

        let (exit_status, warnings) = match &mut self.discipline {
            WaitDiscipline::Blocking => {
                let status = session.wait();
                enter(Stage::Cleanup);
                let warnings = files.release_all();
                match status {
                    Ok(status) => (Some(status), warnings),
                    Err(e) => {
                        enter(Stage::Fatal);
                        return Err(e);
                    }
                }
            }
            WaitDiscipline::Detached(hook) => {
                enter(Stage::Cleanup);
                (None, hook.schedule(session, files))
            }
        };
        enter(Stage::Done);

        Ok(RunReport {
            entry: candidate.name,
            kind: candidate.kind,
            background,
            exit_status,
            warnings,
        })
    }

    fn show(&self, files: &mut TransientSet, rng: &mut dyn RandomSource) -> Result<Shown> {
        let mut archive = Archive::open(&self.config.archive, self.config.rules.clone())?;
        enter(Stage::Listed);
        let candidate = pick_candidate(&mut archive, self.config.kind, rng)?;
        enter(Stage::Selected);
        info!("picked '{}' ({:?})", candidate.name, candidate.kind);

        let volume = prepare_volume(&mut archive, &candidate, &self.config)?;
        let volume_path = convert_into(files, &candidate.name, &volume)?;
        drop(volume);

        let mut background = None;
        let mut background_path = None;
        if candidate.kind == EntryKind::Mask && self.config.with_background {
            match archive.background_for(&candidate.name) {
                Some(name) => match archive
                    .read_volume(&name)
                    .and_then(|v| convert_into(files, &name, &v))
                {
                    Ok(path) => {
                        background_path = Some(path);
                        background = Some(name);
                    }
                    Err(e) => warn!("showing '{}' without its CT '{}': {}", candidate.name, name, e),
                },
                None => info!("no CT found for '{}'", candidate.name),
            }
        }
        enter(Stage::Converted);

        let target = LaunchTarget {
            volume: volume_path,
            background: background_path,
            mode: candidate.kind.into(),
        };
        let session = self.launcher.launch(&target, files)?;
        enter(Stage::Displayed);
        Ok(Shown {
            candidate,
            background,
            session,
        })
    }
}

fn convert_into(files: &mut TransientSet, name: &str, volume: &Volume) -> Result<PathBuf> {
    let path = files.acquire(&format!("_{}.nii.gz", sanitize_filename(name)))?;
    write_entry(&path, name, volume)?;
    info!("converted '{}' to {}", name, path.display());
    Ok(path)
}

fn fatal(files: &mut TransientSet, error: ScanPickError) -> ScanPickError {
    enter(Stage::Cleanup);
    let _ = files.release_all();
    enter(Stage::Fatal);
    error
}
