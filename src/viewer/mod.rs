//! Launching an external viewer on converted volumes.
//!
//! A [`ViewerLauncher`] pairs an executable with a [`CommandBuilder`] that
//! knows the viewer's command line. Launching spawns the viewer as a child
//! process and returns a [`ViewerSession`]; what happens next is up to the
//! [`WaitDiscipline`].
//!
//! [`ViewerLauncher`]: ./struct.ViewerLauncher.html
//! [`CommandBuilder`]: ./command/trait.CommandBuilder.html
//! [`ViewerSession`]: ./struct.ViewerSession.html
//! [`WaitDiscipline`]: ./enum.WaitDiscipline.html

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::archive::EntryKind;
use crate::error::{CleanupWarning, Result, ScanPickError};
use crate::scratch::TransientSet;
use crate::util::find_executable;

pub mod command;

pub use self::command::{CommandBuilder, ItkSnapCommand, PlainCommand, SlicerCommand, StartupScript};

/// How the viewer should present a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Intensity image with a window/level and volume rendering
    Ct,
    /// Label map shown as a surface, optionally over its CT
    Segmentation,
}

impl From<EntryKind> for DisplayMode {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Image => DisplayMode::Ct,
            EntryKind::Mask => DisplayMode::Segmentation,
        }
    }
}

/// The files handed to the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchTarget {
    /// The picked volume
    pub volume: PathBuf,
    /// The CT a segmentation was drawn on, if it was converted as well
    pub background: Option<PathBuf>,
    /// How to show `volume`
    pub mode: DisplayMode,
}

/// A fully resolved viewer invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    /// Absolute location of the viewer
    pub program: PathBuf,
    /// Its arguments
    pub args: Vec<std::ffi::OsString>,
}

/// Starts a viewer executable through a command builder.
#[derive(Debug)]
pub struct ViewerLauncher {
    executable: PathBuf,
    builder: Box<dyn CommandBuilder>,
}

impl ViewerLauncher {
    /// A launcher for `executable`, which is either a path or a program
    /// name looked up on `PATH`.
    pub fn new<P: Into<PathBuf>>(executable: P, builder: Box<dyn CommandBuilder>) -> Self {
        ViewerLauncher {
            executable: executable.into(),
            builder,
        }
    }

    /// The executable as configured.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Locate the executable, or fail with a launch error.
    pub fn resolve(&self) -> Result<PathBuf> {
        find_executable(&self.executable).ok_or_else(|| {
            ScanPickError::Launch(
                self.executable.clone(),
                "no such executable".to_string(),
            )
        })
    }

    /// Resolve the executable and build the command line. A startup
    /// script, if the viewer takes one, is written into a new file of
    /// `files`.
    pub fn plan(&self, target: &LaunchTarget, files: &mut TransientSet) -> Result<LaunchPlan> {
        let program = self.resolve()?;
        let script = match self.builder.startup_script(target) {
            Some(script) => {
                let path = files.acquire(script.suffix)?;
                fs::write(&path, script.contents.as_bytes())?;
                debug!("startup script written to {}", path.display());
                Some(path)
            }
            None => None,
        };
        let args = self.builder.arguments(target, script.as_deref());
        Ok(LaunchPlan { program, args })
    }

    /// Spawn the viewer on `target`.
    pub fn launch(&self, target: &LaunchTarget, files: &mut TransientSet) -> Result<ViewerSession> {
        let plan = self.plan(target, files)?;
        info!(
            "launching {} on {}",
            plan.program.display(),
            target.volume.display()
        );
        let child = Command::new(&plan.program)
            .args(&plan.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| ScanPickError::Launch(plan.program.clone(), e.to_string()))?;
        Ok(ViewerSession {
            child,
            program: plan.program,
        })
    }
}

/// A running viewer.
#[derive(Debug)]
pub struct ViewerSession {
    child: Child,
    program: PathBuf,
}

impl ViewerSession {
    /// The viewer executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process identifier.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Block until the viewer exits.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait()?;
        info!("{} exited with {}", self.program.display(), status);
        Ok(status)
    }

    /// The exit status if the viewer has already exited.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }
}

/// Takes over the transient files of a run whose viewer was not waited for.
pub trait DeferredCleanup: Debug {
    /// Release `files` at some point after the viewer had the chance to
    /// load them. The viewer itself is left running.
    fn schedule(&mut self, session: ViewerSession, files: TransientSet) -> Vec<CleanupWarning>;
}

/// Waits a fixed grace period (or until the viewer exits, whichever comes
/// first), then releases the files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GracePeriodCleanup {
    /// How long the viewer gets to read its files
    pub grace: Duration,
}

impl GracePeriodCleanup {
    const POLL: Duration = Duration::from_millis(100);

    /// Release after `grace`.
    pub fn new(grace: Duration) -> Self {
        GracePeriodCleanup { grace }
    }
}

impl DeferredCleanup for GracePeriodCleanup {
    fn schedule(&mut self, mut session: ViewerSession, mut files: TransientSet) -> Vec<CleanupWarning> {
        let deadline = Instant::now() + self.grace;
        loop {
            match session.try_wait() {
                Ok(Some(status)) => {
                    info!("{} exited early with {}", session.program().display(), status);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("could not poll viewer {}: {}", session.id(), e);
                    break;
                }
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(Self::POLL.min(deadline - now));
        }
        debug!("grace period over, releasing {} file(s)", files.len());
        files.release_all()
    }
}

/// What to do once the viewer is running.
#[derive(Debug)]
pub enum WaitDiscipline {
    /// Wait for the viewer to exit, then clean up.
    Blocking,
    /// Return at once; the hook owns cleanup from then on.
    Detached(Box<dyn DeferredCleanup>),
}

impl Default for WaitDiscipline {
    fn default() -> Self {
        WaitDiscipline::Blocking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::ScratchSpace;
    use tempfile::tempdir;

    fn target(dir: &Path) -> LaunchTarget {
        LaunchTarget {
            volume: dir.join("volume.nii.gz"),
            background: None,
            mode: DisplayMode::Ct,
        }
    }

    #[test]
    fn display_mode_follows_kind() {
        assert_eq!(DisplayMode::from(EntryKind::Image), DisplayMode::Ct);
        assert_eq!(DisplayMode::from(EntryKind::Mask), DisplayMode::Segmentation);
    }

    #[test]
    fn missing_viewer_is_a_launch_error_without_files() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();
        let mut files = scratch.session();
        let launcher = ViewerLauncher::new(
            dir.path().join("no-such-viewer"),
            Box::new(SlicerCommand::default()),
        );
        match launcher.launch(&target(dir.path()), &mut files) {
            Err(ScanPickError::Launch(program, _)) => {
                assert_eq!(program, dir.path().join("no-such-viewer"))
            }
            other => panic!("expected a launch error, got {:?}", other),
        }
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn plan_writes_the_startup_script() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();
        let mut files = scratch.session();
        let launcher = ViewerLauncher::new("sh", Box::new(SlicerCommand::default()));

        let plan = launcher.plan(&target(dir.path()), &mut files).unwrap();
        assert!(plan.program.is_absolute());
        assert_eq!(files.len(), 1);
        let script = files.paths()[0].to_path_buf();
        assert_eq!(plan.args[0], "--python-script");
        assert_eq!(plan.args[1], script.as_os_str());
        let contents = fs::read_to_string(&script).unwrap();
        assert!(contents.contains("loadVolume"));

        assert!(files.release_all().is_empty());
        assert!(!script.exists());
    }

    #[cfg(unix)]
    #[test]
    fn blocking_session_reports_exit_status() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();
        let mut files = scratch.session();
        // `false` ignores its arguments and exits with 1
        let launcher = ViewerLauncher::new("false", Box::new(PlainCommand));
        let mut session = launcher.launch(&target(dir.path()), &mut files).unwrap();
        let status = session.wait().unwrap();
        assert_eq!(status.code(), Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn grace_period_releases_files() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();
        let mut files = scratch.session();
        let volume = files.acquire(".nii.gz").unwrap();
        let launcher = ViewerLauncher::new("true", Box::new(PlainCommand));
        let t = LaunchTarget {
            volume: volume.clone(),
            background: None,
            mode: DisplayMode::Ct,
        };
        let session = launcher.launch(&t, &mut files).unwrap();

        let mut hook = GracePeriodCleanup::new(Duration::from_secs(5));
        let started = Instant::now();
        let warnings = hook.schedule(session, files);
        assert!(warnings.is_empty());
        assert!(!volume.exists());
        // `true` exits at once, so the full grace period is not spent
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
