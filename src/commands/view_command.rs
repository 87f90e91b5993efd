use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use log::{info, warn};

use scanpick::viewer::{
    CommandBuilder, GracePeriodCleanup, ItkSnapCommand, PlainCommand, SlicerCommand,
    ViewerLauncher, WaitDiscipline,
};
use scanpick::{interrupt, rng_from_seed, Orchestrator, Result, ScratchSpace};

use super::PickArgs;

pub const ABOUT: &str = "Picks a random volume from an archive and opens it in a viewer";

/// Where 3D Slicer lives in a default macOS install.
const MACOS_SLICER: &str = "/Applications/Slicer.app/Contents/MacOS/Slicer";

#[derive(Args, Debug)]
pub struct ViewArgs {
    #[command(flatten)]
    pick: PickArgs,

    #[arg(
        long,
        env = "SCANPICK_VIEWER",
        help_heading = "Viewer",
        help = "Viewer executable, either a path or a program name on PATH. \
            Defaults to 3D Slicer."
    )]
    viewer: Option<PathBuf>,

    #[arg(
        long,
        help_heading = "Viewer",
        help = "How the viewer is told what to open.",
        default_value_t = ViewerKind::Slicer
    )]
    viewer_kind: ViewerKind,

    #[arg(
        long,
        help_heading = "Viewer",
        help = "When a mask is picked, also open the CT it was drawn on.",
        default_value_t = false
    )]
    background: bool,

    #[arg(
        long,
        help_heading = "Viewer",
        help = "Do not wait for the viewer to exit. Transient files are removed \
            after the grace period instead.",
        default_value_t = false
    )]
    detach: bool,

    #[arg(
        long,
        help_heading = "Viewer",
        help = "Seconds a detached viewer gets to load its files.",
        default_value_t = 30
    )]
    grace: u64,

    #[arg(
        long,
        env = "SCANPICK_SCRATCH_DIR",
        help = "Directory for transient files. Defaults to the system \
            temporary directory."
    )]
    scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum ViewerKind {
    /// 3D Slicer with a generated startup script
    Slicer,

    /// ITK-SNAP
    Itksnap,

    /// Any program taking the volume paths as arguments
    Plain,
}

impl core::fmt::Display for ViewerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slicer => write!(f, "slicer"),
            Self::Itksnap => write!(f, "itksnap"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

impl ViewerKind {
    fn builder(self) -> Box<dyn CommandBuilder> {
        match self {
            ViewerKind::Slicer => Box::new(SlicerCommand::default()),
            ViewerKind::Itksnap => Box::new(ItkSnapCommand),
            ViewerKind::Plain => Box::new(PlainCommand),
        }
    }

    fn default_executable(self) -> PathBuf {
        match self {
            ViewerKind::Slicer if Path::new(MACOS_SLICER).exists() => PathBuf::from(MACOS_SLICER),
            ViewerKind::Slicer => PathBuf::from("Slicer"),
            ViewerKind::Itksnap => PathBuf::from("itksnap"),
            ViewerKind::Plain => PathBuf::from("xdg-open"),
        }
    }
}

/// Runs the command. The exit code is the viewer's own when it exits
/// with a failure.
pub fn run(args: &ViewArgs) -> Result<i32> {
    let mut config = args.pick.config()?;
    config.with_background = args.background;

    let scratch = match &args.scratch_dir {
        Some(dir) => ScratchSpace::new(dir)?,
        None => ScratchSpace::in_temp_dir()?,
    };
    interrupt::install(&scratch)?;

    let executable = args
        .viewer
        .clone()
        .unwrap_or_else(|| args.viewer_kind.default_executable());
    let launcher = ViewerLauncher::new(executable, args.viewer_kind.builder());
    let discipline = if args.detach {
        WaitDiscipline::Detached(Box::new(GracePeriodCleanup::new(Duration::from_secs(
            args.grace,
        ))))
    } else {
        WaitDiscipline::Blocking
    };

    let mut orchestrator = Orchestrator::new(config, scratch, launcher).discipline(discipline);
    let report = orchestrator.run(&mut rng_from_seed(args.pick.seed))?;

    for warning in &report.warnings {
        warn!("left behind: {}", warning.path.display());
    }
    match report.exit_status {
        Some(status) if !status.success() => {
            info!("viewer exited with {}", status);
            Ok(status.code().unwrap_or(1))
        }
        _ => Ok(0),
    }
}
