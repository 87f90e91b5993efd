mod util;

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use scanpick::viewer::{
    DeferredCleanup, GracePeriodCleanup, PlainCommand, SlicerCommand, ViewerLauncher,
    ViewerSession, WaitDiscipline,
};
use scanpick::{
    rng_from_seed, CleanupWarning, EntryKind, FixedChoice, NamingRules, Orchestrator, PickConfig,
    ScanPickError, ScratchSpace, TransientSet,
};

use util::{empty_archive, files_in, meta_archive, tibia_archive};

fn meta_config(archive: PathBuf) -> PickConfig {
    let mut config = PickConfig::new(archive);
    config.rules = NamingRules::default().metadata_patterns(&["meta_*"]).unwrap();
    config
}

#[cfg(unix)]
#[test]
fn done_leaves_no_transient_files() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let viewer = util::fake_viewer(dir.path(), 0);
    let launcher = ViewerLauncher::new(&viewer, Box::new(PlainCommand));
    let mut orchestrator = Orchestrator::new(meta_config(meta_archive(dir.path())), scratch, launcher);

    for seed in 0..4 {
        let report = orchestrator.run(&mut rng_from_seed(Some(seed))).unwrap();
        assert!(report.entry == "ct_scan" || report.entry == "seg_mask");
        assert!(report.exit_status.unwrap().success());
        assert!(report.warnings.is_empty());
        assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
    }

    // the viewer was handed a real, non-empty file
    let sizes = fs::read_to_string(dir.path().join("sizes.txt")).unwrap();
    assert_eq!(sizes.lines().count(), 4);
    assert!(sizes.lines().all(|l| l.trim().parse::<u64>().unwrap() > 0));
}

#[test]
fn empty_archive_is_fatal_and_leaves_nothing() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let launcher = ViewerLauncher::new("sh", Box::new(PlainCommand));
    let mut orchestrator =
        Orchestrator::new(PickConfig::new(empty_archive(dir.path())), scratch, launcher);

    match orchestrator.run(&mut FixedChoice(0)) {
        Err(ScanPickError::EmptyArchive(_)) => {}
        other => panic!("expected EmptyArchive, got {:?}", other),
    }
    assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
}

#[test]
fn missing_archive_is_fatal() {
    let dir = tempdir().unwrap();
    let scratch = ScratchSpace::new(dir.path().join("scratch")).unwrap();
    let launcher = ViewerLauncher::new("sh", Box::new(PlainCommand));
    let mut orchestrator = Orchestrator::new(PickConfig::new(dir.path().join("nope.npz")), scratch, launcher);
    match orchestrator.run(&mut FixedChoice(0)) {
        Err(ScanPickError::NotFound(..)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn missing_viewer_still_releases_the_volume() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let launcher = ViewerLauncher::new(
        dir.path().join("no-such-viewer"),
        Box::new(SlicerCommand::default()),
    );
    let mut orchestrator =
        Orchestrator::new(meta_config(meta_archive(dir.path())), scratch.clone(), launcher);

    match orchestrator.run(&mut FixedChoice(0)) {
        Err(ScanPickError::Launch(program, _)) => {
            assert_eq!(program, dir.path().join("no-such-viewer"))
        }
        other => panic!("expected a launch error, got {:?}", other),
    }
    assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
    assert!(scratch.live_paths().is_empty());
}

#[cfg(unix)]
#[test]
fn viewer_failure_is_reported_after_cleanup() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let viewer = util::fake_viewer(dir.path(), 3);
    let launcher = ViewerLauncher::new(&viewer, Box::new(PlainCommand));
    let mut orchestrator = Orchestrator::new(meta_config(meta_archive(dir.path())), scratch, launcher);

    let report = orchestrator.run(&mut FixedChoice(1)).unwrap();
    assert_eq!(report.entry, "seg_mask");
    assert_eq!(report.exit_status.unwrap().code(), Some(3));
    assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
}

#[cfg(unix)]
#[test]
fn slicer_gets_a_script_and_a_volume() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let viewer = util::fake_viewer(dir.path(), 0);
    let launcher = ViewerLauncher::new(&viewer, Box::new(SlicerCommand::default()));
    let mut orchestrator = Orchestrator::new(meta_config(meta_archive(dir.path())), scratch, launcher);

    let report = orchestrator.run(&mut FixedChoice(0)).unwrap();
    assert_eq!(report.entry, "ct_scan");
    let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(args.len(), 5);
    assert_eq!(args[0], "--python-script");
    assert!(args[1].starts_with(scratch_dir.to_str().unwrap()) && args[1].ends_with(".py"));
    assert_eq!(&args[2..4], &["--", "--image"]);
    assert!(args[4].ends_with("_ct_scan.nii.gz"));
    assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
}

#[cfg(unix)]
#[test]
fn masks_can_bring_their_ct() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let viewer = util::fake_viewer(dir.path(), 0);
    let launcher = ViewerLauncher::new(&viewer, Box::new(PlainCommand));
    let mut config = PickConfig::new(tibia_archive(dir.path()));
    config.kind = Some(EntryKind::Mask);
    config.with_background = true;
    let mut orchestrator = Orchestrator::new(config, scratch, launcher);

    let report = orchestrator.run(&mut rng_from_seed(Some(9))).unwrap();
    assert_eq!(report.entry, "9_tibia_R_mask_tibia_R");
    assert_eq!(report.kind, EntryKind::Mask);
    assert_eq!(report.background, Some("9_tibia_R".to_string()));

    let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert_eq!(args.lines().count(), 2);
    assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
}

/// Records what it was handed, then releases like the grace period hook.
#[derive(Debug)]
struct RecordingCleanup {
    seen: Arc<Mutex<Vec<(PathBuf, bool)>>>,
}

impl DeferredCleanup for RecordingCleanup {
    fn schedule(&mut self, mut session: ViewerSession, mut files: TransientSet) -> Vec<CleanupWarning> {
        let mut seen = self.seen.lock().unwrap();
        for path in files.paths() {
            seen.push((path.to_path_buf(), path.exists()));
        }
        let _ = session.wait();
        files.release_all()
    }
}

#[cfg(unix)]
#[test]
fn detached_runs_hand_files_to_the_hook() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let viewer = util::fake_viewer(dir.path(), 0);
    let launcher = ViewerLauncher::new(&viewer, Box::new(PlainCommand));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook = RecordingCleanup { seen: Arc::clone(&seen) };
    let mut orchestrator = Orchestrator::new(meta_config(meta_archive(dir.path())), scratch, launcher)
        .discipline(WaitDiscipline::Detached(Box::new(hook)));

    let report = orchestrator.run(&mut FixedChoice(0)).unwrap();
    assert!(report.exit_status.is_none());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].1, "the volume exists while the viewer runs");
    assert!(!seen[0].0.exists());
    assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
}

#[cfg(unix)]
#[test]
fn grace_period_hook_in_a_run() {
    let dir = tempdir().unwrap();
    let scratch_dir = dir.path().join("scratch");
    let scratch = ScratchSpace::new(&scratch_dir).unwrap();
    let viewer = util::fake_viewer(dir.path(), 0);
    let launcher = ViewerLauncher::new(&viewer, Box::new(PlainCommand));
    let hook = GracePeriodCleanup::new(Duration::from_millis(300));
    let mut orchestrator = Orchestrator::new(meta_config(meta_archive(dir.path())), scratch, launcher)
        .discipline(WaitDiscipline::Detached(Box::new(hook)));

    let report = orchestrator.run(&mut FixedChoice(1)).unwrap();
    assert_eq!(report.entry, "seg_mask");
    assert!(report.warnings.is_empty());
    assert_eq!(files_in(&scratch_dir), Vec::<PathBuf>::new());
}
