//! Command builders: how each viewer is told what to open.
use std::ffi::OsString;
use std::fmt::Debug;
use std::path::Path;

use super::{DisplayMode, LaunchTarget};

const SLICER_CT_SCRIPT: &str = include_str!("scripts/slicer_ct.py");
const SLICER_SEGMENTATION_SCRIPT: &str = include_str!("scripts/slicer_segmentation.py");

/// A script the viewer runs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct StartupScript {
    /// File name suffix, including the dot (`.py`)
    pub suffix: &'static str,
    /// Full script text
    pub contents: String,
}

/// Produces the startup script and command line for one viewer, given what
/// to display. Builders never touch the file system; the launcher writes
/// the script and passes its location back to [`arguments`].
///
/// [`arguments`]: #tymethod.arguments
pub trait CommandBuilder: Debug {
    /// The script to run at startup, if the viewer takes one.
    fn startup_script(&self, target: &LaunchTarget) -> Option<StartupScript>;

    /// Command line arguments. `script` is where the startup script was
    /// written, when there is one.
    fn arguments(&self, target: &LaunchTarget, script: Option<&Path>) -> Vec<OsString>;
}

/// 3D Slicer, driven by a generated Python script.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerCommand {
    /// Closed-surface smoothing factor
    pub smoothing: f32,
    /// Closed-surface decimation factor
    pub decimation: f32,
    /// Label map oversampling factor
    pub oversampling: f32,
    /// Lower percentile of the CT window
    pub window_min_percentile: f32,
    /// Upper percentile of the CT window
    pub window_max_percentile: f32,
    /// Volume rendering preset for CT scans
    pub rendering_preset: String,
}

impl Default for SlicerCommand {
    fn default() -> Self {
        SlicerCommand {
            smoothing: 0.12,
            decimation: 0.65,
            oversampling: 2.0,
            window_min_percentile: 0.5,
            window_max_percentile: 99.5,
            rendering_preset: "CT-Bone".to_string(),
        }
    }
}

impl SlicerCommand {
    fn render_script(&self, mode: DisplayMode) -> String {
        match mode {
            DisplayMode::Ct => SLICER_CT_SCRIPT
                .replace("@PMIN@", &self.window_min_percentile.to_string())
                .replace("@PMAX@", &self.window_max_percentile.to_string())
                .replace("@PRESET@", &python_string(&self.rendering_preset)),
            DisplayMode::Segmentation => SLICER_SEGMENTATION_SCRIPT
                .replace("@SMOOTHING@", &self.smoothing.to_string())
                .replace("@DECIMATION@", &self.decimation.to_string())
                .replace("@OVERSAMPLING@", &self.oversampling.to_string()),
        }
    }
}

/// Quote `text` as a double-quoted Python string literal.
fn python_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl CommandBuilder for SlicerCommand {
    fn startup_script(&self, target: &LaunchTarget) -> Option<StartupScript> {
        Some(StartupScript {
            suffix: ".py",
            contents: self.render_script(target.mode),
        })
    }

    fn arguments(&self, target: &LaunchTarget, script: Option<&Path>) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(script) = script {
            args.push("--python-script".into());
            args.push(script.into());
        }
        args.push("--".into());
        match target.mode {
            DisplayMode::Ct => {
                args.push("--image".into());
                args.push(target.volume.as_os_str().to_owned());
            }
            DisplayMode::Segmentation => {
                args.push("--mask".into());
                args.push(target.volume.as_os_str().to_owned());
                if let Some(background) = &target.background {
                    args.push("--background".into());
                    args.push(background.as_os_str().to_owned());
                }
            }
        }
        args
    }
}

/// ITK-SNAP: `-g` is the grey image, `-s` the segmentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItkSnapCommand;

impl CommandBuilder for ItkSnapCommand {
    fn startup_script(&self, _target: &LaunchTarget) -> Option<StartupScript> {
        None
    }

    fn arguments(&self, target: &LaunchTarget, _script: Option<&Path>) -> Vec<OsString> {
        let volume = target.volume.as_os_str().to_owned();
        match target.mode {
            DisplayMode::Ct => vec!["-g".into(), volume],
            DisplayMode::Segmentation => {
                // ITK-SNAP needs a grey image; the mask stands in for a missing CT
                let grey = target
                    .background
                    .as_ref()
                    .map(|p| p.as_os_str().to_owned())
                    .unwrap_or_else(|| volume.clone());
                vec!["-g".into(), grey, "-s".into(), volume]
            }
        }
    }
}

/// Any program that opens the files given as arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainCommand;

impl CommandBuilder for PlainCommand {
    fn startup_script(&self, _target: &LaunchTarget) -> Option<StartupScript> {
        None
    }

    fn arguments(&self, target: &LaunchTarget, _script: Option<&Path>) -> Vec<OsString> {
        let mut args = vec![target.volume.as_os_str().to_owned()];
        if let Some(background) = &target.background {
            args.push(background.as_os_str().to_owned());
        }
        args
    }
}
