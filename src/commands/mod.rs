pub mod convert_command;
pub mod inspect_command;
pub mod list_command;
pub mod view_command;

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use scanpick::{EntryKind, MaskMode, NamingRules, PickConfig, Result};

/// Options shared by every command reading an archive.
#[derive(Args, Debug)]
pub struct ArchiveArgs {
    #[arg(help = "The .npz archive to read.")]
    pub archive: PathBuf,

    #[arg(
        long = "metadata-pattern",
        help_heading = "Archive",
        help = "Glob pattern of entry names holding metadata rather than volumes. \
            Specify this argument multiple times to give more than one pattern. \
            Replaces the defaults ('*_mask_name_lst', '*_names')."
    )]
    pub metadata_patterns: Vec<String>,

    #[arg(
        long,
        help_heading = "Archive",
        help = "Name fragment marking an entry as a segmentation mask.",
        default_value = scanpick::archive::DEFAULT_MASK_TOKEN
    )]
    pub mask_token: String,

    #[arg(
        long,
        help_heading = "Archive",
        help = "Suffix of the entries holding another entry's 4x4 affine.",
        default_value = scanpick::archive::DEFAULT_AFFINE_SUFFIX
    )]
    pub affine_suffix: String,
}

impl ArchiveArgs {
    pub fn rules(&self) -> Result<NamingRules> {
        let rules = NamingRules::default()
            .mask_token(self.mask_token.as_str())
            .affine_suffix(self.affine_suffix.as_str());
        if self.metadata_patterns.is_empty() {
            Ok(rules)
        } else {
            rules.metadata_patterns(&self.metadata_patterns)
        }
    }
}

/// Options controlling which entry is picked and how it is prepared.
#[derive(Args, Debug)]
pub struct PickArgs {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    #[arg(
        long,
        help_heading = "Selection",
        help = "Only pick entries of this kind."
    )]
    pub kind: Option<KindArg>,

    #[arg(
        long,
        help_heading = "Selection",
        help = "Seed for the random choice. Picks differ on every run when absent."
    )]
    pub seed: Option<u64>,

    #[arg(
        long,
        help_heading = "Masks",
        help = "How a segmentation is turned into an 8-bit label map.",
        default_value_t = MaskModeArg::Auto
    )]
    pub mask_mode: MaskModeArg,

    #[arg(
        long,
        help_heading = "Masks",
        help = "Foreground threshold for float masks.",
        default_value_t = scanpick::orchestrator::DEFAULT_THRESHOLD
    )]
    pub threshold: f64,
}

impl PickArgs {
    pub fn config(&self) -> Result<PickConfig> {
        let mut config = PickConfig::new(self.archive.archive.clone());
        config.rules = self.archive.rules()?;
        config.kind = self.kind.map(EntryKind::from);
        config.mask_mode = self.mask_mode.into();
        config.threshold = self.threshold;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum KindArg {
    /// CT scans
    Image,

    /// Segmentation masks
    Mask,
}

impl From<KindArg> for EntryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => EntryKind::Image,
            KindArg::Mask => EntryKind::Mask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum MaskModeArg {
    /// Integers: above zero. Floats: above the threshold.
    Auto,

    /// Above the threshold, whatever the type.
    Threshold,

    /// Rounded and clamped to 0..=255.
    Round,
}

impl core::fmt::Display for MaskModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Threshold => write!(f, "threshold"),
            Self::Round => write!(f, "round"),
        }
    }
}

impl From<MaskModeArg> for MaskMode {
    fn from(mode: MaskModeArg) -> Self {
        match mode {
            MaskModeArg::Auto => MaskMode::Auto,
            MaskModeArg::Threshold => MaskMode::Threshold,
            MaskModeArg::Round => MaskMode::Round,
        }
    }
}
