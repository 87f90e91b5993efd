use std::path::PathBuf;

use clap::Args;

use scanpick::convert::convert_random;
use scanpick::{rng_from_seed, Result};

use super::PickArgs;

pub const ABOUT: &str = "Picks a random volume from an archive and saves it as NIfTI-1";

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pick: PickArgs,

    #[arg(
        long,
        short,
        help_heading = "Output",
        help = "Directory the .nii.gz file is written to. Created if missing."
    )]
    out: PathBuf,

    #[arg(
        long,
        help_heading = "Output",
        help = "Print which entry would be written without writing it.",
        default_value_t = false
    )]
    dry_run: bool,
}

pub fn run(args: &ConvertArgs) -> Result<i32> {
    let config = args.pick.config()?;
    let conversion = convert_random(
        &config,
        &args.out,
        args.dry_run,
        &mut rng_from_seed(args.pick.seed),
    )?;

    if conversion.written {
        println!("{} -> {}", conversion.entry, conversion.output.display());
    } else {
        println!("{} -> {} (dry run)", conversion.entry, conversion.output.display());
    }
    Ok(0)
}
