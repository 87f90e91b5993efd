use std::path::PathBuf;

use clap::Args;

use scanpick::{read_nifti, Result};

pub const ABOUT: &str = "Prints a summary of a NIfTI-1 file";

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(help = "The .nii or .nii.gz file to inspect.")]
    file: PathBuf,
}

pub fn run(args: &InspectArgs) -> Result<i32> {
    let object = read_nifti(&args.file)?;
    let header = object.header();

    println!("file:        {}", args.file.display());
    println!("description: {}", header.description());
    println!("dimensions:  {:?}", header.shape());
    println!("spacing:     {:?}", &header.pixdim[1..4]);
    println!("datatype:    {:?}", header.data_type()?);
    println!("sform:       {:?}", header.sform()?);
    for row in &[header.srow_x, header.srow_y, header.srow_z] {
        println!("             {:?}", row);
    }
    println!("voxels:      {}", header.voxel_count());
    Ok(0)
}
