//! Utility functions to write nifti images.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array3;

use crate::affine::Affine4;
use crate::error::Result;
use crate::header::NiftiHeader;
use crate::util::is_gz_file;
use crate::volume::{DataElement, Volume, VoxelData};

/// Options and flags which can be used to configure how a volume is written.
///
/// The file is gzip-compressed when the path ends in `.gz`.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    path: PathBuf,
    affine: Option<Affine4>,
    description: Option<String>,
    compression: Compression,
}

impl WriterOptions {
    /// Write to `path` (`.nii` or `.nii.gz`).
    pub fn new<P: AsRef<Path>>(path: P) -> WriterOptions {
        WriterOptions {
            path: path.as_ref().to_path_buf(),
            affine: None,
            description: None,
            compression: Compression::default(),
        }
    }

    /// Override the orientation stored in the volume.
    pub fn affine(mut self, affine: Affine4) -> WriterOptions {
        self.affine = Some(affine);
        self
    }

    /// Fill the header's `descrip` field.
    pub fn description<S: Into<String>>(mut self, description: S) -> WriterOptions {
        self.description = Some(description.into());
        self
    }

    /// Set the gzip level used for `.gz` targets.
    pub fn compression(mut self, compression: Compression) -> WriterOptions {
        self.compression = compression;
        self
    }

    /// Write the volume. Voxel values are stored unchanged, in their own
    /// type; the affine goes to the sform, identity when none is known.
    ///
    /// Any failure to create or write the file is returned immediately.
    pub fn write_volume(&self, volume: &Volume) -> Result<()> {
        let mut header = match self.affine {
            Some(affine) => NiftiHeader::for_volume(&volume.clone().with_affine(affine))?,
            None => NiftiHeader::for_volume(volume)?,
        };
        if let Some(description) = &self.description {
            header.set_description(description);
        }

        let f = File::create(&self.path)?;
        let writer = BufWriter::new(f);
        if is_gz_file(&self.path) {
            let mut e = GzEncoder::new(writer, self.compression);
            write_header_and_data(&mut e, &header, volume.data())?;
            let mut writer = e.finish()?;
            writer.flush()?;
        } else {
            let mut writer = writer;
            write_header_and_data(&mut writer, &header, volume.data())?;
            writer.flush()?;
        }
        Ok(())
    }
}

/// Write `volume` to `path` with its own orientation. Shorthand for
/// `WriterOptions::new(path).write_volume(volume)`.
pub fn write_nifti<P: AsRef<Path>>(path: P, volume: &Volume) -> Result<()> {
    WriterOptions::new(path).write_volume(volume)
}

fn write_header_and_data<W: Write>(
    writer: &mut W,
    header: &NiftiHeader,
    data: &VoxelData,
) -> Result<()> {
    header.write_to(writer)?;
    match data {
        VoxelData::U8(a) => write_data(writer, a),
        VoxelData::I8(a) => write_data(writer, a),
        VoxelData::I16(a) => write_data(writer, a),
        VoxelData::U16(a) => write_data(writer, a),
        VoxelData::I32(a) => write_data(writer, a),
        VoxelData::U32(a) => write_data(writer, a),
        VoxelData::I64(a) => write_data(writer, a),
        VoxelData::U64(a) => write_data(writer, a),
        VoxelData::F32(a) => write_data(writer, a),
        VoxelData::F64(a) => write_data(writer, a),
    }
}

fn write_data<T: DataElement, W: Write>(writer: &mut W, data: &Array3<T>) -> Result<()> {
    // NIfTI stores the first axis fastest: walk the transposed view in
    // logical order, whatever the memory layout of `data`.
    for v in data.t().iter() {
        v.write_le(writer)?;
    }
    Ok(())
}
