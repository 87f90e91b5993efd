//! Reading single-file NIfTI-1 volumes back into memory.
//!
//! Only what this crate writes needs to be understood: 3D `.nii` or
//! `.nii.gz` files holding one of the scalar voxel types. Scaling
//! (`scl_slope`/`scl_inter`) is reported in the header but never applied:
//! the voxels come back exactly as stored.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::bufread::GzDecoder;
use ndarray::{Array3, ShapeBuilder};

use crate::error::{Result, ScanPickError};
use crate::header::{NiftiHeader, Endianness, MAGIC_CODE_NIP1};
use crate::typedef::NiftiType;
use crate::util::is_gz_file;
use crate::volume::{DataElement, Volume, VoxelData};

/// A NIfTI-1 file loaded in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiObject {
    header: NiftiHeader,
    volume: Volume,
}

impl NiftiObject {
    /// Read a `.nii` or `.nii.gz` file (gzip decided by the file name).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NiftiObject> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScanPickError::NotFound("NIfTI file", path.to_path_buf()));
        }
        let file = BufReader::new(File::open(path)?);
        if is_gz_file(path) {
            NiftiObject::from_reader(GzDecoder::new(file))
        } else {
            NiftiObject::from_reader(file)
        }
    }

    /// Read a single-file NIfTI-1 stream from its first byte.
    pub fn from_reader<R: Read>(mut input: R) -> Result<NiftiObject> {
        let header = NiftiHeader::from_reader(&mut input)?;
        if &header.magic != MAGIC_CODE_NIP1 {
            return Err(ScanPickError::InvalidNifti(
                "separate header and image files are not supported".to_string(),
            ));
        }
        // skip the extender and any extension up to the voxel data
        let offset = header.vox_offset as u64;
        if offset < 352 {
            return Err(ScanPickError::InvalidNifti(format!(
                "vox_offset {} overlaps the header",
                header.vox_offset
            )));
        }
        let skipped = io::copy(&mut (&mut input).take(offset - 348), &mut io::sink())?;
        if skipped != offset - 348 {
            return Err(ScanPickError::InvalidNifti("truncated before voxel data".to_string()));
        }

        let shape = spatial_shape(&header)?;
        let data = match header.endianness {
            Endianness::Little => read_voxels::<LittleEndian, _>(&mut input, &header, shape)?,
            Endianness::Big => read_voxels::<BigEndian, _>(&mut input, &header, shape)?,
        };
        let volume = Volume::new(data).with_affine(header.sform_affine());
        Ok(NiftiObject { header, volume })
    }

    /// The file's header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// The voxels, with the sform as affine.
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Take the volume out of this object.
    pub fn into_volume(self) -> Volume {
        self.volume
    }
}

/// Read a `.nii` or `.nii.gz` file. Shorthand for `NiftiObject::from_file`.
pub fn read_nifti<P: AsRef<Path>>(path: P) -> Result<NiftiObject> {
    NiftiObject::from_file(path)
}

fn spatial_shape(header: &NiftiHeader) -> Result<(usize, usize, usize)> {
    let shape = header.shape();
    // trailing singleton dimensions (time, components) are tolerated
    if shape.len() < 3 || shape[3..].iter().any(|&d| d > 1) {
        return Err(ScanPickError::InvalidNifti(format!(
            "expected a 3D volume, found dim {:?}",
            shape
        )));
    }
    Ok((
        usize::from(shape[0]),
        usize::from(shape[1]),
        usize::from(shape[2]),
    ))
}

fn read_voxels<B: ByteOrder, R: Read>(
    input: &mut R,
    header: &NiftiHeader,
    shape: (usize, usize, usize),
) -> Result<VoxelData> {
    let datatype = header.data_type()?;
    match datatype {
        NiftiType::Uint8 => read_typed::<u8, B, R>(input, shape),
        NiftiType::Int8 => read_typed::<i8, B, R>(input, shape),
        NiftiType::Int16 => read_typed::<i16, B, R>(input, shape),
        NiftiType::Uint16 => read_typed::<u16, B, R>(input, shape),
        NiftiType::Int32 => read_typed::<i32, B, R>(input, shape),
        NiftiType::Uint32 => read_typed::<u32, B, R>(input, shape),
        NiftiType::Int64 => read_typed::<i64, B, R>(input, shape),
        NiftiType::Uint64 => read_typed::<u64, B, R>(input, shape),
        NiftiType::Float32 => read_typed::<f32, B, R>(input, shape),
        NiftiType::Float64 => read_typed::<f64, B, R>(input, shape),
        other => Err(ScanPickError::UnsupportedDataType(other)),
    }
}

/// Voxels reserved up front, whatever the header claims.
const MAX_PREALLOCATED: usize = 1 << 20;

fn read_typed<T: DataElement, B: ByteOrder, R: Read>(
    input: &mut R,
    shape: (usize, usize, usize),
) -> Result<VoxelData> {
    let len = shape.0 * shape.1 * shape.2;
    // the header is untrusted: grow with the data actually present
    let mut values = Vec::with_capacity(len.min(MAX_PREALLOCATED));
    for _ in 0..len {
        match T::read_with::<B, R>(input) {
            Ok(v) => values.push(v),
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ScanPickError::InvalidNifti(format!(
                    "header announces {} voxels, data ends after {}",
                    len,
                    values.len()
                )))
            }
            Err(e) => return Err(e.into()),
        }
    }
    let data = Array3::from_shape_vec(shape.f(), values)
        .map_err(|e| ScanPickError::InvalidNifti(e.to_string()))?;
    Ok(T::wrap(data))
}
